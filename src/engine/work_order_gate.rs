// ==========================================
// 车队轮胎管理系统 - 工单闸门
// ==========================================
// 职责: 校验写操作挂接的工单为 OPENED 且属于指定车辆；开/关工单
// 红线: 每辆车同一时刻最多一张 OPENED 工单
// ==========================================

use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::types::{ShiftType, WorkOrderStatus};
use crate::domain::work_order::WorkOrder;
use crate::engine::error::{EngineError, EngineResult, Precondition};
use crate::engine::{begin_immediate, lock_conn};
use crate::repository::{ActionLogRepository, VehicleRepository, WorkOrderRepository};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// 开工单请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenWorkOrderRequest {
    pub work_order_number: String,
    pub vehicle_id: String,
    pub assigned_to: Option<String>,
    pub shift_type: ShiftType,
    pub current_odometer: i64,
    pub actor: String,
}

// ==========================================
// WorkOrderGate - 工单闸门
// ==========================================
pub struct WorkOrderGate {
    conn: Arc<Mutex<Connection>>,
}

impl WorkOrderGate {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 工单是否 OPENED 且属于车辆 V
    pub fn is_open_for_vehicle(&self, work_order_id: &str, vehicle_id: &str) -> EngineResult<bool> {
        let conn = lock_conn(&self.conn)?;
        match WorkOrderRepository::find_tx(&conn, work_order_id)? {
            Some(order) => Ok(order.is_opened() && order.vehicle_id == vehicle_id),
            None => Ok(false),
        }
    }

    /// 开工单
    ///
    /// # 校验
    /// - 车辆存在
    /// - 工单编号唯一
    /// - 该车辆没有其他 OPENED 工单
    pub fn open_work_order(&self, request: &OpenWorkOrderRequest) -> EngineResult<WorkOrder> {
        let mut conn = lock_conn(&self.conn)?;
        let tx = begin_immediate(&mut conn)?;

        if VehicleRepository::find_vehicle_tx(&tx, &request.vehicle_id)?.is_none() {
            return Err(EngineError::not_found("Vehicle", &request.vehicle_id));
        }
        if WorkOrderRepository::number_exists_tx(&tx, &request.work_order_number)? {
            warn!(work_order_number = %request.work_order_number, "工单编号重复");
            return Err(Precondition::WorkOrderNumberTaken {
                work_order_number: request.work_order_number.clone(),
            }
            .into());
        }
        if let Some(existing) = WorkOrderRepository::find_opened_by_vehicle_tx(&tx, &request.vehicle_id)? {
            warn!(vehicle_id = %request.vehicle_id, existing = %existing.work_order_id, "车辆已有 OPENED 工单");
            return Err(Precondition::VehicleAlreadyHasOpenedWorkOrder {
                vehicle_id: request.vehicle_id.clone(),
                work_order_id: existing.work_order_id,
            }
            .into());
        }

        let order = WorkOrder {
            work_order_id: uuid::Uuid::new_v4().to_string(),
            work_order_number: request.work_order_number.clone(),
            vehicle_id: request.vehicle_id.clone(),
            assigned_to: request.assigned_to.clone(),
            shift_type: request.shift_type,
            status: WorkOrderStatus::Opened,
            current_odometer: request.current_odometer,
            cost: 0.0,
            created_at: chrono::Local::now().naive_local(),
        };
        WorkOrderRepository::insert_tx(&tx, &order)?;

        let log = ActionLog::new(ActionType::WorkOrderOpen, &request.actor)
            .with_vehicle(&order.vehicle_id)
            .with_payload(json!({
                "work_order_id": order.work_order_id,
                "work_order_number": order.work_order_number,
                "current_odometer": order.current_odometer,
            }));
        ActionLogRepository::insert_tx(&tx, &log)?;
        tx.commit()?;

        info!(work_order_id = %order.work_order_id, vehicle_id = %order.vehicle_id, "工单已开启");
        Ok(order)
    }

    /// 关工单（可同时记录费用）
    pub fn close_work_order(
        &self,
        work_order_id: &str,
        cost: Option<f64>,
        actor: &str,
    ) -> EngineResult<WorkOrder> {
        let mut conn = lock_conn(&self.conn)?;
        let tx = begin_immediate(&mut conn)?;
        let order = Self::close_tx(&tx, work_order_id, cost, actor)?;
        tx.commit()?;

        info!(work_order_id = %work_order_id, "工单已关闭");
        Ok(order)
    }

    // ==========================================
    // 事务内校验（供分配引擎/巡检记录器调用）
    // ==========================================

    /// 工单必须存在且为 OPENED
    pub(crate) fn require_opened(conn: &Connection, work_order_id: &str) -> EngineResult<WorkOrder> {
        let order = WorkOrderRepository::find_tx(conn, work_order_id)?
            .ok_or_else(|| EngineError::not_found("WorkOrder", work_order_id))?;
        if !order.is_opened() {
            return Err(Precondition::WorkOrderNotOpened {
                work_order_id: order.work_order_id.clone(),
                status: order.status.to_string(),
            }
            .into());
        }
        Ok(order)
    }

    /// 工单必须属于指定车辆
    pub(crate) fn require_vehicle(order: &WorkOrder, vehicle_id: &str) -> EngineResult<()> {
        if order.vehicle_id != vehicle_id {
            return Err(Precondition::WorkOrderVehicleMismatch {
                work_order_id: order.work_order_id.clone(),
                vehicle_id: vehicle_id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// 跨车换位: 目标车辆必须另有一张 OPENED 工单
    pub(crate) fn require_destination_authorized(
        conn: &Connection,
        destination_vehicle_id: &str,
        source_work_order_id: &str,
    ) -> EngineResult<()> {
        let count = WorkOrderRepository::count_opened_for_vehicle_tx(
            conn,
            destination_vehicle_id,
            Some(source_work_order_id),
        )?;
        if count == 0 {
            return Err(Precondition::DestinationNotAuthorized {
                vehicle_id: destination_vehicle_id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub(crate) fn close_tx(
        conn: &Connection,
        work_order_id: &str,
        cost: Option<f64>,
        actor: &str,
    ) -> EngineResult<WorkOrder> {
        let mut order = WorkOrderRepository::find_tx(conn, work_order_id)?
            .ok_or_else(|| EngineError::not_found("WorkOrder", work_order_id))?;
        if matches!(order.status, WorkOrderStatus::Closed | WorkOrderStatus::Cancelled) {
            return Err(EngineError::transition(
                order.status.to_string(),
                WorkOrderStatus::Closed.to_string(),
            ));
        }

        WorkOrderRepository::update_status_tx(conn, work_order_id, WorkOrderStatus::Closed, cost)?;
        let log = ActionLog::new(ActionType::WorkOrderClose, actor)
            .with_vehicle(&order.vehicle_id)
            .with_payload(json!({
                "work_order_id": work_order_id,
                "from_status": order.status.to_db_str(),
                "cost": cost,
            }));
        ActionLogRepository::insert_tx(conn, &log)?;

        order.status = WorkOrderStatus::Closed;
        if let Some(cost) = cost {
            order.cost = cost;
        }
        Ok(order)
    }
}
