// ==========================================
// 车队轮胎管理系统 - 巡检记录器
// ==========================================
// 职责: 写入巡检、推导磨损指标、刷新轮胎读数缓存
// 输入: 巡检请求 + 上一次巡检（或花纹默认值与首次装车里程）
// 输出: TireInspection（含 WearMetrics）
// ==========================================
// 已知行为: 缓存读数总被本次巡检覆盖，即使本次里程早于已有最新巡检
// ==========================================

use crate::config::{FleetConfigReader, InspectionPolicy};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::inspection::TireInspection;
use crate::domain::types::{RecommendedAction, WorkOrderStatus};
use crate::domain::work_order::WorkOrder;
use crate::engine::error::{EngineError, EngineResult, Precondition};
use crate::engine::wear_metrics::{self, WearBaseline, WearInputs};
use crate::engine::work_order_gate::WorkOrderGate;
use crate::engine::{begin_immediate, lock_conn};
use crate::repository::{
    ActionLogRepository, AssignmentRepository, InspectionRepository, TireRepository, VehicleRepository,
    WorkOrderRepository,
};
use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// 单条巡检请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionRequest {
    pub tire_id: String,
    pub position_id: String,
    pub work_order_id: Option<String>,
    pub inspection_odometer: i64,
    pub inspector_id: String,
    pub driver_id: Option<String>,
    pub tread_depth: f64,
    pub pressure: f64,
    pub wear_type_id: String,
    pub recommended_action: Option<RecommendedAction>,
    pub inspected_at: Option<NaiveDateTime>, // 缺省取当前时间
    pub actor: String,
}

/// 整车巡检中单条轮胎读数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TireReading {
    pub tire_id: String,
    pub tread_depth: f64,
    pub pressure: f64,
    pub wear_type_id: String,
    pub recommended_action: Option<RecommendedAction>,
}

/// 整车批量巡检请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkInspectionRequest {
    pub vehicle_id: String,
    pub work_order_id: String,
    pub inspector_id: String,
    pub driver_id: Option<String>,
    pub odometer: i64,
    pub readings: Vec<TireReading>,
    pub cost: Option<f64>,
    pub close_work_order: bool,
    pub actor: String,
}

#[derive(Debug, Clone)]
pub struct BulkInspectionResult {
    pub inspections: Vec<TireInspection>,
    pub work_order: WorkOrder,
}

// ==========================================
// InspectionRecorder - 巡检记录器
// ==========================================
pub struct InspectionRecorder {
    conn: Arc<Mutex<Connection>>,
    config: Arc<dyn FleetConfigReader>,
}

impl InspectionRecorder {
    pub fn new(conn: Arc<Mutex<Connection>>, config: Arc<dyn FleetConfigReader>) -> Self {
        Self { conn, config }
    }

    fn load_policy(&self) -> EngineResult<InspectionPolicy> {
        self.config
            .inspection_policy()
            .map_err(|e| EngineError::Config(e.to_string()))
    }

    /// 新增巡检
    pub fn create_inspection(&self, request: &InspectionRequest) -> EngineResult<TireInspection> {
        // 配置读取与连接共用同一把锁，须在加锁前完成
        let policy = self.load_policy()?;

        let mut conn = lock_conn(&self.conn)?;
        let tx = begin_immediate(&mut conn)?;

        Self::validate_tx(&tx, request, &policy)?;
        let inspection = Self::build_tx(&tx, uuid::Uuid::new_v4().to_string(), request, None)?;
        InspectionRepository::insert_tx(&tx, &inspection)?;
        TireRepository::update_cached_readings_tx(&tx, &inspection.tire_id, inspection.tread_depth, inspection.pressure)?;

        let log = ActionLog::new(ActionType::InspectionCreate, &request.actor)
            .with_tire(&inspection.tire_id)
            .with_payload(json!({
                "inspection_id": inspection.inspection_id,
                "position_id": inspection.position_id,
                "odometer": inspection.inspection_odometer,
                "metrics": inspection.metrics,
            }));
        ActionLogRepository::insert_tx(&tx, &log)?;
        tx.commit()?;

        info!(
            inspection_id = %inspection.inspection_id,
            tire_id = %inspection.tire_id,
            crp = inspection.metrics.consumption_rate,
            "巡检已记录"
        );
        Ok(inspection)
    }

    /// 修改巡检：以该轮胎的其他最新巡检为基准重算指标
    pub fn update_inspection(
        &self,
        inspection_id: &str,
        request: &InspectionRequest,
    ) -> EngineResult<TireInspection> {
        let policy = self.load_policy()?;

        let mut conn = lock_conn(&self.conn)?;
        let tx = begin_immediate(&mut conn)?;

        let existing = InspectionRepository::find_tx(&tx, inspection_id)?
            .ok_or_else(|| EngineError::not_found("TireInspection", inspection_id))?;
        if existing.tire_id != request.tire_id {
            return Err(EngineError::transition(
                format!("tire={}", existing.tire_id),
                format!("tire={}", request.tire_id),
            ));
        }

        // 工单未变更时不重复校验开闭状态（历史巡检的工单可能已关闭）
        let work_order_changed = existing.work_order_id != request.work_order_id;
        let effective_policy = InspectionPolicy {
            require_open_work_order: policy.require_open_work_order && work_order_changed,
        };
        Self::validate_tx(&tx, request, &effective_policy)?;

        let mut updated = Self::build_tx(&tx, existing.inspection_id.clone(), request, Some(inspection_id))?;
        if request.inspected_at.is_none() {
            updated.inspected_at = existing.inspected_at;
        }
        InspectionRepository::update_tx(&tx, &updated)?;
        TireRepository::update_cached_readings_tx(&tx, &updated.tire_id, updated.tread_depth, updated.pressure)?;

        let log = ActionLog::new(ActionType::InspectionUpdate, &request.actor)
            .with_tire(&updated.tire_id)
            .with_payload(json!({
                "inspection_id": inspection_id,
                "before": { "tread_depth": existing.tread_depth, "pressure": existing.pressure },
                "after": { "tread_depth": updated.tread_depth, "pressure": updated.pressure },
            }));
        ActionLogRepository::insert_tx(&tx, &log)?;
        tx.commit()?;

        info!(inspection_id = %inspection_id, tire_id = %updated.tire_id, "巡检已修改");
        Ok(updated)
    }

    /// 整车批量巡检
    ///
    /// 为车辆上每个有读数的在装轮胎写入一条巡检；可同时记录工单费用并关闭工单
    pub fn bulk_inspect_vehicle(&self, request: &BulkInspectionRequest) -> EngineResult<BulkInspectionResult> {
        let mut conn = lock_conn(&self.conn)?;
        let tx = begin_immediate(&mut conn)?;

        if VehicleRepository::find_vehicle_tx(&tx, &request.vehicle_id)?.is_none() {
            return Err(EngineError::not_found("Vehicle", &request.vehicle_id));
        }
        let order = WorkOrderGate::require_opened(&tx, &request.work_order_id)?;
        WorkOrderGate::require_vehicle(&order, &request.vehicle_id)?;

        // tire_id → position_id（仅该车在装轮胎）
        let mounted: HashMap<String, String> = VehicleRepository::list_positions_tx(&tx, &request.vehicle_id)?
            .into_iter()
            .filter_map(|p| p.mounted_tire_id.map(|tire_id| (tire_id, p.position_id)))
            .collect();

        let mut seen = HashSet::with_capacity(request.readings.len());
        if let Some(dup) = request.readings.iter().find(|r| !seen.insert(r.tire_id.as_str())) {
            return Err(Precondition::DuplicateReading {
                tire_id: dup.tire_id.clone(),
            }
            .into());
        }

        let inspected_at = chrono::Local::now().naive_local();
        let mut inspections = Vec::with_capacity(request.readings.len());
        for reading in &request.readings {
            let position_id = mounted.get(&reading.tire_id).ok_or_else(|| {
                EngineError::from(Precondition::TireNotOnVehicle {
                    tire_id: reading.tire_id.clone(),
                    vehicle_id: request.vehicle_id.clone(),
                })
            })?;

            let single = InspectionRequest {
                tire_id: reading.tire_id.clone(),
                position_id: position_id.clone(),
                work_order_id: Some(order.work_order_id.clone()),
                inspection_odometer: request.odometer,
                inspector_id: request.inspector_id.clone(),
                driver_id: request.driver_id.clone(),
                tread_depth: reading.tread_depth,
                pressure: reading.pressure,
                wear_type_id: reading.wear_type_id.clone(),
                recommended_action: reading.recommended_action,
                inspected_at: Some(inspected_at),
                actor: request.actor.clone(),
            };
            // 工单已在上方校验
            Self::validate_tx(&tx, &single, &InspectionPolicy { require_open_work_order: false })?;
            let inspection = Self::build_tx(&tx, uuid::Uuid::new_v4().to_string(), &single, None)?;
            InspectionRepository::insert_tx(&tx, &inspection)?;
            TireRepository::update_cached_readings_tx(&tx, &inspection.tire_id, inspection.tread_depth, inspection.pressure)?;
            inspections.push(inspection);
        }

        let log = ActionLog::new(ActionType::BulkInspection, &request.actor)
            .with_vehicle(&request.vehicle_id)
            .with_payload(json!({
                "work_order_id": order.work_order_id,
                "odometer": request.odometer,
                "inspection_ids": inspections.iter().map(|i| i.inspection_id.as_str()).collect::<Vec<_>>(),
            }));
        ActionLogRepository::insert_tx(&tx, &log)?;

        let work_order = if request.close_work_order {
            WorkOrderGate::close_tx(&tx, &order.work_order_id, request.cost, &request.actor)?
        } else if let Some(cost) = request.cost {
            WorkOrderRepository::update_status_tx(&tx, &order.work_order_id, WorkOrderStatus::Opened, Some(cost))?;
            WorkOrder { cost, ..order }
        } else {
            order
        };
        tx.commit()?;

        info!(
            vehicle_id = %request.vehicle_id,
            count = inspections.len(),
            closed = request.close_work_order,
            "整车巡检已记录"
        );
        Ok(BulkInspectionResult {
            inspections,
            work_order,
        })
    }

    // ==========================================
    // 事务内辅助
    // ==========================================

    fn validate_tx(conn: &Connection, request: &InspectionRequest, policy: &InspectionPolicy) -> EngineResult<()> {
        if TireRepository::find_tx(conn, &request.tire_id)?.is_none() {
            return Err(EngineError::not_found("Tire", &request.tire_id));
        }
        if VehicleRepository::find_position_tx(conn, &request.position_id)?.is_none() {
            return Err(EngineError::not_found("TirePosition", &request.position_id));
        }
        if WorkOrderRepository::find_employee_tx(conn, &request.inspector_id)?.is_none() {
            return Err(EngineError::not_found("Employee", &request.inspector_id));
        }
        if !InspectionRepository::wear_type_exists_tx(conn, &request.wear_type_id)? {
            return Err(EngineError::not_found("TireWearType", &request.wear_type_id));
        }
        if let Some(work_order_id) = request.work_order_id.as_deref() {
            if policy.require_open_work_order {
                WorkOrderGate::require_opened(conn, work_order_id)?;
            } else if WorkOrderRepository::find_tx(conn, work_order_id)?.is_none() {
                return Err(EngineError::not_found("WorkOrder", work_order_id));
            }
        }
        Ok(())
    }

    /// 计算基准并组装巡检实体
    ///
    /// exclude_inspection_id: 修改时排除记录自身
    fn build_tx(
        conn: &Connection,
        inspection_id: String,
        request: &InspectionRequest,
        exclude_inspection_id: Option<&str>,
    ) -> EngineResult<TireInspection> {
        let tire = TireRepository::find_tx(conn, &request.tire_id)?
            .ok_or_else(|| EngineError::not_found("Tire", &request.tire_id))?;
        let pattern = TireRepository::find_pattern_tx(conn, &tire.pattern_id)?
            .ok_or_else(|| EngineError::not_found("TirePattern", &tire.pattern_id))?;

        let baseline = match InspectionRepository::find_latest_for_tire_tx(conn, &tire.tire_id, exclude_inspection_id)? {
            Some(prev) => WearBaseline {
                tread_depth: prev.tread_depth,
                odometer: prev.inspection_odometer,
            },
            None => WearBaseline {
                tread_depth: pattern.initial_tread_depth,
                odometer: AssignmentRepository::find_first_for_tire_tx(conn, &tire.tire_id)?
                    .map(|a| a.start_odometer)
                    .unwrap_or(0),
            },
        };
        // 当前轮位的起始里程取自 last_assignment（与轮胎位置同步维护）
        let placement_start = match tire.last_assignment_id.as_deref() {
            Some(assignment_id) => AssignmentRepository::find_tx(conn, assignment_id)?.map(|a| a.start_odometer),
            None => None,
        };

        let inputs = WearInputs::new(
            &pattern,
            tire.purchase_cost,
            baseline,
            request.tread_depth,
            request.pressure,
            request.inspection_odometer,
        )
        .with_placement_start(placement_start);
        let metrics = wear_metrics::compute(&inputs);
        debug!(tire_id = %tire.tire_id, ?baseline, ?metrics, "巡检指标已计算");

        Ok(TireInspection {
            inspection_id,
            tire_id: request.tire_id.clone(),
            position_id: request.position_id.clone(),
            work_order_id: request.work_order_id.clone(),
            inspection_odometer: request.inspection_odometer,
            inspector_id: request.inspector_id.clone(),
            driver_id: request.driver_id.clone(),
            tread_depth: request.tread_depth,
            pressure: request.pressure,
            wear_type_id: request.wear_type_id.clone(),
            recommended_action: request.recommended_action,
            metrics,
            inspected_at: request
                .inspected_at
                .unwrap_or_else(|| chrono::Local::now().naive_local()),
        })
    }
}
