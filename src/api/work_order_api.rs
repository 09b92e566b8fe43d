// ==========================================
// 车队轮胎管理系统 - 工单 API
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::assignment_api::{non_blank, require_id};
use crate::api::error::{ApiError, ApiResult};
use crate::domain::types::ShiftType;
use crate::domain::work_order::WorkOrder;
use crate::engine::{OpenWorkOrderRequest, WorkOrderGate};
use crate::repository::WorkOrderRepository;

/// 开工单表单
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenWorkOrderForm {
    pub work_order_number: String,
    pub vehicle_id: String,
    pub assigned_to: Option<String>,
    pub shift_type: Option<String>, // 缺省 INSTALLATION
    pub current_odometer: i64,
    pub actor: String,
}

pub struct WorkOrderApi {
    gate: Arc<WorkOrderGate>,
    work_order_repo: Arc<WorkOrderRepository>,
}

impl WorkOrderApi {
    pub fn new(gate: Arc<WorkOrderGate>, work_order_repo: Arc<WorkOrderRepository>) -> Self {
        Self {
            gate,
            work_order_repo,
        }
    }

    pub fn open_work_order(&self, form: OpenWorkOrderForm) -> ApiResult<WorkOrder> {
        if form.current_odometer < 0 {
            return Err(ApiError::InvalidInput(format!("里程不能为负: {}", form.current_odometer)));
        }
        let request = OpenWorkOrderRequest {
            work_order_number: require_id("work_order_number", &form.work_order_number)?,
            vehicle_id: require_id("vehicle_id", &form.vehicle_id)?,
            assigned_to: non_blank(form.assigned_to),
            shift_type: form
                .shift_type
                .as_deref()
                .map(ShiftType::from_str)
                .unwrap_or(ShiftType::Installation),
            current_odometer: form.current_odometer,
            actor: form.actor,
        };
        Ok(self.gate.open_work_order(&request)?)
    }

    pub fn close_work_order(&self, work_order_id: &str, cost: Option<f64>, actor: &str) -> ApiResult<WorkOrder> {
        if let Some(cost) = cost {
            if !cost.is_finite() || cost < 0.0 {
                return Err(ApiError::InvalidInput(format!("费用无效: {}", cost)));
            }
        }
        let work_order_id = require_id("work_order_id", work_order_id)?;
        Ok(self.gate.close_work_order(&work_order_id, cost, actor)?)
    }

    pub fn get_opened_for_vehicle(&self, vehicle_id: &str) -> ApiResult<Option<WorkOrder>> {
        Ok(self.work_order_repo.find_opened_by_vehicle(vehicle_id)?)
    }
}
