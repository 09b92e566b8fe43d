// ==========================================
// 车队轮胎管理系统 - 工单与人员领域模型
// ==========================================
// 对齐: work_order / employee 表
// ==========================================

use crate::domain::types::{ShiftType, WorkOrderStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// WorkOrder - 工单（授权信封）
// ==========================================
// 红线: 每辆车同一时刻最多一张 OPENED 工单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub work_order_id: String,
    pub work_order_number: String,
    pub vehicle_id: String,
    pub assigned_to: Option<String>, // 负责人 employee_id
    pub shift_type: ShiftType,
    pub status: WorkOrderStatus,
    pub current_odometer: i64, // 开单时里程
    pub cost: f64,
    pub created_at: NaiveDateTime,
}

impl WorkOrder {
    pub fn is_opened(&self) -> bool {
        self.status.permits_attachment()
    }
}

// ==========================================
// Employee - 人员（巡检员/负责人）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub employee_id: String,
    pub employment_code: String,
    pub first_name: String,
    pub last_name: String,
    pub position: Option<String>,
}
