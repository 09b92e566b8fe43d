// ==========================================
// 车队轮胎管理系统 - 操作日志领域模型
// ==========================================
// 红线: 所有写入必须记录（与业务写入同一事务）
// 对齐: action_log 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub action_type: String, // 存储为字符串，见 ActionType::as_str
    pub action_ts: NaiveDateTime,
    pub actor: String,

    // ===== 关联实体 =====
    pub tire_id: Option<String>,
    pub vehicle_id: Option<String>,

    // ===== 操作负载 =====
    pub payload_json: Option<JsonValue>,
    pub detail: Option<String>,
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    TireMount,        // 新胎装车
    TireMove,         // 换位/转车
    TireDiscard,      // 报废
    AssignmentUpdate, // 修改分配记录
    AssignmentDelete, // 删除分配记录（含状态回滚）
    InspectionCreate, // 新增巡检
    InspectionUpdate, // 修改巡检
    BulkInspection,   // 整车批量巡检
    WorkOrderOpen,    // 开工单
    WorkOrderClose,   // 关工单
}

impl ActionType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::TireMount => "TireMount",
            ActionType::TireMove => "TireMove",
            ActionType::TireDiscard => "TireDiscard",
            ActionType::AssignmentUpdate => "AssignmentUpdate",
            ActionType::AssignmentDelete => "AssignmentDelete",
            ActionType::InspectionCreate => "InspectionCreate",
            ActionType::InspectionUpdate => "InspectionUpdate",
            ActionType::BulkInspection => "BulkInspection",
            ActionType::WorkOrderOpen => "WorkOrderOpen",
            ActionType::WorkOrderClose => "WorkOrderClose",
        }
    }
}

impl ActionLog {
    /// 构造一条新的操作日志（action_id 自动生成，时间取当前 UTC）
    pub fn new(action_type: ActionType, actor: &str) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: action_type.as_str().to_string(),
            action_ts: chrono::Utc::now().naive_utc(),
            actor: actor.to_string(),
            tire_id: None,
            vehicle_id: None,
            payload_json: None,
            detail: None,
        }
    }

    pub fn with_tire(mut self, tire_id: &str) -> Self {
        self.tire_id = Some(tire_id.to_string());
        self
    }

    pub fn with_vehicle(mut self, vehicle_id: &str) -> Self {
        self.vehicle_id = Some(vehicle_id.to_string());
        self
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload_json = Some(payload);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
