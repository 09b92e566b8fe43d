// ==========================================
// 车队轮胎管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod assignment;
pub mod inspection;
pub mod tire;
pub mod types;
pub mod vehicle;
pub mod work_order;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use assignment::TireAssignment;
pub use inspection::{TireInspection, TireWearType, WearMetrics};
pub use tire::{Tire, TirePattern, TireStatus};
pub use types::{
    OperationKind, RecommendedAction, ShiftType, TireLifecycle, VehicleStatus, VehicleType,
    WorkOrderStatus,
};
pub use vehicle::{TirePosition, Vehicle};
pub use work_order::{Employee, WorkOrder};
