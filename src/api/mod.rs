// ==========================================
// 车队轮胎管理系统 - API 层
// ==========================================
// 职责: 接收扁平表单字段，调用引擎，错误转换为可展示消息
// ==========================================

pub mod assignment_api;
pub mod error;
pub mod inspection_api;
pub mod work_order_api;

// 重导出核心类型
pub use assignment_api::{AssignmentApi, AssignmentForm};
pub use error::{ApiError, ApiResult};
pub use inspection_api::{InspectionApi, InspectionForm};
pub use work_order_api::{OpenWorkOrderForm, WorkOrderApi};
