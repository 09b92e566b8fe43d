// ==========================================
// 车队轮胎管理系统 - 配置层
// ==========================================
// 职责: 系统配置管理（状态标签名、工单/巡检校验策略）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod fleet_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use fleet_config_trait::{AssignmentPolicy, FleetConfigReader, InspectionPolicy, StatusLabels};
