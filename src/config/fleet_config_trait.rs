// ==========================================
// 车队轮胎管理系统 - 引擎配置读取 Trait
// ==========================================
// 职责: 定义引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// 约定: 引擎在获取数据库连接锁之前一次性读出策略
// ==========================================

use serde::{Deserialize, Serialize};
use std::error::Error;

// ==========================================
// StatusLabels - 轮胎状态标签名
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLabels {
    pub ready: String,
    pub mounted: String,
    pub discarded: String,
}

impl Default for StatusLabels {
    fn default() -> Self {
        Self {
            ready: "READY".to_string(),
            mounted: "MOUNTED".to_string(),
            discarded: "DISCARDED".to_string(),
        }
    }
}

// ==========================================
// AssignmentPolicy - 分配引擎策略
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssignmentPolicy {
    pub labels: StatusLabels,
    /// 为 true 时，非跨车操作的工单必须属于被操作轮位所在车辆
    pub require_vehicle_match: bool,
}

// ==========================================
// InspectionPolicy - 巡检策略
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionPolicy {
    /// 为 true 时，巡检挂接的工单必须为 OPENED
    pub require_open_work_order: bool,
}

impl Default for InspectionPolicy {
    fn default() -> Self {
        Self {
            require_open_work_order: true,
        }
    }
}

// ==========================================
// FleetConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
pub trait FleetConfigReader: Send + Sync {
    /// "待装车"状态标签名，默认 READY
    fn get_ready_label(&self) -> Result<String, Box<dyn Error>>;

    /// "已装车"状态标签名，默认 MOUNTED
    fn get_mounted_label(&self) -> Result<String, Box<dyn Error>>;

    /// "已报废"状态标签名，默认 DISCARDED
    fn get_discarded_label(&self) -> Result<String, Box<dyn Error>>;

    /// 默认 false
    fn get_require_vehicle_match(&self) -> Result<bool, Box<dyn Error>>;

    /// 默认 true
    fn get_require_open_work_order(&self) -> Result<bool, Box<dyn Error>>;

    fn assignment_policy(&self) -> Result<AssignmentPolicy, Box<dyn Error>> {
        Ok(AssignmentPolicy {
            labels: StatusLabels {
                ready: self.get_ready_label()?,
                mounted: self.get_mounted_label()?,
                discarded: self.get_discarded_label()?,
            },
            require_vehicle_match: self.get_require_vehicle_match()?,
        })
    }

    fn inspection_policy(&self) -> Result<InspectionPolicy, Box<dyn Error>> {
        Ok(InspectionPolicy {
            require_open_work_order: self.get_require_open_work_order()?,
        })
    }
}
