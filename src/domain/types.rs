// ==========================================
// 车队轮胎管理系统 - 领域类型定义
// ==========================================
// 存储格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 车辆类型 (Vehicle Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleType {
    Truck,   // 卡车
    Trailer, // 挂车
    Bus,     // 客车
    Van,     // 厢式车
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl VehicleType {
    /// 从字符串解析车辆类型（未知值归为 TRUCK）
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "TRAILER" => VehicleType::Trailer,
            "BUS" => VehicleType::Bus,
            "VAN" => VehicleType::Van,
            _ => VehicleType::Truck,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            VehicleType::Truck => "TRUCK",
            VehicleType::Trailer => "TRAILER",
            VehicleType::Bus => "BUS",
            VehicleType::Van => "VAN",
        }
    }
}

// ==========================================
// 车辆运营状态 (Vehicle Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    Active,      // 运营中
    Inactive,    // 停用
    Maintenance, // 维修中
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl VehicleStatus {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "INACTIVE" => VehicleStatus::Inactive,
            "MAINTENANCE" => VehicleStatus::Maintenance,
            _ => VehicleStatus::Active,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            VehicleStatus::Active => "ACTIVE",
            VehicleStatus::Inactive => "INACTIVE",
            VehicleStatus::Maintenance => "MAINTENANCE",
        }
    }
}

// ==========================================
// 工单状态 (Work Order Status)
// ==========================================
// 红线: 只有 OPENED 工单允许挂接新的分配记录/巡检记录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkOrderStatus {
    Pending,    // 待处理
    Opened,     // 已开启（唯一可挂接状态）
    InProgress, // 处理中
    Closed,     // 已关闭
    Cancelled,  // 已取消
}

impl fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl WorkOrderStatus {
    /// 从字符串解析工单状态
    ///
    /// 未知值返回 None，由调用方决定如何报错
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(WorkOrderStatus::Pending),
            "OPENED" => Some(WorkOrderStatus::Opened),
            "IN_PROGRESS" => Some(WorkOrderStatus::InProgress),
            "CLOSED" => Some(WorkOrderStatus::Closed),
            "CANCELLED" => Some(WorkOrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            WorkOrderStatus::Pending => "PENDING",
            WorkOrderStatus::Opened => "OPENED",
            WorkOrderStatus::InProgress => "IN_PROGRESS",
            WorkOrderStatus::Closed => "CLOSED",
            WorkOrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// 是否允许挂接新的分配/巡检
    pub fn permits_attachment(&self) -> bool {
        matches!(self, WorkOrderStatus::Opened)
    }
}

// ==========================================
// 工单作业类型 (Shift Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShiftType {
    Installation, // 装胎
    Removal,      // 拆胎
    Rotation,     // 换位
    Repair,       // 修补
    Inspection,   // 巡检
}

impl fmt::Display for ShiftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl ShiftType {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "REMOVAL" => ShiftType::Removal,
            "ROTATION" => ShiftType::Rotation,
            "REPAIR" => ShiftType::Repair,
            "INSPECTION" => ShiftType::Inspection,
            _ => ShiftType::Installation,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ShiftType::Installation => "INSTALLATION",
            ShiftType::Removal => "REMOVAL",
            ShiftType::Rotation => "ROTATION",
            ShiftType::Repair => "REPAIR",
            ShiftType::Inspection => "INSPECTION",
        }
    }
}

// ==========================================
// 分配操作类型 (Operation Kind)
// ==========================================
// NEW_MOUNT: from=空, to=有
// MOVE:      from=有, to=有
// DISCARD:   from=有, to=空, discard=true
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    NewMount, // 新胎装车
    Move,     // 换位/转车
    Discard,  // 报废
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::NewMount => write!(f, "NEW_MOUNT"),
            OperationKind::Move => write!(f, "MOVE"),
            OperationKind::Discard => write!(f, "DISCARD"),
        }
    }
}

impl OperationKind {
    /// 由已落库的位置引用反推操作类型
    pub fn from_record(from_set: bool, to_set: bool, is_discard: bool) -> Self {
        if is_discard || !to_set {
            OperationKind::Discard
        } else if from_set {
            OperationKind::Move
        } else {
            OperationKind::NewMount
        }
    }
}

// ==========================================
// 轮胎生命周期 (Tire Lifecycle)
// ==========================================
// UNMOUNTED → MOUNTED (NEW_MOUNT / MOVE-in)
// MOUNTED → MOUNTED (MOVE)
// MOUNTED → DISCARDED (DISCARD, 终态)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TireLifecycle {
    Unmounted, // 库存/未装车
    Mounted,   // 已装车
    Discarded, // 已报废
}

impl fmt::Display for TireLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TireLifecycle::Unmounted => write!(f, "UNMOUNTED"),
            TireLifecycle::Mounted => write!(f, "MOUNTED"),
            TireLifecycle::Discarded => write!(f, "DISCARDED"),
        }
    }
}

// ==========================================
// 巡检建议动作 (Recommended Action)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendedAction {
    Ok,             // 无需处理
    Rotate,         // 建议换位
    Repair,         // 需要修补
    Replace,        // 需要更换
    PressureAdjust, // 调整气压
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl RecommendedAction {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "OK" => Some(RecommendedAction::Ok),
            "ROTATE" => Some(RecommendedAction::Rotate),
            "REPAIR" => Some(RecommendedAction::Repair),
            "REPLACE" => Some(RecommendedAction::Replace),
            "PRESSURE_ADJUST" => Some(RecommendedAction::PressureAdjust),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            RecommendedAction::Ok => "OK",
            RecommendedAction::Rotate => "ROTATE",
            RecommendedAction::Repair => "REPAIR",
            RecommendedAction::Replace => "REPLACE",
            RecommendedAction::PressureAdjust => "PRESSURE_ADJUST",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_order_status_roundtrip_and_gate() {
        assert_eq!(WorkOrderStatus::from_str("opened"), Some(WorkOrderStatus::Opened));
        assert_eq!(WorkOrderStatus::from_str("IN_PROGRESS"), Some(WorkOrderStatus::InProgress));
        assert_eq!(WorkOrderStatus::from_str("bogus"), None);
        assert!(WorkOrderStatus::Opened.permits_attachment());
        assert!(!WorkOrderStatus::Pending.permits_attachment());
        assert!(!WorkOrderStatus::Closed.permits_attachment());
    }

    #[test]
    fn test_operation_kind_from_record() {
        assert_eq!(OperationKind::from_record(false, true, false), OperationKind::NewMount);
        assert_eq!(OperationKind::from_record(true, true, false), OperationKind::Move);
        assert_eq!(OperationKind::from_record(true, false, true), OperationKind::Discard);
    }
}
