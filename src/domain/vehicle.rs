// ==========================================
// 车队轮胎管理系统 - 车辆与轮位领域模型
// ==========================================
// 对齐: vehicle / tire_position 表
// ==========================================

use crate::domain::types::{VehicleStatus, VehicleType};
use serde::{Deserialize, Serialize};

// ==========================================
// Vehicle - 车辆
// ==========================================
// license_plate 唯一；删除车辆级联删除其轮位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub vehicle_id: String,
    pub license_plate: String,
    pub make: String,
    pub vehicle_type: VehicleType,
    pub status: VehicleStatus,
    pub tire_configuration: String, // 轮位配置描述，如 "6x4"
}

// ==========================================
// TirePosition - 轮位
// ==========================================
// 红线: mounted_tire_id 必须与该轮胎的 current_position_id 互相一致
// 唯一键: (vehicle_id, axle_number, wheel_number)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TirePosition {
    pub position_id: String,
    pub vehicle_id: String,
    pub position_name: String,
    pub axle_number: i32,
    pub wheel_number: i32,
    pub is_spare: bool,
    pub mounted_tire_id: Option<String>, // 当前装在此位的轮胎
}

impl TirePosition {
    /// 轮位是否被占用
    pub fn is_occupied(&self) -> bool {
        self.mounted_tire_id.is_some()
    }

    /// 当前是否装着指定轮胎
    pub fn holds(&self, tire_id: &str) -> bool {
        self.mounted_tire_id.as_deref() == Some(tire_id)
    }
}
