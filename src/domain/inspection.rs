// ==========================================
// 车队轮胎管理系统 - 巡检领域模型
// ==========================================
// 对齐: tire_inspection / tire_wear_type 表
// ==========================================

use crate::domain::types::RecommendedAction;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// TireWearType - 磨损分类
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TireWearType {
    pub wear_type_id: String,
    pub wear_name: String,
    pub description: String,
}

// ==========================================
// WearMetrics - 派生指标
// ==========================================
// 创建时由上一次巡检（或花纹默认值）计算得出
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WearMetrics {
    pub consumption_rate: f64,             // CRP: 每万公里磨耗 (mm)
    pub remaining_traveling_distance: f64, // RTD: 剩余可行驶里程
    pub cost_per_mm_tread_depth: f64,      // Cmm: 每毫米花纹成本
    pub cost_per_1000_km_travel: f64,      // CKm: 每千公里成本
    pub fuel_consumption_increase: f64,    // FCI: 欠压导致的油耗增加
    pub fuel_loss_caused: f64,             // FLC: 当前轮位累计油耗损失
    pub current_tire_value: f64,           // CTV: 轮胎残值
    pub balance_traveling_distance: f64,   // BTD: 同 RTD（兼容字段）
}

// ==========================================
// TireInspection - 巡检记录
// ==========================================
// 观测值落库后不变；position_id / work_order_id 可被分配引擎重定向
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TireInspection {
    pub inspection_id: String,
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
    pub metrics: WearMetrics,
    pub inspected_at: NaiveDateTime,
}
