// ==========================================
// 车队轮胎管理系统 - 轮胎领域模型
// ==========================================
// 对齐: tire / tire_pattern / tire_status 表
// ==========================================

use crate::domain::types::TireLifecycle;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// TireStatus - 轮胎状态标签
// ==========================================
// 标签名可配置（READY / MOUNTED / DISCARDED 等）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TireStatus {
    pub status_id: String,
    pub status_name: String,
    pub description: String,
}

// ==========================================
// TirePattern - 花纹规格
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TirePattern {
    pub pattern_id: String,
    pub pattern_code: String,
    pub brand_name: String,
    pub initial_tread_depth: f64,    // 新胎花纹深度 (mm)
    pub discarding_tread_depth: f64, // 报废花纹深度 (mm)
    pub ideal_tire_pressure: f64,    // 标准气压
}

// ==========================================
// Tire - 轮胎
// ==========================================
// 红线: current_position_id 非空时，该轮位的 mounted_tire_id 必须等于本轮胎
// 缓存字段: last_tread_depth / last_pressure / last_assignment_id
//           只随巡检/分配写入在同一事务内刷新，不是独立状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tire {
    pub tire_id: String,
    pub serial_number: String,
    pub pattern_id: String,
    pub status_id: String,
    pub purchase_date: NaiveDate,
    pub purchase_cost: f64,

    // ===== 缓存（最近一次巡检） =====
    pub last_tread_depth: Option<f64>,
    pub last_pressure: Option<f64>,

    // ===== 装车状态 =====
    pub current_position_id: Option<String>,
    pub is_scrapped: bool,
    pub last_assignment_id: Option<String>,

    // ===== 乐观锁 =====
    pub revision: i64,
}

impl Tire {
    /// 当前生命周期阶段
    pub fn lifecycle(&self) -> TireLifecycle {
        if self.is_scrapped {
            TireLifecycle::Discarded
        } else if self.current_position_id.is_some() {
            TireLifecycle::Mounted
        } else {
            TireLifecycle::Unmounted
        }
    }
}
