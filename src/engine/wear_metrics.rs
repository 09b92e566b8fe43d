// ==========================================
// 车队轮胎管理系统 - 磨损/经济指标计算
// ==========================================
// 职责: 由两次读数之差推导 CRP / RTD / Cmm / CKm / FCI / FLC / CTV / BTD
// 输入: 基准读数 + 本次读数 + 花纹规格 + 采购成本
// 输出: WearMetrics（全部为确定性算术，分母非正时取 0）
// ==========================================

use crate::domain::inspection::WearMetrics;
use crate::domain::tire::TirePattern;

/// 计算基准：上一次巡检，或花纹初始深度 + 首次装车里程
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WearBaseline {
    pub tread_depth: f64,
    pub odometer: i64,
}

/// 一次指标计算的全部输入
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WearInputs {
    pub baseline: WearBaseline,
    pub tread_depth: f64,
    pub pressure: f64,
    pub odometer: i64,
    pub initial_tread_depth: f64,
    pub discarding_tread_depth: f64,
    pub ideal_tire_pressure: f64,
    pub purchase_cost: f64,
    /// 当前轮位起始里程（最新分配记录的 start_odometer）
    pub placement_start_odometer: Option<i64>,
}

impl WearInputs {
    pub fn new(
        pattern: &TirePattern,
        purchase_cost: f64,
        baseline: WearBaseline,
        tread_depth: f64,
        pressure: f64,
        odometer: i64,
    ) -> Self {
        Self {
            baseline,
            tread_depth,
            pressure,
            odometer,
            initial_tread_depth: pattern.initial_tread_depth,
            discarding_tread_depth: pattern.discarding_tread_depth,
            ideal_tire_pressure: pattern.ideal_tire_pressure,
            purchase_cost,
            placement_start_odometer: None,
        }
    }

    pub fn with_placement_start(mut self, start_odometer: Option<i64>) -> Self {
        self.placement_start_odometer = start_odometer;
        self
    }
}

/// 每万公里磨耗 CRP
///
/// 里程未增加或花纹未减少时为 0（不出现负值）
pub fn consumption_rate(prev_depth: f64, curr_depth: f64, prev_odometer: i64, curr_odometer: i64) -> f64 {
    if curr_odometer > prev_odometer && prev_depth > curr_depth {
        ((prev_depth - curr_depth) * 10_000.0) / (curr_odometer - prev_odometer) as f64
    } else {
        0.0
    }
}

/// 剩余可行驶里程 RTD（BTD 同式）
pub fn remaining_distance(curr_depth: f64, discard_depth: f64, crp: f64) -> f64 {
    if crp > 0.0 {
        ((curr_depth - discard_depth) / crp) * 10_000.0
    } else {
        0.0
    }
}

/// 每毫米花纹成本 Cmm
pub fn cost_per_mm(purchase_cost: f64, initial_depth: f64, discard_depth: f64) -> f64 {
    let usable = initial_depth - discard_depth;
    if usable > 0.0 {
        purchase_cost / usable
    } else {
        0.0
    }
}

/// 欠压油耗增加 FCI（超压时为负）
pub fn fuel_consumption_increase(ideal_pressure: f64, curr_pressure: f64) -> f64 {
    ((ideal_pressure - curr_pressure) / 10.0) * 0.4
}

/// 当前轮位累计油耗损失 FLC = FCI × (PTM / 100)
pub fn fuel_loss_caused(fci: f64, placement_start_odometer: Option<i64>, curr_odometer: i64) -> f64 {
    let ptm = placement_start_odometer
        .map(|start| (curr_odometer - start).max(0))
        .unwrap_or(0);
    fci * (ptm as f64 / 100.0)
}

/// 轮胎残值 CTV
pub fn current_value(purchase_cost: f64, curr_depth: f64, initial_depth: f64, discard_depth: f64) -> f64 {
    let usable = initial_depth - discard_depth;
    if usable > 0.0 {
        ((curr_depth - discard_depth) / usable) * purchase_cost
    } else {
        0.0
    }
}

/// 计算全部派生指标
pub fn compute(inputs: &WearInputs) -> WearMetrics {
    let crp = consumption_rate(
        inputs.baseline.tread_depth,
        inputs.tread_depth,
        inputs.baseline.odometer,
        inputs.odometer,
    );
    let rtd = remaining_distance(inputs.tread_depth, inputs.discarding_tread_depth, crp);
    let cmm = cost_per_mm(
        inputs.purchase_cost,
        inputs.initial_tread_depth,
        inputs.discarding_tread_depth,
    );
    let fci = fuel_consumption_increase(inputs.ideal_tire_pressure, inputs.pressure);

    WearMetrics {
        consumption_rate: crp,
        remaining_traveling_distance: rtd,
        cost_per_mm_tread_depth: cmm,
        cost_per_1000_km_travel: 10.0 * crp * cmm,
        fuel_consumption_increase: fci,
        fuel_loss_caused: fuel_loss_caused(fci, inputs.placement_start_odometer, inputs.odometer),
        current_tire_value: current_value(
            inputs.purchase_cost,
            inputs.tread_depth,
            inputs.initial_tread_depth,
            inputs.discarding_tread_depth,
        ),
        balance_traveling_distance: rtd,
    }
}
