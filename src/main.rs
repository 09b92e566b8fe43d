// ==========================================
// 车队轮胎管理系统 - 命令行入口
// ==========================================
// 用法: fleet-tire-tracker [DB_PATH]
// 输出: 车辆轮位占用概览 + 一致性巡查结果
// ==========================================

use anyhow::{anyhow, Context, Result};
use fleet_tires::app::{get_default_db_path, AppState};
use fleet_tires::engine::Inconsistency;

fn main() -> Result<()> {
    // 初始化日志系统（FLEET_TIRES_LOG_FORMAT=json 输出 JSON 行）
    match std::env::var("FLEET_TIRES_LOG_FORMAT").as_deref() {
        Ok("json") => fleet_tires::logging::init_json(),
        _ => fleet_tires::logging::init(),
    }

    tracing::info!("==================================================");
    tracing::info!("{}", fleet_tires::APP_NAME);
    tracing::info!("系统版本: {}", fleet_tires::VERSION);
    tracing::info!("==================================================");

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(|e| anyhow!(e)).context("无法初始化AppState")?;

    let vehicles = state.vehicle_repo.list_all().context("读取车辆失败")?;
    println!("车辆数: {}", vehicles.len());
    for vehicle in &vehicles {
        let positions = state
            .vehicle_repo
            .list_positions(&vehicle.vehicle_id)
            .with_context(|| format!("读取轮位失败: {}", vehicle.license_plate))?;
        let occupied = positions.iter().filter(|p| p.is_occupied()).count();
        let opened = state
            .work_order_repo
            .find_opened_by_vehicle(&vehicle.vehicle_id)
            .context("读取工单失败")?;
        println!(
            "  {} [{}] 轮位 {}/{} 已装胎, 工单: {}",
            vehicle.license_plate,
            vehicle.vehicle_type,
            occupied,
            positions.len(),
            opened.map(|o| o.work_order_number).unwrap_or_else(|| "-".to_string()),
        );
    }

    let unmounted = state.tire_repo.list_unmounted().context("读取库存轮胎失败")?;
    println!("库存轮胎: {}", unmounted.len());

    let issues = state.registry_audit.find_inconsistencies().context("一致性巡查失败")?;
    if issues.is_empty() {
        println!("一致性巡查: 通过");
    } else {
        println!("一致性巡查: 发现 {} 处不一致", issues.len());
        for issue in &issues {
            match issue {
                Inconsistency::TireNotHeldByPosition { tire_id, position_id } => {
                    println!("  轮胎 {} 指向轮位 {}，但轮位未装该胎", tire_id, position_id)
                }
                Inconsistency::PositionHoldsDetachedTire { position_id, tire_id } => {
                    println!("  轮位 {} 装着轮胎 {}，但轮胎未指向该位", position_id, tire_id)
                }
                Inconsistency::ScrappedTireMounted { tire_id, position_id } => {
                    println!("  已报废轮胎 {} 仍在轮位 {}", tire_id, position_id)
                }
            }
        }
    }

    Ok(())
}
