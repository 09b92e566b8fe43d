// ==========================================
// 车队轮胎管理系统 - 演示数据初始化
// ==========================================
// 用法: seed_demo_fleet [DB_PATH] [TRUCK_COUNT]
// 行为: 备份并重建数据库，写入车辆/轮位/花纹/轮胎，
//       经分配引擎完成装车与首检（走完整业务路径，保证一致性）
// ==========================================

use std::error::Error;
use std::fs;
use std::path::Path;

use chrono::{Duration, Local};

use fleet_tires::api::{AssignmentForm, InspectionForm, OpenWorkOrderForm};
use fleet_tires::app::{get_default_db_path, AppState};
use fleet_tires::domain::{
    Employee, Tire, TirePattern, TirePosition, TireStatus, TireWearType, Vehicle, VehicleStatus,
    VehicleType,
};

const DEFAULT_TRUCK_COUNT: usize = 3;
const SPARE_TIRE_COUNT: usize = 4;
const ACTOR: &str = "seed";

// 6x4 卡车: 前轴 2 个 + 两根后轴各 4 个
const TRUCK_LAYOUT: &[(i32, i32, &str)] = &[
    (1, 1, "左前"),
    (1, 2, "右前"),
    (2, 1, "二轴左外"),
    (2, 2, "二轴左内"),
    (2, 3, "二轴右内"),
    (2, 4, "二轴右外"),
    (3, 1, "三轴左外"),
    (3, 2, "三轴左内"),
    (3, 3, "三轴右内"),
    (3, 4, "三轴右外"),
];

fn main() -> Result<(), Box<dyn Error>> {
    fleet_tires::logging::init();

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    let truck_count = std::env::args()
        .nth(2)
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_TRUCK_COUNT)
        .max(1);

    backup_and_reset_db(&db_path)?;
    let state = AppState::new(db_path.clone())?;

    seed_reference_data(&state)?;
    for index in 1..=truck_count {
        seed_truck(&state, index)?;
    }
    seed_spare_tires(&state, truck_count)?;

    let issues = state.registry_audit.find_inconsistencies()?;
    eprintln!(
        "Seeded {} trucks into {} (tires={}, assignments={}, inconsistencies={})",
        truck_count,
        db_path,
        state.tire_repo.list_all()?.len(),
        state.assignment_repo.count_all()?,
        issues.len()
    );
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

fn seed_reference_data(state: &AppState) -> Result<(), Box<dyn Error>> {
    for (id, name, description) in [
        ("ST-READY", "READY", "库存可用"),
        ("ST-MOUNTED", "MOUNTED", "已装车"),
        ("ST-DISCARDED", "DISCARDED", "已报废"),
    ] {
        state.tire_repo.create_status(&TireStatus {
            status_id: id.to_string(),
            status_name: name.to_string(),
            description: description.to_string(),
        })?;
    }

    state.tire_repo.create_pattern(&TirePattern {
        pattern_id: "PT-HX315".to_string(),
        pattern_code: "HX-315/80R22.5".to_string(),
        brand_name: "Hengxing".to_string(),
        initial_tread_depth: 16.0,
        discarding_tread_depth: 3.0,
        ideal_tire_pressure: 110.0,
    })?;

    state.inspection_repo.create_wear_type(&TireWearType {
        wear_type_id: "WT-NORMAL".to_string(),
        wear_name: "NORMAL".to_string(),
        description: "均匀磨损".to_string(),
    })?;

    state.work_order_repo.create_employee(&Employee {
        employee_id: "EMP-001".to_string(),
        employment_code: "E001".to_string(),
        first_name: "Wei".to_string(),
        last_name: "Zhang".to_string(),
        position: Some("轮胎技师".to_string()),
    })?;
    Ok(())
}

fn new_tire(serial: String, purchase_offset_days: i64) -> Tire {
    Tire {
        tire_id: uuid::Uuid::new_v4().to_string(),
        serial_number: serial,
        pattern_id: "PT-HX315".to_string(),
        status_id: "ST-READY".to_string(),
        purchase_date: Local::now().date_naive() - Duration::days(purchase_offset_days),
        purchase_cost: 390.0,
        last_tread_depth: None,
        last_pressure: None,
        current_position_id: None,
        is_scrapped: false,
        last_assignment_id: None,
        revision: 0,
    }
}

/// 一辆卡车: 建轮位 → 开工单 → 逐位新胎装车 → 首检 → 关单
fn seed_truck(state: &AppState, index: usize) -> Result<(), Box<dyn Error>> {
    let vehicle_id = format!("V-{:03}", index);
    let vehicle = Vehicle {
        vehicle_id: vehicle_id.clone(),
        license_plate: format!("沪A{:05}", 10_000 + index),
        make: "Dongfeng".to_string(),
        vehicle_type: VehicleType::Truck,
        status: VehicleStatus::Active,
        tire_configuration: "6x4".to_string(),
    };
    let positions: Vec<TirePosition> = TRUCK_LAYOUT
        .iter()
        .map(|(axle, wheel, name)| TirePosition {
            position_id: format!("{}-A{}W{}", vehicle_id, axle, wheel),
            vehicle_id: vehicle_id.clone(),
            position_name: name.to_string(),
            axle_number: *axle,
            wheel_number: *wheel,
            is_spare: false,
            mounted_tire_id: None,
        })
        .collect();
    state.vehicle_repo.create_with_positions(&vehicle, &positions)?;

    let odometer = 40_000 + 5_000 * index as i64;
    let order = state.work_order_api.open_work_order(OpenWorkOrderForm {
        work_order_number: format!("WO-{}-INSTALL", vehicle_id),
        vehicle_id: vehicle_id.clone(),
        assigned_to: Some("EMP-001".to_string()),
        shift_type: Some("INSTALLATION".to_string()),
        current_odometer: odometer,
        actor: ACTOR.to_string(),
    })?;

    for (slot, position) in positions.iter().enumerate() {
        let tire = new_tire(format!("SN-{:03}-{:02}", index, slot + 1), 30);
        state.tire_repo.create(&tire)?;

        state.assignment_api.create_assignment(AssignmentForm {
            tire_id: tire.tire_id.clone(),
            from_position_ref: Some("NEW_MOUNT".to_string()),
            to_position_ref: Some(position.position_id.clone()),
            work_order_id: order.work_order_id.clone(),
            actor: ACTOR.to_string(),
            ..Default::default()
        })?;

        state.inspection_api.create_inspection(InspectionForm {
            tire_id: tire.tire_id.clone(),
            position_id: position.position_id.clone(),
            odometer: odometer + 8_000,
            inspector_id: "EMP-001".to_string(),
            tread_depth: 14.5 - 0.1 * slot as f64,
            pressure: 105.0,
            wear_type_id: "WT-NORMAL".to_string(),
            work_order_id: Some(order.work_order_id.clone()),
            actor: ACTOR.to_string(),
            ..Default::default()
        })?;
    }

    state
        .work_order_api
        .close_work_order(&order.work_order_id, Some(120.0), ACTOR)?;
    Ok(())
}

fn seed_spare_tires(state: &AppState, truck_count: usize) -> Result<(), Box<dyn Error>> {
    for n in 1..=SPARE_TIRE_COUNT {
        let tire = new_tire(format!("SN-SPARE-{:02}-{:02}", truck_count, n), 7);
        state.tire_repo.create(&tire)?;
    }
    Ok(())
}
