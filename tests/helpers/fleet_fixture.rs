// ==========================================
// 车队测试夹具
// ==========================================
// 数据:
// - 车辆 V1（轮位 V1-P1..P3）、V2（轮位 V2-P1..P2）
// - 花纹 PT-1: 初始 16mm / 报废 3mm / 标准气压 110
// - 轮胎 T1..T4: 采购成本 390，状态 READY
// - 人员 EMP-1、磨损类型 WT-1
// ==========================================

#![allow(dead_code)]

#[path = "../test_helpers.rs"]
mod test_helpers;

use chrono::NaiveDate;
use tempfile::NamedTempFile;

use fleet_tires::api::{AssignmentForm, InspectionForm, OpenWorkOrderForm};
use fleet_tires::app::AppState;
use fleet_tires::domain::{
    Employee, Tire, TireAssignment, TireInspection, TirePattern, TirePosition, TireStatus,
    TireWearType, Vehicle, VehicleStatus, VehicleType, WorkOrder,
};

pub const READY_STATUS_ID: &str = "ST-READY";
pub const MOUNTED_STATUS_ID: &str = "ST-MOUNTED";
pub const INSPECTOR_ID: &str = "EMP-1";
pub const WEAR_TYPE_ID: &str = "WT-1";

pub struct FleetFixture {
    _temp_file: NamedTempFile,
    pub db_path: String,
    pub state: AppState,
}

impl FleetFixture {
    pub fn new() -> Self {
        fleet_tires::logging::init_test();
        let (temp_file, db_path) = test_helpers::create_test_db().unwrap();
        let state = AppState::new(db_path.clone()).unwrap();
        let fixture = Self {
            _temp_file: temp_file,
            db_path,
            state,
        };
        fixture.seed();
        fixture
    }

    fn seed(&self) {
        self.add_vehicle("V1", "沪A00001", 3);
        self.add_vehicle("V2", "沪A00002", 2);

        let tire_repo = &self.state.tire_repo;
        tire_repo
            .create_status(&status(READY_STATUS_ID, "READY"))
            .unwrap();
        tire_repo
            .create_status(&status(MOUNTED_STATUS_ID, "MOUNTED"))
            .unwrap();
        tire_repo
            .create_pattern(&TirePattern {
                pattern_id: "PT-1".to_string(),
                pattern_code: "HX-1".to_string(),
                brand_name: "Hengxing".to_string(),
                initial_tread_depth: 16.0,
                discarding_tread_depth: 3.0,
                ideal_tire_pressure: 110.0,
            })
            .unwrap();
        for n in 1..=4 {
            tire_repo.create(&new_tire(&format!("T{}", n))).unwrap();
        }

        self.state
            .work_order_repo
            .create_employee(&Employee {
                employee_id: INSPECTOR_ID.to_string(),
                employment_code: "E-001".to_string(),
                first_name: "Li".to_string(),
                last_name: "Ming".to_string(),
                position: None,
            })
            .unwrap();
        self.state
            .inspection_repo
            .create_wear_type(&TireWearType {
                wear_type_id: WEAR_TYPE_ID.to_string(),
                wear_name: "NORMAL".to_string(),
                description: String::new(),
            })
            .unwrap();
    }

    fn add_vehicle(&self, vehicle_id: &str, plate: &str, position_count: i32) {
        let vehicle = Vehicle {
            vehicle_id: vehicle_id.to_string(),
            license_plate: plate.to_string(),
            make: "Dongfeng".to_string(),
            vehicle_type: VehicleType::Truck,
            status: VehicleStatus::Active,
            tire_configuration: "4x2".to_string(),
        };
        let positions: Vec<TirePosition> = (1..=position_count)
            .map(|n| TirePosition {
                position_id: format!("{}-P{}", vehicle_id, n),
                vehicle_id: vehicle_id.to_string(),
                position_name: format!("位置{}", n),
                axle_number: 1 + (n - 1) / 2,
                wheel_number: 1 + (n - 1) % 2,
                is_spare: false,
                mounted_tire_id: None,
            })
            .collect();
        self.state
            .vehicle_repo
            .create_with_positions(&vehicle, &positions)
            .unwrap();
    }

    // ==========================================
    // 业务操作快捷方式
    // ==========================================

    pub fn open_order(&self, vehicle_id: &str, number: &str, odometer: i64) -> WorkOrder {
        self.state
            .work_order_api
            .open_work_order(OpenWorkOrderForm {
                work_order_number: number.to_string(),
                vehicle_id: vehicle_id.to_string(),
                assigned_to: Some(INSPECTOR_ID.to_string()),
                shift_type: None,
                current_odometer: odometer,
                actor: "tester".to_string(),
            })
            .unwrap()
    }

    pub fn mount_form(tire_id: &str, to: &str, work_order_id: &str) -> AssignmentForm {
        AssignmentForm {
            tire_id: tire_id.to_string(),
            from_position_ref: Some("NEW_MOUNT".to_string()),
            to_position_ref: Some(to.to_string()),
            work_order_id: work_order_id.to_string(),
            assignment_date: Some("2026-01-10".to_string()),
            actor: "tester".to_string(),
            ..Default::default()
        }
    }

    pub fn move_form(tire_id: &str, from: &str, to: &str, work_order_id: &str) -> AssignmentForm {
        AssignmentForm {
            tire_id: tire_id.to_string(),
            from_position_ref: Some(from.to_string()),
            to_position_ref: Some(to.to_string()),
            work_order_id: work_order_id.to_string(),
            assignment_date: Some("2026-02-10".to_string()),
            actor: "tester".to_string(),
            ..Default::default()
        }
    }

    pub fn mount(&self, tire_id: &str, to: &str, work_order_id: &str) -> TireAssignment {
        self.state
            .assignment_api
            .create_assignment(Self::mount_form(tire_id, to, work_order_id))
            .unwrap()
    }

    pub fn inspection_form(
        tire_id: &str,
        position_id: &str,
        odometer: i64,
        tread_depth: f64,
        pressure: f64,
        work_order_id: Option<&str>,
    ) -> InspectionForm {
        InspectionForm {
            tire_id: tire_id.to_string(),
            position_id: position_id.to_string(),
            odometer,
            inspector_id: INSPECTOR_ID.to_string(),
            tread_depth,
            pressure,
            wear_type_id: WEAR_TYPE_ID.to_string(),
            work_order_id: work_order_id.map(str::to_string),
            actor: "tester".to_string(),
            ..Default::default()
        }
    }

    pub fn inspect(
        &self,
        tire_id: &str,
        position_id: &str,
        odometer: i64,
        tread_depth: f64,
        pressure: f64,
        work_order_id: Option<&str>,
    ) -> TireInspection {
        self.state
            .inspection_api
            .create_inspection(Self::inspection_form(
                tire_id,
                position_id,
                odometer,
                tread_depth,
                pressure,
                work_order_id,
            ))
            .unwrap()
    }

    // ==========================================
    // 查询快捷方式
    // ==========================================

    pub fn tire(&self, tire_id: &str) -> Tire {
        self.state.tire_repo.find_by_id(tire_id).unwrap().unwrap()
    }

    pub fn position(&self, position_id: &str) -> TirePosition {
        self.state
            .vehicle_repo
            .find_position(position_id)
            .unwrap()
            .unwrap()
    }

    pub fn status_name(&self, status_id: &str) -> String {
        self.state
            .tire_repo
            .find_status(status_id)
            .unwrap()
            .unwrap()
            .status_name
    }

    pub fn assert_consistent(&self) {
        let issues = self.state.registry_audit.find_inconsistencies().unwrap();
        assert!(issues.is_empty(), "registry inconsistencies: {:?}", issues);
    }
}

fn status(status_id: &str, name: &str) -> TireStatus {
    TireStatus {
        status_id: status_id.to_string(),
        status_name: name.to_string(),
        description: String::new(),
    }
}

fn new_tire(tire_id: &str) -> Tire {
    Tire {
        tire_id: tire_id.to_string(),
        serial_number: format!("SN-{}", tire_id),
        pattern_id: "PT-1".to_string(),
        status_id: READY_STATUS_ID.to_string(),
        purchase_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
        purchase_cost: 390.0,
        last_tread_depth: None,
        last_pressure: None,
        current_position_id: None,
        is_scrapped: false,
        last_assignment_id: None,
        revision: 0,
    }
}
