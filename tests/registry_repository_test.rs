// ==========================================
// 登记数据仓储集成测试
// ==========================================
// 覆盖: 车辆/轮位/状态/人员查找，车辆删除级联
// ==========================================

#[path = "helpers/fleet_fixture.rs"]
mod fleet_fixture;

#[cfg(test)]
mod registry_repository_test {
    use crate::fleet_fixture::{FleetFixture, INSPECTOR_ID, READY_STATUS_ID};
    use fleet_tires::domain::TirePosition;
    use fleet_tires::repository::RepositoryError;
    use fleet_tires::TireLifecycle;

    #[test]
    fn test_lookup_by_natural_keys() {
        let fx = FleetFixture::new();

        let vehicle = fx.state.vehicle_repo.find_by_plate("沪A00002").unwrap().unwrap();
        assert_eq!(vehicle.vehicle_id, "V2");
        assert!(fx.state.vehicle_repo.find_by_plate("沪Z99999").unwrap().is_none());

        let ready = fx.state.tire_repo.find_status_by_name("READY").unwrap().unwrap();
        assert_eq!(ready.status_id, READY_STATUS_ID);
        assert!(fx.state.tire_repo.find_status_by_name("DISCARDED").unwrap().is_none());

        let inspector = fx.state.work_order_repo.find_employee(INSPECTOR_ID).unwrap().unwrap();
        assert_eq!(inspector.employment_code, "E-001");
    }

    #[test]
    fn test_add_position_enforces_axle_wheel_uniqueness() {
        let fx = FleetFixture::new();
        let spare = TirePosition {
            position_id: "V2-SPARE".to_string(),
            vehicle_id: "V2".to_string(),
            position_name: "备胎".to_string(),
            axle_number: 9,
            wheel_number: 1,
            is_spare: true,
            mounted_tire_id: None,
        };
        fx.state.vehicle_repo.add_position(&spare).unwrap();
        assert_eq!(fx.state.vehicle_repo.list_positions("V2").unwrap().len(), 3);

        let clash = TirePosition {
            position_id: "V2-CLASH".to_string(),
            ..spare
        };
        let err = fx.state.vehicle_repo.add_position(&clash).unwrap_err();
        assert!(
            matches!(err, RepositoryError::UniqueConstraintViolation(_)),
            "got {:?}",
            err
        );
    }

    #[test]
    fn test_delete_vehicle_unmounts_its_tires() {
        let fx = FleetFixture::new();
        let order = fx.open_order("V2", "WO-DEL", 20_000);
        fx.mount("T1", "V2-P1", &order.work_order_id);
        assert_eq!(fx.tire("T1").lifecycle(), TireLifecycle::Mounted);

        fx.state.vehicle_repo.delete("V2").unwrap();

        assert!(fx.state.vehicle_repo.find_by_id("V2").unwrap().is_none());
        assert!(fx.state.vehicle_repo.find_position("V2-P1").unwrap().is_none());
        let tire = fx.tire("T1");
        assert!(tire.current_position_id.is_none());
        assert_eq!(tire.lifecycle(), TireLifecycle::Unmounted);
        fx.assert_consistent();

        match fx.state.vehicle_repo.delete("V2").unwrap_err() {
            RepositoryError::NotFound { entity, .. } => assert_eq!(entity, "Vehicle"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }
}
