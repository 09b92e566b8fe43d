// ==========================================
// 巡检记录器集成测试
// ==========================================
// 职责: 验证磨损指标推导、读数缓存刷新、工单校验与整车批量巡检
// ==========================================

#[path = "helpers/fleet_fixture.rs"]
mod fleet_fixture;

#[cfg(test)]
mod inspection_recorder_test {
    use crate::fleet_fixture::{FleetFixture, INSPECTOR_ID, WEAR_TYPE_ID};
    use fleet_tires::api::ApiError;
    use fleet_tires::config::config_keys;
    use fleet_tires::domain::WorkOrderStatus;
    use fleet_tires::engine::{BulkInspectionRequest, EngineError, Precondition, TireReading};

    const EPS: f64 = 1e-6;

    fn reading(tire_id: &str, tread_depth: f64, pressure: f64) -> TireReading {
        TireReading {
            tire_id: tire_id.to_string(),
            tread_depth,
            pressure,
            wear_type_id: WEAR_TYPE_ID.to_string(),
            recommended_action: None,
        }
    }

    fn bulk(vehicle_id: &str, work_order_id: &str, readings: Vec<TireReading>) -> BulkInspectionRequest {
        BulkInspectionRequest {
            vehicle_id: vehicle_id.to_string(),
            work_order_id: work_order_id.to_string(),
            inspector_id: INSPECTOR_ID.to_string(),
            driver_id: None,
            odometer: 60_000,
            readings,
            cost: None,
            close_work_order: false,
            actor: "tester".to_string(),
        }
    }

    // ==========================================
    // 指标推导
    // ==========================================

    #[test]
    fn test_first_inspection_uses_pattern_and_mount_odometer() {
        let fx = FleetFixture::new();
        let wo = fx.open_order("V1", "WO-1", 50_000);
        fx.mount("T1", "V1-P1", &wo.work_order_id);

        let inspection = fx.inspect("T1", "V1-P1", 58_000, 14.5, 105.0, Some(&wo.work_order_id));
        let m = &inspection.metrics;
        assert!((m.consumption_rate - 1.875).abs() < EPS);
        assert!((m.remaining_traveling_distance - 61_333.333_333).abs() < 1e-3);
        assert!((m.cost_per_mm_tread_depth - 30.0).abs() < EPS);
        assert!((m.cost_per_1000_km_travel - 562.5).abs() < EPS);
        assert!((m.fuel_consumption_increase - 0.2).abs() < EPS);
        assert!((m.fuel_loss_caused - 16.0).abs() < EPS);
        assert!((m.current_tire_value - 345.0).abs() < EPS);

        let tire = fx.tire("T1");
        assert_eq!(tire.last_tread_depth, Some(14.5));
        assert_eq!(tire.last_pressure, Some(105.0));

        // 落库后读回一致
        let stored = fx
            .state
            .inspection_repo
            .find_by_id(&inspection.inspection_id)
            .unwrap()
            .unwrap();
        assert!((stored.metrics.consumption_rate - 1.875).abs() < EPS);
        assert_eq!(stored.work_order_id.as_deref(), Some(wo.work_order_id.as_str()));
    }

    #[test]
    fn test_next_inspection_uses_previous_reading_as_baseline() {
        let fx = FleetFixture::new();
        let wo = fx.open_order("V1", "WO-1", 50_000);
        fx.mount("T1", "V1-P1", &wo.work_order_id);
        fx.inspect("T1", "V1-P1", 58_000, 14.5, 105.0, Some(&wo.work_order_id));

        let second = fx.inspect("T1", "V1-P1", 68_000, 13.0, 105.0, Some(&wo.work_order_id));
        let m = &second.metrics;
        assert!((m.consumption_rate - 1.5).abs() < EPS);
        assert!((m.remaining_traveling_distance - 66_666.666_667).abs() < 1e-3);
        assert_eq!(m.remaining_traveling_distance, m.balance_traveling_distance);
        // PTM = 68000 - 50000
        assert!((m.fuel_loss_caused - 36.0).abs() < EPS);
        assert!((m.current_tire_value - 300.0).abs() < EPS);
    }

    #[test]
    fn test_backdated_inspection_still_overwrites_cached_readings() {
        let fx = FleetFixture::new();
        let wo = fx.open_order("V1", "WO-1", 50_000);
        fx.mount("T1", "V1-P1", &wo.work_order_id);
        fx.inspect("T1", "V1-P1", 58_000, 14.5, 105.0, Some(&wo.work_order_id));

        let backdated = fx.inspect("T1", "V1-P1", 54_000, 15.2, 100.0, Some(&wo.work_order_id));
        // 基准为里程最大的巡检，里程倒退时磨耗率取 0
        assert_eq!(backdated.metrics.consumption_rate, 0.0);
        assert_eq!(backdated.metrics.remaining_traveling_distance, 0.0);

        let tire = fx.tire("T1");
        assert_eq!(tire.last_tread_depth, Some(15.2));
        assert_eq!(tire.last_pressure, Some(100.0));
    }

    #[test]
    fn test_inspection_without_assignment_history() {
        let fx = FleetFixture::new();

        let inspection = fx.inspect("T3", "V1-P3", 10_000, 15.0, 110.0, None);
        assert!((inspection.metrics.consumption_rate - 1.0).abs() < EPS);
        assert_eq!(inspection.metrics.fuel_consumption_increase, 0.0);
        assert_eq!(inspection.metrics.fuel_loss_caused, 0.0);
        assert_eq!(inspection.work_order_id, None);
    }

    // ==========================================
    // 校验
    // ==========================================

    #[test]
    fn test_closed_work_order_rejected_unless_policy_disabled() {
        let fx = FleetFixture::new();
        let wo = fx.open_order("V1", "WO-1", 50_000);
        fx.mount("T1", "V1-P1", &wo.work_order_id);
        fx.state
            .work_order_api
            .close_work_order(&wo.work_order_id, Some(80.0), "tester")
            .unwrap();

        let request = FleetFixture::inspection_form("T1", "V1-P1", 58_000, 14.5, 105.0, Some(&wo.work_order_id))
            .into_request()
            .unwrap();
        let result = fx.state.inspection_recorder.create_inspection(&request);
        assert!(matches!(
            result,
            Err(EngineError::PreconditionFailed(Precondition::WorkOrderNotOpened { .. }))
        ));
        assert!(fx.state.inspection_api.list_for_tire("T1").unwrap().is_empty());
        assert_eq!(fx.tire("T1").last_tread_depth, None);

        fx.state
            .config_manager
            .set_global_config_value(config_keys::REQUIRE_OPEN_WORK_ORDER, "false")
            .unwrap();
        fx.state.inspection_recorder.create_inspection(&request).unwrap();
        assert_eq!(fx.state.inspection_api.list_for_tire("T1").unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_references_are_not_found() {
        let fx = FleetFixture::new();

        let mut form = FleetFixture::inspection_form("T1", "V1-P1", 58_000, 14.5, 105.0, None);
        form.inspector_id = "EMP-404".to_string();
        let result = fx
            .state
            .inspection_recorder
            .create_inspection(&form.into_request().unwrap());
        assert!(matches!(result, Err(EngineError::NotFound { ref entity, .. }) if entity == "Employee"));

        let mut form = FleetFixture::inspection_form("T1", "V1-P1", 58_000, 14.5, 105.0, None);
        form.wear_type_id = "WT-404".to_string();
        match fx.state.inspection_api.create_inspection(form) {
            Err(ApiError::NotFound(msg)) => assert!(msg.contains("WT-404")),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_update_recomputes_against_other_inspections() {
        let fx = FleetFixture::new();
        let wo = fx.open_order("V1", "WO-1", 50_000);
        fx.mount("T1", "V1-P1", &wo.work_order_id);
        fx.inspect("T1", "V1-P1", 58_000, 14.5, 105.0, Some(&wo.work_order_id));
        let second = fx.inspect("T1", "V1-P1", 68_000, 13.0, 105.0, Some(&wo.work_order_id));

        // 工单关闭后仍可修正同一工单下的巡检
        fx.state
            .work_order_api
            .close_work_order(&wo.work_order_id, None, "tester")
            .unwrap();

        let form = FleetFixture::inspection_form("T1", "V1-P1", 68_000, 12.0, 110.0, Some(&wo.work_order_id));
        let updated = fx
            .state
            .inspection_api
            .update_inspection(&second.inspection_id, form)
            .unwrap();
        assert_eq!(updated.inspection_id, second.inspection_id);
        assert!((updated.metrics.consumption_rate - 2.5).abs() < EPS);
        assert_eq!(updated.metrics.fuel_consumption_increase, 0.0);
        assert_eq!(updated.inspected_at, second.inspected_at);
        assert_eq!(fx.tire("T1").last_tread_depth, Some(12.0));
        assert_eq!(fx.state.action_log_repo.count_by_type("InspectionUpdate").unwrap(), 1);

        let form = FleetFixture::inspection_form("T2", "V1-P1", 68_000, 12.0, 110.0, Some(&wo.work_order_id));
        let result = fx
            .state
            .inspection_recorder
            .update_inspection(&second.inspection_id, &form.into_request().unwrap());
        assert!(matches!(result, Err(EngineError::InvalidTransition { .. })));
    }

    // ==========================================
    // 整车批量巡检
    // ==========================================

    #[test]
    fn test_bulk_inspection_records_all_and_closes_order() {
        let fx = FleetFixture::new();
        let wo = fx.open_order("V1", "WO-1", 50_000);
        fx.mount("T1", "V1-P1", &wo.work_order_id);
        fx.mount("T2", "V1-P2", &wo.work_order_id);

        let mut request = bulk(
            "V1",
            &wo.work_order_id,
            vec![reading("T1", 14.0, 108.0), reading("T2", 14.5, 110.0)],
        );
        request.cost = Some(250.0);
        request.close_work_order = true;
        let result = fx.state.inspection_api.bulk_inspect_vehicle(&request).unwrap();

        assert_eq!(result.inspections.len(), 2);
        let t1 = result.inspections.iter().find(|i| i.tire_id == "T1").unwrap();
        assert_eq!(t1.position_id, "V1-P1");
        // (16 - 14) * 10000 / (60000 - 50000)
        assert!((t1.metrics.consumption_rate - 2.0).abs() < EPS);
        assert_eq!(result.work_order.status, WorkOrderStatus::Closed);
        assert_eq!(result.work_order.cost, 250.0);

        let stored = fx
            .state
            .work_order_repo
            .find_by_id(&wo.work_order_id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, WorkOrderStatus::Closed);
        assert_eq!(stored.cost, 250.0);
        assert_eq!(fx.tire("T2").last_tread_depth, Some(14.5));
        assert_eq!(fx.state.action_log_repo.count_by_type("BulkInspection").unwrap(), 1);
        assert_eq!(fx.state.action_log_repo.count_by_type("WorkOrderClose").unwrap(), 1);
    }

    #[test]
    fn test_bulk_inspection_with_cost_keeps_order_open() {
        let fx = FleetFixture::new();
        let wo = fx.open_order("V1", "WO-1", 50_000);
        fx.mount("T1", "V1-P1", &wo.work_order_id);

        let mut request = bulk("V1", &wo.work_order_id, vec![reading("T1", 14.0, 108.0)]);
        request.cost = Some(40.0);
        let result = fx.state.inspection_api.bulk_inspect_vehicle(&request).unwrap();

        assert_eq!(result.work_order.status, WorkOrderStatus::Opened);
        let stored = fx
            .state
            .work_order_repo
            .find_by_id(&wo.work_order_id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, WorkOrderStatus::Opened);
        assert_eq!(stored.cost, 40.0);
    }

    #[test]
    fn test_bulk_inspection_is_all_or_nothing() {
        let fx = FleetFixture::new();
        let wo = fx.open_order("V1", "WO-1", 50_000);
        fx.mount("T1", "V1-P1", &wo.work_order_id);

        // T3 未装在 V1 上
        let request = bulk(
            "V1",
            &wo.work_order_id,
            vec![reading("T1", 14.0, 108.0), reading("T3", 15.0, 110.0)],
        );
        let result = fx.state.inspection_recorder.bulk_inspect_vehicle(&request);
        assert_eq!(
            result.err().and_then(|e| e.precondition().cloned()),
            Some(Precondition::TireNotOnVehicle {
                tire_id: "T3".to_string(),
                vehicle_id: "V1".to_string(),
            })
        );
        assert!(fx.state.inspection_api.list_for_tire("T1").unwrap().is_empty());
        assert_eq!(fx.tire("T1").last_tread_depth, None);
    }

    #[test]
    fn test_bulk_inspection_rejects_foreign_or_empty_request() {
        let fx = FleetFixture::new();
        let wo1 = fx.open_order("V1", "WO-1", 50_000);
        fx.mount("T1", "V1-P1", &wo1.work_order_id);
        fx.open_order("V2", "WO-2", 80_000);

        let result = fx
            .state
            .inspection_recorder
            .bulk_inspect_vehicle(&bulk("V2", &wo1.work_order_id, vec![reading("T1", 14.0, 108.0)]));
        assert!(matches!(
            result,
            Err(EngineError::PreconditionFailed(Precondition::WorkOrderVehicleMismatch { .. }))
        ));

        let result = fx
            .state
            .inspection_api
            .bulk_inspect_vehicle(&bulk("V1", &wo1.work_order_id, Vec::new()));
        assert!(matches!(result, Err(ApiError::InvalidInput(_))));

        // 同一轮胎两条读数
        let result = fx.state.inspection_recorder.bulk_inspect_vehicle(&bulk(
            "V1",
            &wo1.work_order_id,
            vec![reading("T1", 14.0, 108.0), reading("T1", 13.5, 107.0)],
        ));
        match result {
            Err(EngineError::PreconditionFailed(Precondition::DuplicateReading { tire_id })) => {
                assert_eq!(tire_id, "T1")
            }
            other => panic!("Expected DuplicateReading, got {:?}", other),
        }
        assert!(fx.state.inspection_api.list_for_tire("T1").unwrap().is_empty());
        assert_eq!(fx.tire("T1").last_tread_depth, None);
    }
}
