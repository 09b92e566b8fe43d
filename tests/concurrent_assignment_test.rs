// ==========================================
// 并发分配测试
// ==========================================
// 职责: 多个连接同时争抢同一轮位/同一轮胎时，恰好一个成功且登记一致
// ==========================================

#[path = "helpers/fleet_fixture.rs"]
mod fleet_fixture;

#[cfg(test)]
mod concurrent_assignment_test {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use crate::fleet_fixture::FleetFixture;
    use fleet_tires::app::AppState;
    use fleet_tires::domain::TireAssignment;
    use fleet_tires::engine::{EngineError, Precondition};

    /// 每个线程独立连接，同步起跑后提交一次新胎装车
    fn race(
        fx: &FleetFixture,
        attempts: Vec<(&'static str, &'static str)>,
        work_order_id: &str,
    ) -> Vec<Result<TireAssignment, EngineError>> {
        let barrier = Arc::new(Barrier::new(attempts.len()));
        let handles: Vec<_> = attempts
            .into_iter()
            .map(|(tire_id, position_id)| {
                let state = AppState::new(fx.db_path.clone()).unwrap();
                let request = FleetFixture::mount_form(tire_id, position_id, work_order_id)
                    .into_request()
                    .unwrap();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    state.assignment_engine.create_assignment(&request)
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    }

    #[test]
    fn test_concurrent_mounts_into_one_position() {
        let fx = FleetFixture::new();
        let wo = fx.open_order("V1", "WO-1", 50_000);

        let results = race(
            &fx,
            vec![("T1", "V1-P1"), ("T2", "V1-P1"), ("T3", "V1-P1"), ("T4", "V1-P1")],
            &wo.work_order_id,
        );

        let winners: Vec<&TireAssignment> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1, "results: {:?}", results);
        for result in &results {
            if let Err(e) = result {
                assert_eq!(
                    e.precondition(),
                    Some(&Precondition::PositionOccupied {
                        position_id: "V1-P1".to_string()
                    })
                );
            }
        }

        let winner = winners[0].tire_id.as_str();
        assert!(fx.position("V1-P1").holds(winner));
        assert_eq!(fx.state.assignment_repo.count_all().unwrap(), 1);
        for tire_id in ["T1", "T2", "T3", "T4"] {
            if tire_id != winner {
                assert_eq!(fx.tire(tire_id).current_position_id, None);
            }
        }
        fx.assert_consistent();
    }

    #[test]
    fn test_concurrent_mounts_of_one_tire() {
        let fx = FleetFixture::new();
        let wo = fx.open_order("V1", "WO-1", 50_000);

        let results = race(
            &fx,
            vec![("T1", "V1-P1"), ("T1", "V1-P2"), ("T1", "V1-P3")],
            &wo.work_order_id,
        );

        let winners: Vec<&TireAssignment> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1, "results: {:?}", results);
        for result in &results {
            if let Err(e) = result {
                assert!(matches!(e.precondition(), Some(Precondition::TireAlreadyMounted { .. })));
            }
        }

        let placed = winners[0].to_position_id.clone().unwrap();
        assert_eq!(fx.tire("T1").current_position_id, Some(placed));
        let occupied = ["V1-P1", "V1-P2", "V1-P3"]
            .iter()
            .filter(|p| fx.position(p).is_occupied())
            .count();
        assert_eq!(occupied, 1);
        fx.assert_consistent();
    }
}
