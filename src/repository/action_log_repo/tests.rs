use super::ActionLogRepository;
use crate::domain::action_log::{ActionLog, ActionType};
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = crate::db::open_in_memory_with_schema().unwrap();
    Arc::new(Mutex::new(conn))
}

#[test]
fn test_insert_and_find_by_id() {
    let repo = ActionLogRepository::new(setup_test_db());

    let log = ActionLog::new(ActionType::TireMount, "tester")
        .with_tire("T1")
        .with_vehicle("V1")
        .with_payload(json!({ "to_position_id": "P1" }))
        .with_detail("mount");
    let id = repo.insert(&log).unwrap();

    let found = repo.find_by_id(&id).unwrap().unwrap();
    assert_eq!(found.action_type, "TireMount");
    assert_eq!(found.tire_id.as_deref(), Some("T1"));
    assert_eq!(found.payload_json, Some(json!({ "to_position_id": "P1" })));
}

#[test]
fn test_find_by_tire_newest_first() {
    let repo = ActionLogRepository::new(setup_test_db());

    repo.insert(&ActionLog::new(ActionType::TireMount, "a").with_tire("T1")).unwrap();
    repo.insert(&ActionLog::new(ActionType::TireMove, "a").with_tire("T1")).unwrap();
    repo.insert(&ActionLog::new(ActionType::TireMount, "a").with_tire("T2")).unwrap();

    let logs = repo.find_by_tire("T1").unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].action_type, "TireMove");
    assert_eq!(repo.count_by_type("TireMount").unwrap(), 2);
    assert_eq!(repo.find_recent(1).unwrap().len(), 1);
}

#[test]
fn test_find_missing_returns_none() {
    let repo = ActionLogRepository::new(setup_test_db());
    assert!(repo.find_by_id("nope").unwrap().is_none());
}
