// ==========================================
// 车队轮胎管理系统 - 分配记录数据仓储
// ==========================================
// 对齐: tire_assignment 表
// 排序约定: assignment_date, created_at（同日按写入时间）
// ==========================================

use crate::domain::assignment::TireAssignment;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const ASSIGNMENT_COLUMNS: &str = r#"assignment_id, tire_id, from_position_id, to_position_id, is_discard,
    work_order_id, inspection_id, assignment_date, start_odometer, end_odometer,
    removal_date, reason_for_removal, notes, status_before_id, created_at"#;

// ==========================================
// AssignmentRepository - 分配记录仓储
// ==========================================
pub struct AssignmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AssignmentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn find_by_id(&self, assignment_id: &str) -> RepositoryResult<Option<TireAssignment>> {
        let conn = self.get_conn()?;
        Self::find_tx(&conn, assignment_id)
    }

    /// 轮胎的全部分配记录（时间正序）
    pub fn list_by_tire(&self, tire_id: &str) -> RepositoryResult<Vec<TireAssignment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM tire_assignment WHERE tire_id = ?1 ORDER BY assignment_date ASC, created_at ASC",
            ASSIGNMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let assignments = stmt
            .query_map(params![tire_id], map_assignment)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(assignments)
    }

    pub fn count_all(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM tire_assignment", [], |row| row.get(0))?;
        Ok(count)
    }

    pub(crate) fn insert_tx(conn: &Connection, a: &TireAssignment) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO tire_assignment (
                   assignment_id, tire_id, from_position_id, to_position_id, is_discard,
                   work_order_id, inspection_id, assignment_date, start_odometer, end_odometer,
                   removal_date, reason_for_removal, notes, status_before_id, created_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"#,
            params![
                a.assignment_id,
                a.tire_id,
                a.from_position_id,
                a.to_position_id,
                a.is_discard,
                a.work_order_id,
                a.inspection_id,
                a.assignment_date,
                a.start_odometer,
                a.end_odometer,
                a.removal_date,
                a.reason_for_removal,
                a.notes,
                a.status_before_id,
                a.created_at,
            ],
        )?;
        Ok(())
    }

    /// 改写可变字段（tire_id / from_position_id / status_before_id / created_at 不变）
    pub(crate) fn update_tx(conn: &Connection, a: &TireAssignment) -> RepositoryResult<()> {
        let affected = conn.execute(
            r#"UPDATE tire_assignment SET
                   to_position_id = ?2, is_discard = ?3, work_order_id = ?4, inspection_id = ?5,
                   assignment_date = ?6, start_odometer = ?7, end_odometer = ?8,
                   removal_date = ?9, reason_for_removal = ?10, notes = ?11
               WHERE assignment_id = ?1"#,
            params![
                a.assignment_id,
                a.to_position_id,
                a.is_discard,
                a.work_order_id,
                a.inspection_id,
                a.assignment_date,
                a.start_odometer,
                a.end_odometer,
                a.removal_date,
                a.reason_for_removal,
                a.notes,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "TireAssignment".to_string(),
                id: a.assignment_id.clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn delete_tx(conn: &Connection, assignment_id: &str) -> RepositoryResult<()> {
        let affected = conn.execute(
            "DELETE FROM tire_assignment WHERE assignment_id = ?1",
            params![assignment_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "TireAssignment".to_string(),
                id: assignment_id.to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn find_tx(conn: &Connection, assignment_id: &str) -> RepositoryResult<Option<TireAssignment>> {
        let sql = format!("SELECT {} FROM tire_assignment WHERE assignment_id = ?1", ASSIGNMENT_COLUMNS);
        let assignment = conn
            .query_row(&sql, params![assignment_id], map_assignment)
            .optional()?;
        Ok(assignment)
    }

    /// 轮胎最早的分配记录（巡检基准里程来源）
    pub(crate) fn find_first_for_tire_tx(
        conn: &Connection,
        tire_id: &str,
    ) -> RepositoryResult<Option<TireAssignment>> {
        let sql = format!(
            r#"SELECT {} FROM tire_assignment WHERE tire_id = ?1
               ORDER BY assignment_date ASC, created_at ASC LIMIT 1"#,
            ASSIGNMENT_COLUMNS
        );
        let assignment = conn.query_row(&sql, params![tire_id], map_assignment).optional()?;
        Ok(assignment)
    }

    /// 轮胎最近写入的分配记录（可排除指定记录，删除回滚时取“上一条”）
    ///
    /// 按写入顺序而非 assignment_date 排序：assignment_date 可由调用方回填，
    /// last_assignment 链只跟随写入顺序
    pub(crate) fn find_latest_for_tire_tx(
        conn: &Connection,
        tire_id: &str,
        exclude_assignment_id: Option<&str>,
    ) -> RepositoryResult<Option<TireAssignment>> {
        let sql = format!(
            r#"SELECT {} FROM tire_assignment
               WHERE tire_id = ?1 AND (?2 IS NULL OR assignment_id <> ?2)
               ORDER BY created_at DESC, rowid DESC LIMIT 1"#,
            ASSIGNMENT_COLUMNS
        );
        let assignment = conn
            .query_row(&sql, params![tire_id, exclude_assignment_id], map_assignment)
            .optional()?;
        Ok(assignment)
    }
}

fn map_assignment(row: &Row<'_>) -> rusqlite::Result<TireAssignment> {
    Ok(TireAssignment {
        assignment_id: row.get(0)?,
        tire_id: row.get(1)?,
        from_position_id: row.get(2)?,
        to_position_id: row.get(3)?,
        is_discard: row.get(4)?,
        work_order_id: row.get(5)?,
        inspection_id: row.get(6)?,
        assignment_date: row.get(7)?,
        start_odometer: row.get(8)?,
        end_odometer: row.get(9)?,
        removal_date: row.get(10)?,
        reason_for_removal: row.get(11)?,
        notes: row.get(12)?,
        status_before_id: row.get(13)?,
        created_at: row.get(14)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn setup() -> Arc<Mutex<Connection>> {
        let conn = crate::db::open_in_memory_with_schema().unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO vehicle (vehicle_id, license_plate, vehicle_type) VALUES ('V1', 'ABC-1', 'TRUCK');
            INSERT INTO tire_position (position_id, vehicle_id, position_name, axle_number, wheel_number)
                VALUES ('P1', 'V1', 'FL', 1, 1), ('P2', 'V1', 'FR', 1, 2);
            INSERT INTO tire_pattern VALUES ('PT', 'HX-1', 'Brand', 16.0, 3.0, 110.0);
            INSERT INTO tire_status VALUES ('S1', 'READY', '');
            INSERT INTO tire (tire_id, serial_number, pattern_id, status_id, purchase_date, purchase_cost)
                VALUES ('T1', 'SN-1', 'PT', 'S1', '2026-01-01', 400.0);
            INSERT INTO work_order (work_order_id, work_order_number, vehicle_id, shift_type, status, current_odometer, created_at)
                VALUES ('W1', 'WO-1', 'V1', 'INSTALLATION', 'OPENED', 50000, '2026-02-01 08:00:00');
            "#,
        )
        .unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn make_assignment(id: &str, day: u32, from: Option<&str>, to: Option<&str>) -> TireAssignment {
        let date = NaiveDate::from_ymd_opt(2026, 2, day).unwrap();
        TireAssignment {
            assignment_id: id.to_string(),
            tire_id: "T1".to_string(),
            from_position_id: from.map(str::to_string),
            to_position_id: to.map(str::to_string),
            is_discard: false,
            work_order_id: "W1".to_string(),
            inspection_id: None,
            assignment_date: date,
            start_odometer: 50000 + day as i64,
            end_odometer: None,
            removal_date: None,
            reason_for_removal: String::new(),
            notes: String::new(),
            status_before_id: Some("S1".to_string()),
            created_at: date.and_hms_opt(9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_first_and_latest_ordering() {
        let conn = setup();
        let guard = conn.lock().unwrap();
        AssignmentRepository::insert_tx(&guard, &make_assignment("A2", 5, Some("P1"), Some("P2"))).unwrap();
        AssignmentRepository::insert_tx(&guard, &make_assignment("A1", 2, None, Some("P1"))).unwrap();

        let first = AssignmentRepository::find_first_for_tire_tx(&guard, "T1").unwrap().unwrap();
        assert_eq!(first.assignment_id, "A1");
        let latest = AssignmentRepository::find_latest_for_tire_tx(&guard, "T1", None).unwrap().unwrap();
        assert_eq!(latest.assignment_id, "A2");
        let previous = AssignmentRepository::find_latest_for_tire_tx(&guard, "T1", Some("A2"))
            .unwrap()
            .unwrap();
        assert_eq!(previous.assignment_id, "A1");
    }

    #[test]
    fn test_latest_follows_write_order_not_assignment_date() {
        let conn = setup();
        let guard = conn.lock().unwrap();
        let mut mount = make_assignment("A1", 10, None, Some("P1"));
        mount.created_at = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap().and_hms_opt(9, 0, 0).unwrap();
        // 回填日期：业务日期早于装车，写入时间晚于装车
        let mut backdated = make_assignment("A2", 5, Some("P1"), Some("P2"));
        backdated.created_at = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap().and_hms_opt(9, 5, 0).unwrap();
        AssignmentRepository::insert_tx(&guard, &mount).unwrap();
        AssignmentRepository::insert_tx(&guard, &backdated).unwrap();

        let latest = AssignmentRepository::find_latest_for_tire_tx(&guard, "T1", None).unwrap().unwrap();
        assert_eq!(latest.assignment_id, "A2");
        let first = AssignmentRepository::find_first_for_tire_tx(&guard, "T1").unwrap().unwrap();
        assert_eq!(first.assignment_id, "A2");
    }

    #[test]
    fn test_discard_with_destination_rejected_by_check() {
        let conn = setup();
        let guard = conn.lock().unwrap();
        let mut bad = make_assignment("A1", 2, Some("P1"), Some("P2"));
        bad.is_discard = true;
        assert!(AssignmentRepository::insert_tx(&guard, &bad).is_err());
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let conn = setup();
        let guard = conn.lock().unwrap();
        let err = AssignmentRepository::delete_tx(&guard, "nope").unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }
}
