// ==========================================
// 车队轮胎管理系统 - 轮胎数据仓储
// ==========================================
// 职责: tire / tire_pattern / tire_status 表的数据访问
// 并发控制: tire.revision 乐观锁，每次写入 +1
// ==========================================

use crate::domain::tire::{Tire, TirePattern, TireStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const TIRE_COLUMNS: &str = r#"tire_id, serial_number, pattern_id, status_id, purchase_date, purchase_cost,
    last_tread_depth, last_pressure, current_position_id, is_scrapped, last_assignment_id, revision"#;

/// 分配引擎对轮胎行的一次落位写入
#[derive(Debug, Clone)]
pub struct TirePlacementUpdate<'a> {
    pub current_position_id: Option<&'a str>,
    pub status_id: &'a str,
    pub is_scrapped: bool,
    pub last_assignment_id: Option<&'a str>,
}

// ==========================================
// TireRepository - 轮胎仓储
// ==========================================
pub struct TireRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TireRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 轮胎
    // ==========================================

    pub fn create(&self, tire: &Tire) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO tire (
                   tire_id, serial_number, pattern_id, status_id, purchase_date, purchase_cost,
                   last_tread_depth, last_pressure, current_position_id, is_scrapped,
                   last_assignment_id, revision
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"#,
            params![
                tire.tire_id,
                tire.serial_number,
                tire.pattern_id,
                tire.status_id,
                tire.purchase_date,
                tire.purchase_cost,
                tire.last_tread_depth,
                tire.last_pressure,
                tire.current_position_id,
                tire.is_scrapped,
                tire.last_assignment_id,
                tire.revision,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, tire_id: &str) -> RepositoryResult<Option<Tire>> {
        let conn = self.get_conn()?;
        Self::find_tx(&conn, tire_id)
    }

    pub fn find_by_serial(&self, serial_number: &str) -> RepositoryResult<Option<Tire>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM tire WHERE serial_number = ?1", TIRE_COLUMNS);
        let tire = conn.query_row(&sql, params![serial_number], map_tire).optional()?;
        Ok(tire)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<Tire>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM tire ORDER BY serial_number", TIRE_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let tires = stmt.query_map([], map_tire)?.collect::<Result<Vec<_>, _>>()?;
        Ok(tires)
    }

    /// 未装车且未报废的轮胎（可用于新胎装车）
    pub fn list_unmounted(&self) -> RepositoryResult<Vec<Tire>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM tire WHERE current_position_id IS NULL AND is_scrapped = 0 ORDER BY serial_number",
            TIRE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let tires = stmt.query_map([], map_tire)?.collect::<Result<Vec<_>, _>>()?;
        Ok(tires)
    }

    pub(crate) fn find_tx(conn: &Connection, tire_id: &str) -> RepositoryResult<Option<Tire>> {
        let sql = format!("SELECT {} FROM tire WHERE tire_id = ?1", TIRE_COLUMNS);
        let tire = conn.query_row(&sql, params![tire_id], map_tire).optional()?;
        Ok(tire)
    }

    /// 写入轮胎落位（带乐观锁）
    ///
    /// # 并发控制
    /// WHERE revision = expected_revision；未命中说明读取后已被其他事务修改
    pub(crate) fn update_placement_tx(
        conn: &Connection,
        tire_id: &str,
        expected_revision: i64,
        update: &TirePlacementUpdate<'_>,
    ) -> RepositoryResult<()> {
        let affected = conn.execute(
            r#"UPDATE tire
               SET current_position_id = ?1, status_id = ?2, is_scrapped = ?3,
                   last_assignment_id = ?4, revision = revision + 1
               WHERE tire_id = ?5 AND revision = ?6"#,
            params![
                update.current_position_id,
                update.status_id,
                update.is_scrapped,
                update.last_assignment_id,
                tire_id,
                expected_revision,
            ],
        )?;
        Self::check_revision(conn, tire_id, expected_revision, affected)
    }

    /// 刷新最近读数缓存（巡检写入时调用）
    pub(crate) fn update_cached_readings_tx(
        conn: &Connection,
        tire_id: &str,
        tread_depth: f64,
        pressure: f64,
    ) -> RepositoryResult<()> {
        let affected = conn.execute(
            r#"UPDATE tire SET last_tread_depth = ?1, last_pressure = ?2, revision = revision + 1
               WHERE tire_id = ?3"#,
            params![tread_depth, pressure, tire_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Tire".to_string(),
                id: tire_id.to_string(),
            });
        }
        Ok(())
    }

    fn check_revision(
        conn: &Connection,
        tire_id: &str,
        expected: i64,
        affected: usize,
    ) -> RepositoryResult<()> {
        if affected == 1 {
            return Ok(());
        }
        let actual: Option<i64> = conn
            .query_row(
                "SELECT revision FROM tire WHERE tire_id = ?1",
                params![tire_id],
                |row| row.get(0),
            )
            .optional()?;
        match actual {
            Some(actual) => Err(RepositoryError::OptimisticLockFailure {
                entity: "Tire".to_string(),
                id: tire_id.to_string(),
                expected,
                actual,
            }),
            None => Err(RepositoryError::NotFound {
                entity: "Tire".to_string(),
                id: tire_id.to_string(),
            }),
        }
    }

    // ==========================================
    // 花纹规格
    // ==========================================

    pub fn create_pattern(&self, pattern: &TirePattern) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO tire_pattern (
                   pattern_id, pattern_code, brand_name,
                   initial_tread_depth, discarding_tread_depth, ideal_tire_pressure
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                pattern.pattern_id,
                pattern.pattern_code,
                pattern.brand_name,
                pattern.initial_tread_depth,
                pattern.discarding_tread_depth,
                pattern.ideal_tire_pressure,
            ],
        )?;
        Ok(())
    }

    pub(crate) fn find_pattern_tx(
        conn: &Connection,
        pattern_id: &str,
    ) -> RepositoryResult<Option<TirePattern>> {
        let pattern = conn
            .query_row(
                r#"SELECT pattern_id, pattern_code, brand_name,
                          initial_tread_depth, discarding_tread_depth, ideal_tire_pressure
                   FROM tire_pattern WHERE pattern_id = ?1"#,
                params![pattern_id],
                |row| {
                    Ok(TirePattern {
                        pattern_id: row.get(0)?,
                        pattern_code: row.get(1)?,
                        brand_name: row.get(2)?,
                        initial_tread_depth: row.get(3)?,
                        discarding_tread_depth: row.get(4)?,
                        ideal_tire_pressure: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(pattern)
    }

    // ==========================================
    // 状态标签
    // ==========================================

    pub fn create_status(&self, status: &TireStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::insert_status_tx(&conn, status)
    }

    pub fn find_status(&self, status_id: &str) -> RepositoryResult<Option<TireStatus>> {
        let conn = self.get_conn()?;
        Self::find_status_tx(&conn, status_id)
    }

    pub fn find_status_by_name(&self, status_name: &str) -> RepositoryResult<Option<TireStatus>> {
        let conn = self.get_conn()?;
        Self::find_status_by_name_tx(&conn, status_name)
    }

    fn insert_status_tx(conn: &Connection, status: &TireStatus) -> RepositoryResult<()> {
        conn.execute(
            "INSERT INTO tire_status (status_id, status_name, description) VALUES (?1, ?2, ?3)",
            params![status.status_id, status.status_name, status.description],
        )?;
        Ok(())
    }

    pub(crate) fn find_status_tx(conn: &Connection, status_id: &str) -> RepositoryResult<Option<TireStatus>> {
        let status = conn
            .query_row(
                "SELECT status_id, status_name, description FROM tire_status WHERE status_id = ?1",
                params![status_id],
                map_status,
            )
            .optional()?;
        Ok(status)
    }

    pub(crate) fn find_status_by_name_tx(
        conn: &Connection,
        status_name: &str,
    ) -> RepositoryResult<Option<TireStatus>> {
        let status = conn
            .query_row(
                "SELECT status_id, status_name, description FROM tire_status WHERE status_name = ?1",
                params![status_name],
                map_status,
            )
            .optional()?;
        Ok(status)
    }

    /// 按名称取状态标签，不存在则创建
    pub(crate) fn get_or_create_status_tx(
        conn: &Connection,
        status_name: &str,
        description: &str,
    ) -> RepositoryResult<TireStatus> {
        if let Some(status) = Self::find_status_by_name_tx(conn, status_name)? {
            return Ok(status);
        }
        let status = TireStatus {
            status_id: uuid::Uuid::new_v4().to_string(),
            status_name: status_name.to_string(),
            description: description.to_string(),
        };
        Self::insert_status_tx(conn, &status)?;
        Ok(status)
    }
}

fn map_tire(row: &Row<'_>) -> rusqlite::Result<Tire> {
    Ok(Tire {
        tire_id: row.get(0)?,
        serial_number: row.get(1)?,
        pattern_id: row.get(2)?,
        status_id: row.get(3)?,
        purchase_date: row.get(4)?,
        purchase_cost: row.get(5)?,
        last_tread_depth: row.get(6)?,
        last_pressure: row.get(7)?,
        current_position_id: row.get(8)?,
        is_scrapped: row.get(9)?,
        last_assignment_id: row.get(10)?,
        revision: row.get(11)?,
    })
}

fn map_status(row: &Row<'_>) -> rusqlite::Result<TireStatus> {
    Ok(TireStatus {
        status_id: row.get(0)?,
        status_name: row.get(1)?,
        description: row.get(2)?,
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
            INSERT INTO tire_pattern VALUES ('P1', 'HX-1', 'Brand', 16.0, 3.0, 110.0);
            INSERT INTO tire_status VALUES ('S1', 'READY', '');
            "#,
        )
        .unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn make_tire(id: &str) -> Tire {
        Tire {
            tire_id: id.to_string(),
            serial_number: format!("SN-{}", id),
            pattern_id: "P1".to_string(),
            status_id: "S1".to_string(),
            purchase_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            purchase_cost: 390.0,
            last_tread_depth: None,
            last_pressure: None,
            current_position_id: None,
            is_scrapped: false,
            last_assignment_id: None,
            revision: 0,
        }
    }

    #[test]
    fn test_create_and_find() {
        let repo = TireRepository::new(setup());
        repo.create(&make_tire("T1")).unwrap();

        let found = repo.find_by_serial("SN-T1").unwrap().unwrap();
        assert_eq!(found.tire_id, "T1");
        assert_eq!(found.purchase_date, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
        assert_eq!(repo.list_unmounted().unwrap().len(), 1);
    }

    #[test]
    fn test_update_placement_stale_revision_rejected() {
        let conn = setup();
        let repo = TireRepository::new(conn.clone());
        repo.create(&make_tire("T1")).unwrap();

        let guard = conn.lock().unwrap();
        let update = TirePlacementUpdate {
            current_position_id: None,
            status_id: "S1",
            is_scrapped: false,
            last_assignment_id: None,
        };
        TireRepository::update_placement_tx(&guard, "T1", 0, &update).unwrap();

        // 第二次使用旧 revision 写入必须失败
        let err = TireRepository::update_placement_tx(&guard, "T1", 0, &update).unwrap_err();
        match err {
            RepositoryError::OptimisticLockFailure { expected, actual, .. } => {
                assert_eq!(expected, 0);
                assert_eq!(actual, 1);
            }
            other => panic!("Expected OptimisticLockFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_get_or_create_status_is_stable() {
        let conn = setup();
        let guard = conn.lock().unwrap();
        let first = TireRepository::get_or_create_status_tx(&guard, "MOUNTED", "已装车").unwrap();
        let second = TireRepository::get_or_create_status_tx(&guard, "MOUNTED", "已装车").unwrap();
        assert_eq!(first.status_id, second.status_id);

        let ready = TireRepository::get_or_create_status_tx(&guard, "READY", "").unwrap();
        assert_eq!(ready.status_id, "S1");
    }
}
