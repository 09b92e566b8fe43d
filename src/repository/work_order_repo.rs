// ==========================================
// 车队轮胎管理系统 - 工单/人员数据仓储
// ==========================================
// 对齐: work_order / employee 表
// 约束: 每车最多一张 OPENED 工单由部分唯一索引兜底
// ==========================================

use crate::domain::types::{ShiftType, WorkOrderStatus};
use crate::domain::work_order::{Employee, WorkOrder};
use crate::repository::error::{invalid_column, RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const WORK_ORDER_COLUMNS: &str = r#"work_order_id, work_order_number, vehicle_id, assigned_to,
    shift_type, status, current_odometer, cost, created_at"#;

// ==========================================
// WorkOrderRepository - 工单仓储
// ==========================================
pub struct WorkOrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WorkOrderRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn find_by_id(&self, work_order_id: &str) -> RepositoryResult<Option<WorkOrder>> {
        let conn = self.get_conn()?;
        Self::find_tx(&conn, work_order_id)
    }

    pub fn find_opened_by_vehicle(&self, vehicle_id: &str) -> RepositoryResult<Option<WorkOrder>> {
        let conn = self.get_conn()?;
        Self::find_opened_by_vehicle_tx(&conn, vehicle_id)
    }

    pub fn list_by_vehicle(&self, vehicle_id: &str) -> RepositoryResult<Vec<WorkOrder>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM work_order WHERE vehicle_id = ?1 ORDER BY created_at DESC",
            WORK_ORDER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let orders = stmt
            .query_map(params![vehicle_id], map_work_order)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(orders)
    }

    pub(crate) fn insert_tx(conn: &Connection, order: &WorkOrder) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO work_order (
                   work_order_id, work_order_number, vehicle_id, assigned_to,
                   shift_type, status, current_odometer, cost, created_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
            params![
                order.work_order_id,
                order.work_order_number,
                order.vehicle_id,
                order.assigned_to,
                order.shift_type.to_db_str(),
                order.status.to_db_str(),
                order.current_odometer,
                order.cost,
                order.created_at,
            ],
        )?;
        Ok(())
    }

    pub(crate) fn find_tx(conn: &Connection, work_order_id: &str) -> RepositoryResult<Option<WorkOrder>> {
        let sql = format!("SELECT {} FROM work_order WHERE work_order_id = ?1", WORK_ORDER_COLUMNS);
        let order = conn
            .query_row(&sql, params![work_order_id], map_work_order)
            .optional()?;
        Ok(order)
    }

    pub(crate) fn find_opened_by_vehicle_tx(
        conn: &Connection,
        vehicle_id: &str,
    ) -> RepositoryResult<Option<WorkOrder>> {
        let sql = format!(
            "SELECT {} FROM work_order WHERE vehicle_id = ?1 AND status = 'OPENED' LIMIT 1",
            WORK_ORDER_COLUMNS
        );
        let order = conn
            .query_row(&sql, params![vehicle_id], map_work_order)
            .optional()?;
        Ok(order)
    }

    /// 统计车辆的 OPENED 工单数（可排除指定工单）
    pub(crate) fn count_opened_for_vehicle_tx(
        conn: &Connection,
        vehicle_id: &str,
        exclude_work_order_id: Option<&str>,
    ) -> RepositoryResult<i64> {
        let count = conn.query_row(
            r#"SELECT COUNT(*) FROM work_order
               WHERE vehicle_id = ?1 AND status = 'OPENED'
                 AND (?2 IS NULL OR work_order_id <> ?2)"#,
            params![vehicle_id, exclude_work_order_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub(crate) fn number_exists_tx(conn: &Connection, work_order_number: &str) -> RepositoryResult<bool> {
        let exists = conn
            .query_row(
                "SELECT 1 FROM work_order WHERE work_order_number = ?1 LIMIT 1",
                params![work_order_number],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(exists)
    }

    /// 更新工单状态，cost 为 None 时保持原值
    pub(crate) fn update_status_tx(
        conn: &Connection,
        work_order_id: &str,
        status: WorkOrderStatus,
        cost: Option<f64>,
    ) -> RepositoryResult<()> {
        let affected = conn.execute(
            "UPDATE work_order SET status = ?1, cost = COALESCE(?2, cost) WHERE work_order_id = ?3",
            params![status.to_db_str(), cost, work_order_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "WorkOrder".to_string(),
                id: work_order_id.to_string(),
            });
        }
        Ok(())
    }

    // ==========================================
    // 人员
    // ==========================================

    pub fn create_employee(&self, employee: &Employee) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO employee (employee_id, employment_code, first_name, last_name, position)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                employee.employee_id,
                employee.employment_code,
                employee.first_name,
                employee.last_name,
                employee.position,
            ],
        )?;
        Ok(())
    }

    pub fn find_employee(&self, employee_id: &str) -> RepositoryResult<Option<Employee>> {
        let conn = self.get_conn()?;
        Self::find_employee_tx(&conn, employee_id)
    }

    pub(crate) fn find_employee_tx(conn: &Connection, employee_id: &str) -> RepositoryResult<Option<Employee>> {
        let employee = conn
            .query_row(
                r#"SELECT employee_id, employment_code, first_name, last_name, position
                   FROM employee WHERE employee_id = ?1"#,
                params![employee_id],
                |row| {
                    Ok(Employee {
                        employee_id: row.get(0)?,
                        employment_code: row.get(1)?,
                        first_name: row.get(2)?,
                        last_name: row.get(3)?,
                        position: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(employee)
    }
}

fn map_work_order(row: &Row<'_>) -> rusqlite::Result<WorkOrder> {
    let status_raw: String = row.get(5)?;
    let status = WorkOrderStatus::from_str(&status_raw)
        .ok_or_else(|| invalid_column(5, "status", &status_raw))?;
    Ok(WorkOrder {
        work_order_id: row.get(0)?,
        work_order_number: row.get(1)?,
        vehicle_id: row.get(2)?,
        assigned_to: row.get(3)?,
        shift_type: ShiftType::from_str(&row.get::<_, String>(4)?),
        status,
        current_odometer: row.get(6)?,
        cost: row.get(7)?,
        created_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn setup() -> Arc<Mutex<Connection>> {
        let conn = crate::db::open_in_memory_with_schema().unwrap();
        conn.execute_batch(
            "INSERT INTO vehicle (vehicle_id, license_plate, vehicle_type) VALUES ('V1', 'ABC-1', 'TRUCK');",
        )
        .unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn make_order(id: &str, number: &str, status: WorkOrderStatus) -> WorkOrder {
        WorkOrder {
            work_order_id: id.to_string(),
            work_order_number: number.to_string(),
            vehicle_id: "V1".to_string(),
            assigned_to: None,
            shift_type: ShiftType::Installation,
            status,
            current_odometer: 1000,
            cost: 0.0,
            created_at: NaiveDate::from_ymd_opt(2026, 3, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_second_opened_order_rejected_by_index() {
        let conn = setup();
        let guard = conn.lock().unwrap();
        WorkOrderRepository::insert_tx(&guard, &make_order("W1", "WO-1", WorkOrderStatus::Opened)).unwrap();

        let err = WorkOrderRepository::insert_tx(&guard, &make_order("W2", "WO-2", WorkOrderStatus::Opened))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));

        // 非 OPENED 工单不受限制
        WorkOrderRepository::insert_tx(&guard, &make_order("W3", "WO-3", WorkOrderStatus::Closed)).unwrap();
        assert_eq!(
            WorkOrderRepository::count_opened_for_vehicle_tx(&guard, "V1", None).unwrap(),
            1
        );
        assert_eq!(
            WorkOrderRepository::count_opened_for_vehicle_tx(&guard, "V1", Some("W1")).unwrap(),
            0
        );
    }

    #[test]
    fn test_update_status_keeps_cost_when_absent() {
        let conn = setup();
        let repo = WorkOrderRepository::new(conn.clone());
        {
            let guard = conn.lock().unwrap();
            let mut order = make_order("W1", "WO-1", WorkOrderStatus::Opened);
            order.cost = 42.0;
            WorkOrderRepository::insert_tx(&guard, &order).unwrap();
            WorkOrderRepository::update_status_tx(&guard, "W1", WorkOrderStatus::Closed, None).unwrap();
        }
        let found = repo.find_by_id("W1").unwrap().unwrap();
        assert_eq!(found.status, WorkOrderStatus::Closed);
        assert_eq!(found.cost, 42.0);
        assert!(repo.find_opened_by_vehicle("V1").unwrap().is_none());
    }
}
