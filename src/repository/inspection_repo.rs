// ==========================================
// 车队轮胎管理系统 - 巡检数据仓储
// ==========================================
// 对齐: tire_inspection / tire_wear_type 表
// 说明: 观测字段只随 update 整体改写；position/work_order 由分配引擎重定向
// ==========================================

use crate::domain::inspection::{TireInspection, TireWearType, WearMetrics};
use crate::domain::types::RecommendedAction;
use crate::repository::error::{invalid_column, RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const INSPECTION_COLUMNS: &str = r#"inspection_id, tire_id, position_id, work_order_id, inspection_odometer,
    inspector_id, driver_id, tread_depth, pressure, wear_type_id, recommended_action,
    consumption_rate, remaining_traveling_distance, cost_per_mm_tread_depth,
    cost_per_1000_km_travel, fuel_consumption_increase, fuel_loss_caused,
    current_tire_value, balance_traveling_distance, inspected_at"#;

// ==========================================
// InspectionRepository - 巡检仓储
// ==========================================
pub struct InspectionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl InspectionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn find_by_id(&self, inspection_id: &str) -> RepositoryResult<Option<TireInspection>> {
        let conn = self.get_conn()?;
        Self::find_tx(&conn, inspection_id)
    }

    /// 轮胎全部巡检（里程倒序）
    pub fn list_by_tire(&self, tire_id: &str) -> RepositoryResult<Vec<TireInspection>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"SELECT {} FROM tire_inspection WHERE tire_id = ?1
               ORDER BY inspection_odometer DESC, inspected_at DESC"#,
            INSPECTION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let inspections = stmt
            .query_map(params![tire_id], map_inspection)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(inspections)
    }

    pub(crate) fn insert_tx(conn: &Connection, inspection: &TireInspection) -> RepositoryResult<()> {
        let m = &inspection.metrics;
        conn.execute(
            r#"INSERT INTO tire_inspection (
                   inspection_id, tire_id, position_id, work_order_id, inspection_odometer,
                   inspector_id, driver_id, tread_depth, pressure, wear_type_id, recommended_action,
                   consumption_rate, remaining_traveling_distance, cost_per_mm_tread_depth,
                   cost_per_1000_km_travel, fuel_consumption_increase, fuel_loss_caused,
                   current_tire_value, balance_traveling_distance, inspected_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)"#,
            params![
                inspection.inspection_id,
                inspection.tire_id,
                inspection.position_id,
                inspection.work_order_id,
                inspection.inspection_odometer,
                inspection.inspector_id,
                inspection.driver_id,
                inspection.tread_depth,
                inspection.pressure,
                inspection.wear_type_id,
                inspection.recommended_action.map(|a| a.to_db_str()),
                m.consumption_rate,
                m.remaining_traveling_distance,
                m.cost_per_mm_tread_depth,
                m.cost_per_1000_km_travel,
                m.fuel_consumption_increase,
                m.fuel_loss_caused,
                m.current_tire_value,
                m.balance_traveling_distance,
                inspection.inspected_at,
            ],
        )?;
        Ok(())
    }

    /// 整体改写巡检记录（tire_id / inspection_id 不变）
    pub(crate) fn update_tx(conn: &Connection, inspection: &TireInspection) -> RepositoryResult<()> {
        let m = &inspection.metrics;
        let affected = conn.execute(
            r#"UPDATE tire_inspection SET
                   position_id = ?2, work_order_id = ?3, inspection_odometer = ?4,
                   inspector_id = ?5, driver_id = ?6, tread_depth = ?7, pressure = ?8,
                   wear_type_id = ?9, recommended_action = ?10,
                   consumption_rate = ?11, remaining_traveling_distance = ?12,
                   cost_per_mm_tread_depth = ?13, cost_per_1000_km_travel = ?14,
                   fuel_consumption_increase = ?15, fuel_loss_caused = ?16,
                   current_tire_value = ?17, balance_traveling_distance = ?18
               WHERE inspection_id = ?1"#,
            params![
                inspection.inspection_id,
                inspection.position_id,
                inspection.work_order_id,
                inspection.inspection_odometer,
                inspection.inspector_id,
                inspection.driver_id,
                inspection.tread_depth,
                inspection.pressure,
                inspection.wear_type_id,
                inspection.recommended_action.map(|a| a.to_db_str()),
                m.consumption_rate,
                m.remaining_traveling_distance,
                m.cost_per_mm_tread_depth,
                m.cost_per_1000_km_travel,
                m.fuel_consumption_increase,
                m.fuel_loss_caused,
                m.current_tire_value,
                m.balance_traveling_distance,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "TireInspection".to_string(),
                id: inspection.inspection_id.clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn find_tx(conn: &Connection, inspection_id: &str) -> RepositoryResult<Option<TireInspection>> {
        let sql = format!("SELECT {} FROM tire_inspection WHERE inspection_id = ?1", INSPECTION_COLUMNS);
        let inspection = conn
            .query_row(&sql, params![inspection_id], map_inspection)
            .optional()?;
        Ok(inspection)
    }

    /// 轮胎最近一次巡检（按里程倒序，可排除指定记录）
    pub(crate) fn find_latest_for_tire_tx(
        conn: &Connection,
        tire_id: &str,
        exclude_inspection_id: Option<&str>,
    ) -> RepositoryResult<Option<TireInspection>> {
        let sql = format!(
            r#"SELECT {} FROM tire_inspection
               WHERE tire_id = ?1 AND (?2 IS NULL OR inspection_id <> ?2)
               ORDER BY inspection_odometer DESC, inspected_at DESC
               LIMIT 1"#,
            INSPECTION_COLUMNS
        );
        let inspection = conn
            .query_row(&sql, params![tire_id, exclude_inspection_id], map_inspection)
            .optional()?;
        Ok(inspection)
    }

    /// 把轮胎挂在 from 轮位上的巡检整体迁移到 to 轮位
    ///
    /// work_order_id 为 None 时保留原工单
    pub(crate) fn repoint_for_tire_tx(
        conn: &Connection,
        tire_id: &str,
        from_position_id: &str,
        to_position_id: &str,
        work_order_id: Option<&str>,
    ) -> RepositoryResult<usize> {
        let affected = conn.execute(
            r#"UPDATE tire_inspection
               SET position_id = ?3, work_order_id = COALESCE(?4, work_order_id)
               WHERE tire_id = ?1 AND position_id = ?2"#,
            params![tire_id, from_position_id, to_position_id, work_order_id],
        )?;
        Ok(affected)
    }

    /// 单条巡检重定向
    pub(crate) fn repoint_one_tx(
        conn: &Connection,
        inspection_id: &str,
        to_position_id: &str,
        work_order_id: &str,
    ) -> RepositoryResult<()> {
        conn.execute(
            "UPDATE tire_inspection SET position_id = ?2, work_order_id = ?3 WHERE inspection_id = ?1",
            params![inspection_id, to_position_id, work_order_id],
        )?;
        Ok(())
    }

    // ==========================================
    // 磨损分类
    // ==========================================

    pub fn create_wear_type(&self, wear_type: &TireWearType) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO tire_wear_type (wear_type_id, wear_name, description) VALUES (?1, ?2, ?3)",
            params![wear_type.wear_type_id, wear_type.wear_name, wear_type.description],
        )?;
        Ok(())
    }

    pub(crate) fn wear_type_exists_tx(conn: &Connection, wear_type_id: &str) -> RepositoryResult<bool> {
        let exists = conn
            .query_row(
                "SELECT 1 FROM tire_wear_type WHERE wear_type_id = ?1",
                params![wear_type_id],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(exists)
    }
}

fn map_inspection(row: &Row<'_>) -> rusqlite::Result<TireInspection> {
    let action_raw: Option<String> = row.get(10)?;
    let recommended_action = match action_raw {
        Some(raw) => Some(
            RecommendedAction::from_str(&raw).ok_or_else(|| invalid_column(10, "recommended_action", &raw))?,
        ),
        None => None,
    };

    Ok(TireInspection {
        inspection_id: row.get(0)?,
        tire_id: row.get(1)?,
        position_id: row.get(2)?,
        work_order_id: row.get(3)?,
        inspection_odometer: row.get(4)?,
        inspector_id: row.get(5)?,
        driver_id: row.get(6)?,
        tread_depth: row.get(7)?,
        pressure: row.get(8)?,
        wear_type_id: row.get(9)?,
        recommended_action,
        metrics: WearMetrics {
            consumption_rate: row.get(11)?,
            remaining_traveling_distance: row.get(12)?,
            cost_per_mm_tread_depth: row.get(13)?,
            cost_per_1000_km_travel: row.get(14)?,
            fuel_consumption_increase: row.get(15)?,
            fuel_loss_caused: row.get(16)?,
            current_tire_value: row.get(17)?,
            balance_traveling_distance: row.get(18)?,
        },
        inspected_at: row.get(19)?,
    })
}
