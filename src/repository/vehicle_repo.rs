// ==========================================
// 车队轮胎管理系统 - 车辆/轮位数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: `*_tx` 系列函数接收 &Connection，供引擎在同一事务内组合调用
// ==========================================

use crate::domain::types::{VehicleStatus, VehicleType};
use crate::domain::vehicle::{TirePosition, Vehicle};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const POSITION_COLUMNS: &str = "position_id, vehicle_id, position_name, axle_number, wheel_number, is_spare, mounted_tire_id";

// ==========================================
// VehicleRepository - 车辆与轮位仓储
// ==========================================
pub struct VehicleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl VehicleRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 车辆
    // ==========================================

    /// 新增车辆（可同时写入其轮位）
    pub fn create_with_positions(
        &self,
        vehicle: &Vehicle,
        positions: &[TirePosition],
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        Self::insert_vehicle_tx(&tx, vehicle)?;
        for position in positions {
            Self::insert_position_tx(&tx, position)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn find_by_id(&self, vehicle_id: &str) -> RepositoryResult<Option<Vehicle>> {
        let conn = self.get_conn()?;
        Self::find_vehicle_tx(&conn, vehicle_id)
    }

    pub fn find_by_plate(&self, license_plate: &str) -> RepositoryResult<Option<Vehicle>> {
        let conn = self.get_conn()?;
        let vehicle = conn
            .query_row(
                r#"SELECT vehicle_id, license_plate, make, vehicle_type, status, tire_configuration
                   FROM vehicle WHERE license_plate = ?1"#,
                params![license_plate],
                map_vehicle,
            )
            .optional()?;
        Ok(vehicle)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<Vehicle>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT vehicle_id, license_plate, make, vehicle_type, status, tire_configuration
               FROM vehicle ORDER BY license_plate ASC"#,
        )?;
        let vehicles = stmt
            .query_map([], map_vehicle)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(vehicles)
    }

    /// 删除车辆（级联删除轮位；原装在其上的轮胎 current_position_id 被置空）
    pub fn delete(&self, vehicle_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM vehicle WHERE vehicle_id = ?1", params![vehicle_id])?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Vehicle".to_string(),
                id: vehicle_id.to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn insert_vehicle_tx(conn: &Connection, vehicle: &Vehicle) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO vehicle (vehicle_id, license_plate, make, vehicle_type, status, tire_configuration)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                vehicle.vehicle_id,
                vehicle.license_plate,
                vehicle.make,
                vehicle.vehicle_type.to_db_str(),
                vehicle.status.to_db_str(),
                vehicle.tire_configuration,
            ],
        )?;
        Ok(())
    }

    pub(crate) fn find_vehicle_tx(conn: &Connection, vehicle_id: &str) -> RepositoryResult<Option<Vehicle>> {
        let vehicle = conn
            .query_row(
                r#"SELECT vehicle_id, license_plate, make, vehicle_type, status, tire_configuration
                   FROM vehicle WHERE vehicle_id = ?1"#,
                params![vehicle_id],
                map_vehicle,
            )
            .optional()?;
        Ok(vehicle)
    }

    // ==========================================
    // 轮位
    // ==========================================

    pub fn add_position(&self, position: &TirePosition) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::insert_position_tx(&conn, position)
    }

    pub fn find_position(&self, position_id: &str) -> RepositoryResult<Option<TirePosition>> {
        let conn = self.get_conn()?;
        Self::find_position_tx(&conn, position_id)
    }

    pub fn list_positions(&self, vehicle_id: &str) -> RepositoryResult<Vec<TirePosition>> {
        let conn = self.get_conn()?;
        Self::list_positions_tx(&conn, vehicle_id)
    }

    /// 查询全部轮位（一致性巡检用）
    pub fn list_all_positions(&self) -> RepositoryResult<Vec<TirePosition>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM tire_position ORDER BY vehicle_id, axle_number, wheel_number",
            POSITION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let positions = stmt
            .query_map([], map_position)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(positions)
    }

    pub(crate) fn insert_position_tx(conn: &Connection, position: &TirePosition) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO tire_position (
                   position_id, vehicle_id, position_name, axle_number, wheel_number, is_spare, mounted_tire_id
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            params![
                position.position_id,
                position.vehicle_id,
                position.position_name,
                position.axle_number,
                position.wheel_number,
                position.is_spare,
                position.mounted_tire_id,
            ],
        )?;
        Ok(())
    }

    pub(crate) fn find_position_tx(
        conn: &Connection,
        position_id: &str,
    ) -> RepositoryResult<Option<TirePosition>> {
        let sql = format!("SELECT {} FROM tire_position WHERE position_id = ?1", POSITION_COLUMNS);
        let position = conn
            .query_row(&sql, params![position_id], map_position)
            .optional()?;
        Ok(position)
    }

    pub(crate) fn list_positions_tx(
        conn: &Connection,
        vehicle_id: &str,
    ) -> RepositoryResult<Vec<TirePosition>> {
        let sql = format!(
            "SELECT {} FROM tire_position WHERE vehicle_id = ?1 ORDER BY axle_number, wheel_number",
            POSITION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let positions = stmt
            .query_map(params![vehicle_id], map_position)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(positions)
    }

    /// 占位（CAS）：仅当轮位为空时写入 mounted_tire_id
    ///
    /// # 返回
    /// - Ok(true): 写入成功
    /// - Ok(false): 轮位已被占用（并发写入者先一步）
    pub(crate) fn occupy_if_empty_tx(
        conn: &Connection,
        position_id: &str,
        tire_id: &str,
    ) -> RepositoryResult<bool> {
        let affected = conn.execute(
            "UPDATE tire_position SET mounted_tire_id = ?1 WHERE position_id = ?2 AND mounted_tire_id IS NULL",
            params![tire_id, position_id],
        )?;
        Ok(affected == 1)
    }

    /// 腾位（CAS）：仅当轮位当前装着指定轮胎时清空
    pub(crate) fn vacate_if_holds_tx(
        conn: &Connection,
        position_id: &str,
        tire_id: &str,
    ) -> RepositoryResult<bool> {
        let affected = conn.execute(
            "UPDATE tire_position SET mounted_tire_id = NULL WHERE position_id = ?1 AND mounted_tire_id = ?2",
            params![position_id, tire_id],
        )?;
        Ok(affected == 1)
    }
}

fn map_vehicle(row: &Row<'_>) -> rusqlite::Result<Vehicle> {
    Ok(Vehicle {
        vehicle_id: row.get(0)?,
        license_plate: row.get(1)?,
        make: row.get(2)?,
        vehicle_type: VehicleType::from_str(&row.get::<_, String>(3)?),
        status: VehicleStatus::from_str(&row.get::<_, String>(4)?),
        tire_configuration: row.get(5)?,
    })
}

fn map_position(row: &Row<'_>) -> rusqlite::Result<TirePosition> {
    Ok(TirePosition {
        position_id: row.get(0)?,
        vehicle_id: row.get(1)?,
        position_name: row.get(2)?,
        axle_number: row.get(3)?,
        wheel_number: row.get(4)?,
        is_spare: row.get(5)?,
        mounted_tire_id: row.get(6)?,
    })
}
