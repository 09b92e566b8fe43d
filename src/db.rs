// ==========================================
// 车队轮胎管理系统 - SQLite 连接初始化与建库
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 统一建库脚本，init_schema 幂等
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置（多连接并发写入时排队等待写锁）
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开内存数据库（单元测试用），已建好 schema
pub fn open_in_memory_with_schema() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化数据库 schema（幂等）
///
/// 约束说明：
/// - tire_position 的 (vehicle_id, axle_number, wheel_number) 唯一
/// - 每辆车最多一张 OPENED 工单（部分唯一索引）
/// - tire.current_position_id 与 tire_position.mounted_tire_id 互为反向引用，
///   一致性由分配引擎在事务内维护
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS employee (
    employee_id TEXT PRIMARY KEY,
    employment_code TEXT NOT NULL UNIQUE,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    position TEXT
);

CREATE TABLE IF NOT EXISTS tire_status (
    status_id TEXT PRIMARY KEY,
    status_name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS tire_pattern (
    pattern_id TEXT PRIMARY KEY,
    pattern_code TEXT NOT NULL UNIQUE,
    brand_name TEXT NOT NULL,
    initial_tread_depth REAL NOT NULL,
    discarding_tread_depth REAL NOT NULL,
    ideal_tire_pressure REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS tire_wear_type (
    wear_type_id TEXT PRIMARY KEY,
    wear_name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS vehicle (
    vehicle_id TEXT PRIMARY KEY,
    license_plate TEXT NOT NULL UNIQUE,
    make TEXT NOT NULL DEFAULT '',
    vehicle_type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'ACTIVE',
    tire_configuration TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS tire (
    tire_id TEXT PRIMARY KEY,
    serial_number TEXT NOT NULL UNIQUE,
    pattern_id TEXT NOT NULL REFERENCES tire_pattern(pattern_id),
    status_id TEXT NOT NULL REFERENCES tire_status(status_id),
    purchase_date TEXT NOT NULL,
    purchase_cost REAL NOT NULL,
    last_tread_depth REAL,
    last_pressure REAL,
    current_position_id TEXT REFERENCES tire_position(position_id) ON DELETE SET NULL,
    is_scrapped INTEGER NOT NULL DEFAULT 0,
    last_assignment_id TEXT REFERENCES tire_assignment(assignment_id) ON DELETE SET NULL,
    revision INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS tire_position (
    position_id TEXT PRIMARY KEY,
    vehicle_id TEXT NOT NULL REFERENCES vehicle(vehicle_id) ON DELETE CASCADE,
    position_name TEXT NOT NULL,
    axle_number INTEGER NOT NULL,
    wheel_number INTEGER NOT NULL,
    is_spare INTEGER NOT NULL DEFAULT 0,
    mounted_tire_id TEXT UNIQUE REFERENCES tire(tire_id) ON DELETE SET NULL,
    UNIQUE (vehicle_id, axle_number, wheel_number)
);

CREATE TABLE IF NOT EXISTS work_order (
    work_order_id TEXT PRIMARY KEY,
    work_order_number TEXT NOT NULL UNIQUE,
    vehicle_id TEXT NOT NULL REFERENCES vehicle(vehicle_id) ON DELETE CASCADE,
    assigned_to TEXT REFERENCES employee(employee_id),
    shift_type TEXT NOT NULL,
    status TEXT NOT NULL,
    current_odometer INTEGER NOT NULL,
    cost REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_work_order_one_opened_per_vehicle
    ON work_order(vehicle_id) WHERE status = 'OPENED';

CREATE TABLE IF NOT EXISTS tire_inspection (
    inspection_id TEXT PRIMARY KEY,
    tire_id TEXT NOT NULL REFERENCES tire(tire_id) ON DELETE CASCADE,
    position_id TEXT NOT NULL REFERENCES tire_position(position_id) ON DELETE CASCADE,
    work_order_id TEXT REFERENCES work_order(work_order_id) ON DELETE SET NULL,
    inspection_odometer INTEGER NOT NULL,
    inspector_id TEXT NOT NULL REFERENCES employee(employee_id),
    driver_id TEXT,
    tread_depth REAL NOT NULL,
    pressure REAL NOT NULL,
    wear_type_id TEXT NOT NULL REFERENCES tire_wear_type(wear_type_id),
    recommended_action TEXT,
    consumption_rate REAL NOT NULL DEFAULT 0,
    remaining_traveling_distance REAL NOT NULL DEFAULT 0,
    cost_per_mm_tread_depth REAL NOT NULL DEFAULT 0,
    cost_per_1000_km_travel REAL NOT NULL DEFAULT 0,
    fuel_consumption_increase REAL NOT NULL DEFAULT 0,
    fuel_loss_caused REAL NOT NULL DEFAULT 0,
    current_tire_value REAL NOT NULL DEFAULT 0,
    balance_traveling_distance REAL NOT NULL DEFAULT 0,
    inspected_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_inspection_tire_odometer
    ON tire_inspection(tire_id, inspection_odometer DESC);

CREATE TABLE IF NOT EXISTS tire_assignment (
    assignment_id TEXT PRIMARY KEY,
    tire_id TEXT NOT NULL REFERENCES tire(tire_id) ON DELETE CASCADE,
    from_position_id TEXT REFERENCES tire_position(position_id) ON DELETE CASCADE,
    to_position_id TEXT REFERENCES tire_position(position_id) ON DELETE CASCADE,
    is_discard INTEGER NOT NULL DEFAULT 0,
    work_order_id TEXT NOT NULL REFERENCES work_order(work_order_id) ON DELETE CASCADE,
    inspection_id TEXT REFERENCES tire_inspection(inspection_id) ON DELETE SET NULL,
    assignment_date TEXT NOT NULL,
    start_odometer INTEGER NOT NULL,
    end_odometer INTEGER,
    removal_date TEXT,
    reason_for_removal TEXT NOT NULL DEFAULT '',
    notes TEXT NOT NULL DEFAULT '',
    status_before_id TEXT REFERENCES tire_status(status_id),
    created_at TEXT NOT NULL,
    CHECK (is_discard = 0 OR to_position_id IS NULL),
    CHECK (from_position_id IS NOT NULL OR to_position_id IS NOT NULL)
);

CREATE INDEX IF NOT EXISTS idx_assignment_tire_date
    ON tire_assignment(tire_id, assignment_date, created_at);

CREATE TABLE IF NOT EXISTS action_log (
    action_id TEXT PRIMARY KEY,
    action_type TEXT NOT NULL,
    action_ts TEXT NOT NULL,
    actor TEXT NOT NULL,
    tire_id TEXT,
    vehicle_id TEXT,
    payload_json TEXT,
    detail TEXT
);

CREATE INDEX IF NOT EXISTS idx_action_log_tire ON action_log(tire_id, action_ts DESC);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = open_in_memory_with_schema().unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_schema_version_absent_on_empty_db() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }
}
