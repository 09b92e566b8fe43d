// ==========================================
// 车队轮胎管理系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::fleet_config_trait::FleetConfigReader;
use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![GLOBAL_SCOPE, key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            r#"INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
               ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')"#,
            params![GLOBAL_SCOPE, key, value],
        )?;
        tracing::info!(config_key = key, config_value = value, "配置已更新");
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取布尔配置；无法解析时回退默认值并告警
    fn get_bool_or_default(&self, key: &str, default: bool) -> Result<bool, Box<dyn Error>> {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };
        match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => {
                tracing::warn!(config_key = key, raw_value = %raw, "布尔配置格式错误，使用默认值");
                Ok(default)
            }
        }
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 从配置快照恢复配置
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> Result<usize, Box<dyn Error>> {
        let config_map: HashMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            count += tx.execute(
                r#"INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
                   ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3"#,
                params![GLOBAL_SCOPE, key, value],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }
}

// ==========================================
// FleetConfigReader Trait 实现
// ==========================================
impl FleetConfigReader for ConfigManager {
    // ===== 状态标签 =====

    fn get_ready_label(&self) -> Result<String, Box<dyn Error>> {
        self.get_config_or_default(config_keys::READY_LABEL, "READY")
    }

    fn get_mounted_label(&self) -> Result<String, Box<dyn Error>> {
        self.get_config_or_default(config_keys::MOUNTED_LABEL, "MOUNTED")
    }

    fn get_discarded_label(&self) -> Result<String, Box<dyn Error>> {
        self.get_config_or_default(config_keys::DISCARDED_LABEL, "DISCARDED")
    }

    // ===== 校验策略 =====

    fn get_require_vehicle_match(&self) -> Result<bool, Box<dyn Error>> {
        self.get_bool_or_default(config_keys::REQUIRE_VEHICLE_MATCH, false)
    }

    fn get_require_open_work_order(&self) -> Result<bool, Box<dyn Error>> {
        self.get_bool_or_default(config_keys::REQUIRE_OPEN_WORK_ORDER, true)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 轮胎状态标签
    pub const READY_LABEL: &str = "tire_status.ready_label";
    pub const MOUNTED_LABEL: &str = "tire_status.mounted_label";
    pub const DISCARDED_LABEL: &str = "tire_status.discarded_label";

    // 工单校验
    pub const REQUIRE_VEHICLE_MATCH: &str = "work_order.require_vehicle_match";

    // 巡检校验
    pub const REQUIRE_OPEN_WORK_ORDER: &str = "inspection.require_open_work_order";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> ConfigManager {
        let conn = crate::db::open_in_memory_with_schema().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_table_empty() {
        let config = setup();
        let policy = config.assignment_policy().unwrap();
        assert_eq!(policy.labels.ready, "READY");
        assert_eq!(policy.labels.mounted, "MOUNTED");
        assert_eq!(policy.labels.discarded, "DISCARDED");
        assert!(!policy.require_vehicle_match);
        assert!(config.inspection_policy().unwrap().require_open_work_order);
    }

    #[test]
    fn test_overrides_and_malformed_bool() {
        let config = setup();
        config.set_global_config_value(config_keys::MOUNTED_LABEL, "ON_VEHICLE").unwrap();
        config.set_global_config_value(config_keys::REQUIRE_VEHICLE_MATCH, "yes").unwrap();
        config.set_global_config_value(config_keys::REQUIRE_OPEN_WORK_ORDER, "maybe").unwrap();

        let policy = config.assignment_policy().unwrap();
        assert_eq!(policy.labels.mounted, "ON_VEHICLE");
        assert!(policy.require_vehicle_match);
        // 无法解析 → 默认 true
        assert!(config.get_require_open_work_order().unwrap());
    }

    #[test]
    fn test_snapshot_restore() {
        let config = setup();
        config.set_global_config_value(config_keys::READY_LABEL, "IN_STOCK").unwrap();
        let snapshot = config.get_config_snapshot().unwrap();

        config.set_global_config_value(config_keys::READY_LABEL, "CHANGED").unwrap();
        assert_eq!(config.restore_config_from_snapshot(&snapshot).unwrap(), 1);
        assert_eq!(config.get_ready_label().unwrap(), "IN_STOCK");
        assert_eq!(
            config.get_global_config_value(config_keys::READY_LABEL).unwrap().as_deref(),
            Some("IN_STOCK")
        );
        assert!(config
            .get_global_config_value(config_keys::DISCARDED_LABEL)
            .unwrap()
            .is_none());
    }
}
