// ==========================================
// 车队轮胎管理系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{AssignmentApi, InspectionApi, WorkOrderApi};
use crate::config::{ConfigManager, FleetConfigReader};
use crate::engine::{AssignmentEngine, InspectionRecorder, RegistryAudit, WorkOrderGate};
use crate::repository::{
    ActionLogRepository, AssignmentRepository, InspectionRepository, TireRepository, VehicleRepository,
    WorkOrderRepository,
};

/// 应用状态
///
/// 所有组件共享同一个 SQLite 连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    pub assignment_api: Arc<AssignmentApi>,
    pub inspection_api: Arc<InspectionApi>,
    pub work_order_api: Arc<WorkOrderApi>,

    // 引擎（测试与批处理可直接调用，错误保留结构化原因）
    pub assignment_engine: Arc<AssignmentEngine>,
    pub inspection_recorder: Arc<InspectionRecorder>,
    pub work_order_gate: Arc<WorkOrderGate>,
    pub registry_audit: Arc<RegistryAudit>,

    pub config_manager: Arc<ConfigManager>,

    // 仓储（登记/查询用）
    pub vehicle_repo: Arc<VehicleRepository>,
    pub tire_repo: Arc<TireRepository>,
    pub work_order_repo: Arc<WorkOrderRepository>,
    pub inspection_repo: Arc<InspectionRepository>,
    pub assignment_repo: Arc<AssignmentRepository>,
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// 打开数据库（应用统一 PRAGMA）并幂等建库
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = crate::db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        crate::db::init_schema(&conn).map_err(|e| format!("数据库初始化失败: {}", e))?;

        Self::from_connection(db_path, Arc::new(Mutex::new(conn)))
    }

    /// 使用已有连接装配（测试与内存库）
    pub fn from_connection(db_path: String, conn: Arc<Mutex<Connection>>) -> Result<Self, String> {
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let config: Arc<dyn FleetConfigReader> = config_manager.clone();

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let vehicle_repo = Arc::new(VehicleRepository::new(conn.clone()));
        let tire_repo = Arc::new(TireRepository::new(conn.clone()));
        let work_order_repo = Arc::new(WorkOrderRepository::new(conn.clone()));
        let inspection_repo = Arc::new(InspectionRepository::new(conn.clone()));
        let assignment_repo = Arc::new(AssignmentRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let assignment_engine = Arc::new(AssignmentEngine::new(conn.clone(), config.clone()));
        let inspection_recorder = Arc::new(InspectionRecorder::new(conn.clone(), config));
        let work_order_gate = Arc::new(WorkOrderGate::new(conn.clone()));
        let registry_audit = Arc::new(RegistryAudit::new(conn));

        // ==========================================
        // 初始化API层
        // ==========================================
        let assignment_api = Arc::new(AssignmentApi::new(assignment_engine.clone(), assignment_repo.clone()));
        let inspection_api = Arc::new(InspectionApi::new(inspection_recorder.clone(), inspection_repo.clone()));
        let work_order_api = Arc::new(WorkOrderApi::new(work_order_gate.clone(), work_order_repo.clone()));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            assignment_api,
            inspection_api,
            work_order_api,
            assignment_engine,
            inspection_recorder,
            work_order_gate,
            registry_audit,
            config_manager,
            vehicle_repo,
            tire_repo,
            work_order_repo,
            inspection_repo,
            assignment_repo,
            action_log_repo,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 FLEET_TIRES_DB_PATH → `<data_dir>/fleet-tire-tracker/fleet.db` → 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("FLEET_TIRES_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./fleet.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("fleet-tire-tracker");
        // 确保目录存在
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("fleet.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_from_in_memory_connection() {
        let conn = crate::db::open_in_memory_with_schema().unwrap();
        let state = AppState::from_connection(":memory:".to_string(), Arc::new(Mutex::new(conn))).unwrap();
        assert!(state.registry_audit.find_inconsistencies().unwrap().is_empty());
        assert!(state.tire_repo.list_all().unwrap().is_empty());
    }
}
