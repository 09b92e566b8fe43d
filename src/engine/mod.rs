// ==========================================
// 车队轮胎管理系统 - 引擎层
// ==========================================
// 职责: 分类、工单闸门、磨损指标、状态迁移
// 红线: Engine 不拼 SQL，数据访问全部经 Repository
// ==========================================

pub mod assignment_engine;
pub mod classify;
pub mod error;
pub mod inspection_recorder;
pub mod registry_audit;
pub mod wear_metrics;
pub mod work_order_gate;

// 重导出核心引擎
pub use assignment_engine::AssignmentEngine;
pub use classify::{classify, AssignmentRequest, ClassifiedOperation, PositionRef};
pub use error::{EngineError, EngineResult, Precondition};
pub use inspection_recorder::{
    BulkInspectionRequest, BulkInspectionResult, InspectionRecorder, InspectionRequest, TireReading,
};
pub use registry_audit::{Inconsistency, RegistryAudit};
pub use wear_metrics::{WearBaseline, WearInputs};
pub use work_order_gate::{OpenWorkOrderRequest, WorkOrderGate};

use crate::repository::RepositoryError;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::{Mutex, MutexGuard};

/// 获取共享连接
///
/// 注意: ConfigManager 与引擎共用同一连接，持锁期间不得再读取配置（会死锁）
pub(crate) fn lock_conn(conn: &Mutex<Connection>) -> EngineResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| EngineError::Repository(RepositoryError::LockError(e.to_string())))
}

/// 以 IMMEDIATE 方式开启事务（开始即持有写锁，写写并发在此排队）
pub(crate) fn begin_immediate(conn: &mut Connection) -> EngineResult<Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| EngineError::Repository(RepositoryError::DatabaseTransactionError(e.to_string())))
}
