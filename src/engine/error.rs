// ==========================================
// 车队轮胎管理系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约定: 所有校验在写入前完成；返回错误时事务整体回滚
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 前置条件违反的具体原因
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Precondition {
    // ===== 工单 =====
    #[error("工单 {work_order_id} 状态为 {status}，仅 OPENED 工单可挂接操作")]
    WorkOrderNotOpened { work_order_id: String, status: String },

    #[error("工单 {work_order_id} 不属于车辆 {vehicle_id}")]
    WorkOrderVehicleMismatch { work_order_id: String, vehicle_id: String },

    #[error("跨车换位缺少目标车辆 {vehicle_id} 的 OPENED 工单授权")]
    DestinationNotAuthorized { vehicle_id: String },

    #[error("工单编号 {work_order_number} 已存在")]
    WorkOrderNumberTaken { work_order_number: String },

    #[error("车辆 {vehicle_id} 已存在 OPENED 工单 {work_order_id}")]
    VehicleAlreadyHasOpenedWorkOrder { vehicle_id: String, work_order_id: String },

    // ===== 轮胎 =====
    #[error("轮胎 {tire_id} 已报废")]
    TireScrapped { tire_id: String },

    #[error("轮胎 {tire_id} 已装在轮位 {position_id}")]
    TireAlreadyMounted { tire_id: String, position_id: String },

    #[error("轮胎 {tire_id} 不在源轮位 {position_id}")]
    TireNotInSourcePosition { tire_id: String, position_id: String },

    // ===== 轮位 =====
    #[error("目标轮位 {position_id} 已被占用")]
    PositionOccupied { position_id: String },

    #[error("源轮位与目标轮位相同: {position_id}")]
    SamePosition { position_id: String },

    #[error("缺少目标轮位")]
    MissingDestination,

    #[error("缺少源轮位")]
    MissingSource,

    #[error("占位标记 {sentinel} 不能用于 {slot}")]
    InvalidSentinel { sentinel: String, slot: String },

    // ===== 报废 =====
    #[error("报废必须填写拆卸原因")]
    MissingRemovalReason,

    // ===== 巡检 =====
    #[error("巡检 {inspection_id} 属于轮胎 {inspection_tire_id}，与当前轮胎 {tire_id} 不符")]
    InspectionTireMismatch {
        inspection_id: String,
        inspection_tire_id: String,
        tire_id: String,
    },

    #[error("轮胎 {tire_id} 未装在车辆 {vehicle_id} 上")]
    TireNotOnVehicle { tire_id: String, vehicle_id: String },

    #[error("批量巡检中轮胎 {tire_id} 出现多条读数")]
    DuplicateReading { tire_id: String },

    #[error("回滚失败: 原轮位 {position_id} 已被其他轮胎占用")]
    RollbackSourceOccupied { position_id: String },
}

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("前置条件不满足: {0}")]
    PreconditionFailed(Precondition),

    #[error("非法的状态迁移: from={from} to={to}")]
    InvalidTransition { from: String, to: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("配置读取失败: {0}")]
    Config(String),
}

impl EngineError {
    pub(crate) fn not_found(entity: &str, id: &str) -> Self {
        EngineError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub(crate) fn transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        EngineError::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    /// 前置条件失败的具体原因（其他错误返回 None）
    pub fn precondition(&self) -> Option<&Precondition> {
        match self {
            EngineError::PreconditionFailed(p) => Some(p),
            _ => None,
        }
    }
}

impl From<Precondition> for EngineError {
    fn from(p: Precondition) -> Self {
        EngineError::PreconditionFailed(p)
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        EngineError::Repository(err.into())
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
