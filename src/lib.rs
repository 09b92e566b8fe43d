// ==========================================
// 车队轮胎管理系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 轮胎分配引擎 + 巡检记录（单库事务内维护轮胎/轮位一致性）
// ==========================================

// 车辆/轮位/轮胎/工单/巡检/分配记录
pub mod domain;
// SQLite 读写（每张表一个仓储，`*_tx` 供事务内调用）
pub mod repository;
// 分配引擎、工单闸门、巡检记录器、一致性巡查
pub mod engine;
// config_kv 策略读取
pub mod config;
pub mod db;
pub mod logging;
// 表单校验 + 错误转换
pub mod api;
// AppState 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{OperationKind, ShiftType, TireLifecycle, WorkOrderStatus};

// 领域实体
pub use domain::{
    ActionLog, ActionType, Tire, TireAssignment, TireInspection, TirePosition, Vehicle, WorkOrder,
};

// 引擎
pub use engine::{AssignmentEngine, InspectionRecorder, RegistryAudit, WorkOrderGate};

// API
pub use api::{AssignmentApi, InspectionApi, WorkOrderApi};

// ==========================================
// 常量定义
// ==========================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "车队轮胎管理系统";
