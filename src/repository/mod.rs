// ==========================================
// 车队轮胎管理系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约定: `*_tx(conn: &Connection, ..)` 在调用方事务内执行，不自行加锁
// ==========================================

pub mod action_log_repo;
pub mod assignment_repo;
pub mod error;
pub mod inspection_repo;
pub mod tire_repo;
pub mod vehicle_repo;
pub mod work_order_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use assignment_repo::AssignmentRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use inspection_repo::InspectionRepository;
pub use tire_repo::{TirePlacementUpdate, TireRepository};
pub use vehicle_repo::VehicleRepository;
pub use work_order_repo::WorkOrderRepository;
