// ==========================================
// 车队轮胎管理系统 - 操作日志数据仓储
// ==========================================
// 对齐: action_log 表
// 红线: 所有写入必须记录（与业务写入同一事务）
// ==========================================

mod core;
mod queries;

#[cfg(test)]
mod tests;

pub use core::ActionLogRepository;
