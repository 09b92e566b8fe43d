// ==========================================
// 车队轮胎管理系统 - 日志
// ==========================================
// 职责: 统一 tracing-subscriber 初始化（文本 / JSON 行 / 测试）
// 过滤: RUST_LOG，缺省 DEFAULT_FILTER
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 缺省过滤：引擎层记 debug（分配/巡检的每次状态转换），其余 info
pub const DEFAULT_FILTER: &str = "info,fleet_tires::engine=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// 文本格式日志
///
/// ```no_run
/// fleet_tires::logging::init();
/// tracing::info!(vehicle_id = "V1", "轮位概览");
/// ```
pub fn init() {
    fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// JSON 行格式，字段（tire_id / position_id / work_order_id）原样输出
pub fn init_json() {
    fmt()
        .json()
        .with_env_filter(env_filter())
        .with_current_span(false)
        .init();
}

/// 测试用：debug 级别写入测试捕获输出，可重复调用
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
