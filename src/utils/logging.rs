//! 日志工具模块
//!
//! 提供日志初始化和格式化输出的辅助函数

use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化全局日志
///
/// 默认 info 级别，可通过 RUST_LOG 环境变量覆盖
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `start_year`: 回填起始年份
/// - `end_year`: 回填结束年份
/// - `delay_ms`: 外部调用间隔（毫秒）
pub fn log_startup(start_year: i32, end_year: i32, delay_ms: u64) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 题库回填模式");
    info!("📅 年份范围: {} - {}", start_year, end_year);
    info!("⏱️ 外部调用间隔: {} 毫秒", delay_ms);
    info!("{}", "=".repeat(60));
}
