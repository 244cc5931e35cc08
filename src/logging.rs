//! 日志初始化

use tracing_subscriber::EnvFilter;

/// 初始化全局日志订阅者。`RUST_LOG` 优先，否则按 verbose 选择 debug/info。
/// 重复调用（例如测试中）会被静默忽略。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("astroinsight_rs={},warn", default_level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
