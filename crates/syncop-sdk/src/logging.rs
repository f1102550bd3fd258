//! 日志初始化
//!
//! 库代码只使用 `tracing` 宏，由应用决定是否安装 subscriber。
//! 这里提供一个默认实现：`tracing-subscriber` fmt 输出 + `EnvFilter`，
//! 并通过 `tracing-log` 把 `log` crate 的记录转发进来。

use tracing_subscriber::EnvFilter;

/// 安装全局 subscriber
///
/// - `default_directive`: `RUST_LOG` 未设置时使用的过滤指令（如 `"info"`、`"syncop_driver=debug"`）
///
/// 返回是否由本次调用完成安装（已有全局 subscriber 时返回 `false`）。
pub fn init(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return false;
    }
    // 已有 log 实现时忽略
    let _ = tracing_log::LogTracer::init_with_filter(log::LevelFilter::Trace);
    true
}

/// 初始化日志
///
/// ```no_run
/// syncop_sdk::init_logger!();
/// // 或指定默认过滤指令
/// syncop_sdk::init_logger!("syncop_driver=debug,info");
/// ```
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::logging::init("info")
    };
    ($directive:expr) => {
        $crate::logging::init($directive)
    };
}
