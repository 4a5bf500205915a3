//! 可观测性：tracing 输出到 stderr，不与 stdout 上的操作员交互混在一起
//!
//! 默认级别 warn；--verbose 或 RATPI_VERBOSE 打开 ratpi=debug；RUST_LOG 优先级最高。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// RATPI_VERBOSE 设为非空且非 0/false 时视为开启
pub fn verbose_from_env() -> bool {
    std::env::var("RATPI_VERBOSE")
        .map(|v| {
            let v = v.trim().to_ascii_lowercase();
            !v.is_empty() && v != "0" && v != "false"
        })
        .unwrap_or(false)
}

pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "warn,ratpi=debug"
    } else {
        "warn"
    }
}

pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose || verbose_from_env())));
    // 重复初始化（如测试中）忽略即可
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
