//! 可观测性：tracing 订阅器
//!
//! 日志写到 stderr（stdout 留给 JSON 报告）；默认 info，可通过 RUST_LOG 覆盖。

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// verbose 时默认级别提升到 debug
pub fn init_with_level(default_level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
