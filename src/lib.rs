//! DSInt - 子域名侦察编排与聚合核心
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误、会话监管、任务调度、优雅关闭、组件构建
//! - **dns**: 批量解析器（massdns / hickory）
//! - **observability**: 日志初始化
//! - **recon**: 目标与范围、聚合、验证、递归、IP 映射、会话与报告
//! - **tools**: 发现工具适配器、输出解析、并发执行

pub mod config;
pub mod core;
pub mod dns;
pub mod observability;
pub mod recon;
pub mod tools;

pub use crate::core::{ReconBuilder, ReconError};
pub use crate::recon::{ReconReport, ReconSession, SessionOptions, Target};
