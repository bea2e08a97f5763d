//! 会话级错误类型
//!
//! 只有输入校验失败与取消会让 ReconSession 提前结束；工具级、主机级失败一律作为元数据记录在会话上，
//! 不会以 ReconError 的形式抛给调用方。

use std::time::Duration;

use thiserror::Error;

/// ReconSession 可能返回的错误（目标非法、未知工具、超时、中断、配置错误）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconError {
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// 用户指定的工具子集中含有未配置的工具名
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Session timed out after {0:?}")]
    SessionTimeout(Duration),

    #[error("Session interrupted")]
    Interrupted,

    #[error("Config error: {0}")]
    Config(String),
}

impl ReconError {
    /// 是否属于「运行被截断但结果仍可用」的一类
    pub fn is_partial(&self) -> bool {
        matches!(self, ReconError::SessionTimeout(_) | ReconError::Interrupted)
    }
}

impl From<config::ConfigError> for ReconError {
    fn from(err: config::ConfigError) -> Self {
        ReconError::Config(err.to_string())
    }
}
