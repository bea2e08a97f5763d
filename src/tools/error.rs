//! 发现工具错误
//!
//! 三类失败（不可用 / 超时 / 执行失败）都不致命；超时与中断携带已产生的部分发现。

use std::time::Duration;

use thiserror::Error;

use crate::recon::{RawFinding, ToolStatus};

#[derive(Error, Debug, Clone)]
pub enum ToolError {
    #[error("Tool unavailable: {0}")]
    Unavailable(String),

    #[error("Tool timed out after {after:?}")]
    Timeout {
        after: Duration,
        partial: Vec<RawFinding>,
    },

    #[error("Tool execution failed: {0}")]
    Execution(String),

    #[error("Tool interrupted")]
    Interrupted { partial: Vec<RawFinding> },
}

impl ToolError {
    /// 拆成运行状态与仍可合并的发现
    pub fn into_status(self) -> (ToolStatus, Vec<RawFinding>) {
        match self {
            ToolError::Unavailable(msg) => (ToolStatus::Unavailable(msg), Vec::new()),
            ToolError::Timeout { partial, .. } => (ToolStatus::TimedOut, partial),
            ToolError::Execution(msg) => (ToolStatus::Failed(msg), Vec::new()),
            ToolError::Interrupted { partial } => (ToolStatus::Interrupted, partial),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_keeps_partial() {
        let err = ToolError::Timeout {
            after: Duration::from_secs(1),
            partial: vec![RawFinding::new("foo.example.com", "amass", "foo.example.com")],
        };
        let (status, partial) = err.into_status();
        assert_eq!(status, ToolStatus::TimedOut);
        assert_eq!(partial.len(), 1);
    }

    #[test]
    fn test_execution_error_drops_findings() {
        let (status, partial) = ToolError::Execution("exit 1".into()).into_status();
        assert_eq!(status, ToolStatus::Failed("exit 1".into()));
        assert!(partial.is_empty());
    }
}
