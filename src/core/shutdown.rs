//! 优雅关闭处理
//!
//! 监听 Ctrl+C / SIGTERM，把信号转成会话取消：在途工具进程被 kill，已合并的结果保留，
//! 报告以 interrupted 状态返回。

use std::sync::Arc;

use crate::core::session_supervisor::{CancelReason, SessionSupervisor};

/// 关闭原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl+C
    UserInitiated,
    /// SIGTERM 信号
    Signal,
}

/// 关闭信号管理器：把系统信号接到一个会话监管器上
#[derive(Clone, Debug)]
pub struct ShutdownManager {
    supervisor: SessionSupervisor,
}

impl ShutdownManager {
    pub fn new(supervisor: SessionSupervisor) -> Self {
        Self { supervisor }
    }

    /// 触发关闭
    pub fn shutdown(&self, reason: ShutdownReason) {
        tracing::info!(?reason, "shutdown requested, cancelling session");
        self.supervisor.cancel(CancelReason::Interrupted);
    }

    /// 是否已触发关闭
    pub fn is_shutdown(&self) -> bool {
        self.supervisor.is_cancelled()
    }

    /// 安装系统信号处理器 (Ctrl+C, SIGTERM)
    pub fn install_signal_handlers(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                tracing::info!("Received Ctrl+C, stopping reconnaissance...");
                manager.shutdown(ShutdownReason::UserInitiated);
            }
        });

        #[cfg(unix)]
        {
            let manager = Arc::clone(self);
            tokio::spawn(async move {
                use tokio::signal::unix::{signal, SignalKind};
                if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                    sigterm.recv().await;
                    tracing::info!("Received SIGTERM, stopping reconnaissance...");
                    manager.shutdown(ShutdownReason::Signal);
                }
            });
        }
    }
}
