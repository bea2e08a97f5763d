//! 会话监管：生命周期、中断与截止时间
//!
//! 持有 CancellationToken；用户 Ctrl+C 或会话超时都会取消所有在途的工具与解析调用，
//! 第一次取消的原因被记录下来，用于决定报告的完成状态。

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// 取消原因
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelReason {
    /// 会话级超时
    Deadline(Duration),
    /// 用户中断（Ctrl+C / SIGTERM）
    Interrupted,
}

/// 会话级生命周期管理；Clone 共享同一令牌
#[derive(Clone, Debug)]
pub struct SessionSupervisor {
    cancel_token: CancellationToken,
    /// 会话正常结束后触发，用于停掉截止时间计时
    finished: CancellationToken,
    reason: Arc<Mutex<Option<CancelReason>>>,
}

impl SessionSupervisor {
    pub fn new() -> Self {
        Self {
            cancel_token: CancellationToken::new(),
            finished: CancellationToken::new(),
            reason: Arc::new(Mutex::new(None)),
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// 触发取消；只保留第一次的原因
    pub fn cancel(&self, reason: CancelReason) {
        if let Ok(mut slot) = self.reason.lock() {
            if slot.is_none() {
                *slot = Some(reason);
            }
        }
        self.cancel_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    pub fn reason(&self) -> Option<CancelReason> {
        self.reason.lock().ok().and_then(|slot| *slot)
    }

    /// 标记会话结束（不是取消）
    pub fn finish(&self) {
        self.finished.cancel();
    }

    /// 启动截止时间计时；会话先结束或先被取消时计时任务随之退出
    pub fn arm_deadline(&self, timeout: Duration) {
        let supervisor = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    tracing::warn!(timeout_secs = timeout.as_secs(), "session deadline reached, cancelling");
                    supervisor.cancel(CancelReason::Deadline(timeout));
                }
                _ = supervisor.cancel_token.cancelled() => {}
                _ = supervisor.finished.cancelled() => {}
            }
        });
    }

    /// 创建子 token（用于单个任务）
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }
}

impl Default for SessionSupervisor {
    fn default() -> Self {
        Self::new()
    }
}
