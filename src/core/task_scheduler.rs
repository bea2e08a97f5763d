//! 任务调度：发现工具池与 DNS 解析池
//!
//! 两个扇出点各用一个 Semaphore 限制并发：工具调用（每个 (工具, 目标) 一个许可）与单主机解析。

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// 任务类型
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TaskKind {
    /// 外部发现工具调用
    ToolInvocation,
    /// 单个主机名的解析
    Resolution,
}

/// 任务调度器
#[derive(Debug)]
pub struct TaskScheduler {
    /// 工具并发限制（默认 4）
    tool_semaphore: Arc<Semaphore>,
    /// 解析并发限制（默认 64）
    resolve_semaphore: Arc<Semaphore>,
    max_tools: usize,
    max_resolutions: usize,
}

impl TaskScheduler {
    pub fn new(max_concurrent_tools: usize, max_concurrent_resolutions: usize) -> Self {
        let max_tools = max_concurrent_tools.max(1);
        let max_resolutions = max_concurrent_resolutions.max(1);
        Self {
            tool_semaphore: Arc::new(Semaphore::new(max_tools)),
            resolve_semaphore: Arc::new(Semaphore::new(max_resolutions)),
            max_tools,
            max_resolutions,
        }
    }

    /// 获取工具执行许可；信号量被关闭时返回 None
    pub async fn acquire_tool(&self) -> Option<OwnedSemaphorePermit> {
        self.acquire(TaskKind::ToolInvocation).await
    }

    pub async fn acquire(&self, kind: TaskKind) -> Option<OwnedSemaphorePermit> {
        self.semaphore(kind).clone().acquire_owned().await.ok()
    }

    /// 解析信号量句柄，交给按主机并发的解析器共享
    pub fn resolve_semaphore(&self) -> Arc<Semaphore> {
        self.resolve_semaphore.clone()
    }

    pub fn limit(&self, kind: TaskKind) -> usize {
        match kind {
            TaskKind::ToolInvocation => self.max_tools,
            TaskKind::Resolution => self.max_resolutions,
        }
    }

    fn semaphore(&self, kind: TaskKind) -> &Arc<Semaphore> {
        match kind {
            TaskKind::ToolInvocation => &self.tool_semaphore,
            TaskKind::Resolution => &self.resolve_semaphore,
        }
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new(4, 64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tool_permits_are_bounded() {
        let scheduler = TaskScheduler::new(2, 8);
        let a = scheduler.acquire_tool().await.unwrap();
        let _b = scheduler.acquire_tool().await.unwrap();

        let third = tokio::time::timeout(std::time::Duration::from_millis(50), scheduler.acquire_tool()).await;
        assert!(third.is_err());

        drop(a);
        assert!(scheduler.acquire_tool().await.is_some());
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        let scheduler = TaskScheduler::new(0, 0);
        assert_eq!(scheduler.limit(TaskKind::ToolInvocation), 1);
        assert_eq!(scheduler.limit(TaskKind::Resolution), 1);
    }
}
