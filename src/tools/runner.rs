//! 工具执行器
//!
//! 持有 ToolRegistry 与 TaskScheduler，对一轮的每个 (工具, 目标) 组合并发调用 discover：
//! 受工具信号量限制，外层再加一层超时兜底，任何单个失败都只影响自己的 ToolRunReport。
//! 每次调用输出结构化审计日志（JSON）。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::core::TaskScheduler;
use crate::recon::{RawFinding, ToolRunReport, ToolStatus};
use crate::tools::{DiscoveryContext, ToolAdapter, ToolError, ToolRegistry};

/// 适配器自身没有遵守预算时，外层超时在预算之上再等待的时间
const TIMEOUT_GRACE: Duration = Duration::from_secs(2);
/// 取消后等待适配器交回部分结果的时间
const CANCEL_GRACE: Duration = Duration::from_secs(1);

/// 一次 (工具, 目标) 调用的结果：报告 + 待合并的发现（超时 / 中断时为部分发现）
#[derive(Debug, Clone)]
pub struct ToolRun {
    pub report: ToolRunReport,
    pub findings: Vec<RawFinding>,
}

/// 工具执行器：并发扇出、超时、失败隔离
#[derive(Clone)]
pub struct ToolRunner {
    registry: ToolRegistry,
    scheduler: Arc<TaskScheduler>,
    wordlist: Option<PathBuf>,
}

impl ToolRunner {
    pub fn new(registry: ToolRegistry, scheduler: Arc<TaskScheduler>) -> Self {
        Self {
            registry,
            scheduler,
            wordlist: None,
        }
    }

    /// 字典路径原样转交给适配器
    pub fn with_wordlist(mut self, wordlist: Option<PathBuf>) -> Self {
        self.wordlist = wordlist;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// 对所有 (tool, target) 组合执行一轮发现，等待全部结束或超时。
    /// 返回顺序与 tools × targets 的遍历顺序一致。
    pub async fn run(
        &self,
        tools: &[String],
        targets: &[String],
        depth: u32,
        cancel: &CancellationToken,
    ) -> Vec<ToolRun> {
        let mut handles = Vec::with_capacity(tools.len() * targets.len());
        for target in targets {
            for tool_name in tools {
                let Some(adapter) = self.registry.get(tool_name) else {
                    handles.push((tool_name.clone(), target.clone(), None));
                    continue;
                };
                let scheduler = self.scheduler.clone();
                let ctx = DiscoveryContext {
                    timeout: adapter.default_timeout(),
                    wordlist: self.wordlist.clone(),
                    cancel: cancel.child_token(),
                };
                let target_owned = target.clone();
                let handle = tokio::spawn(async move {
                    invoke(adapter, scheduler, target_owned, depth, ctx).await
                });
                handles.push((tool_name.clone(), target.clone(), Some(handle)));
            }
        }

        let mut runs = Vec::with_capacity(handles.len());
        for (tool, target, handle) in handles {
            let run = match handle {
                None => unavailable_run(&tool, &target, depth),
                Some(handle) => match handle.await {
                    Ok(run) => run,
                    Err(e) => {
                        tracing::error!(tool = %tool, target = %target, error = %e, "tool task aborted");
                        ToolRun {
                            report: ToolRunReport {
                                tool,
                                target,
                                depth,
                                status: ToolStatus::Failed(format!("task aborted: {e}")),
                                findings: 0,
                                duration_ms: 0,
                            },
                            findings: Vec::new(),
                        }
                    }
                },
            };
            runs.push(run);
        }
        runs
    }
}

fn unavailable_run(tool: &str, target: &str, depth: u32) -> ToolRun {
    ToolRun {
        report: ToolRunReport {
            tool: tool.to_string(),
            target: target.to_string(),
            depth,
            status: ToolStatus::Unavailable(format!("{tool} is not registered")),
            findings: 0,
            duration_ms: 0,
        },
        findings: Vec::new(),
    }
}

async fn invoke(
    adapter: Arc<dyn ToolAdapter>,
    scheduler: Arc<TaskScheduler>,
    target: String,
    depth: u32,
    ctx: DiscoveryContext,
) -> ToolRun {
    let tool = adapter.name().to_string();

    let permit = tokio::select! {
        permit = scheduler.acquire_tool() => permit,
        _ = ctx.cancel.cancelled() => None,
    };

    let start = Instant::now();
    let (status, findings) = if permit.is_none() {
        (ToolStatus::Interrupted, Vec::new())
    } else {
        let budget = ctx.timeout;
        let fut = adapter.discover(&target, &ctx);
        tokio::pin!(fut);
        let first = tokio::select! {
            result = tokio::time::timeout(budget + TIMEOUT_GRACE, &mut fut) => Some(result),
            _ = ctx.cancel.cancelled() => None,
        };
        match first {
            Some(Ok(outcome)) => settle(outcome),
            Some(Err(_)) => (ToolStatus::TimedOut, Vec::new()),
            // 已取消：子进程在适配器内被 kill，给它一点时间交回部分输出
            None => match tokio::time::timeout(CANCEL_GRACE, &mut fut).await {
                Ok(Ok(findings)) => (ToolStatus::Interrupted, findings),
                Ok(Err(e)) => (ToolStatus::Interrupted, e.into_status().1),
                Err(_) => (ToolStatus::Interrupted, Vec::new()),
            },
        }
    };
    drop(permit);

    let duration_ms = start.elapsed().as_millis() as u64;
    let audit = serde_json::json!({
        "event": "tool_audit",
        "tool": tool,
        "target": target,
        "depth": depth,
        "ok": status.is_success(),
        "outcome": status.label(),
        "findings": findings.len(),
        "duration_ms": duration_ms,
    });
    tracing::info!(audit = %audit.to_string(), "tool");
    match &status {
        ToolStatus::Unavailable(reason) => tracing::warn!(tool = %tool, reason = %reason, "tool skipped"),
        ToolStatus::Failed(reason) => tracing::warn!(tool = %tool, target = %target, reason = %reason, "tool failed"),
        ToolStatus::TimedOut => tracing::warn!(tool = %tool, target = %target, "tool timed out, keeping partial output"),
        _ => {}
    }

    ToolRun {
        report: ToolRunReport {
            tool,
            target,
            depth,
            status,
            findings: findings.len(),
            duration_ms,
        },
        findings,
    }
}

fn settle(outcome: Result<Vec<RawFinding>, ToolError>) -> (ToolStatus, Vec<RawFinding>) {
    match outcome {
        Ok(findings) => (ToolStatus::Succeeded, findings),
        Err(e) => e.into_status(),
    }
}
