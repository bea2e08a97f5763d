//! DNS 验证：把所有 unknown 记录提交给解析器，按结果划分 live / dead
//!
//! 每轮一次批量请求（可按 batch_size 分块并发），某一块的解析器错误只影响该块；
//! 解析失败的主机在重试预算内重新提交，用尽后记为 dead 并留下 ValidationFailure。
//! 取消时尚未得到结果的主机保持 unknown。

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::dns::{DnsError, HostResolution, Resolver};
use crate::recon::aggregator::SubdomainMap;
use crate::recon::model::ResolutionStatus;

/// 同时在途的批次数
const MAX_PARALLEL_BATCHES: usize = 4;

/// 解析器自身按 batch_timeout 收尾（massdns 超时后仍返回已得到的应答），外层只兜底卡死的后端
const BATCH_TIMEOUT_GRACE: Duration = Duration::from_secs(2);

/// 单个主机的验证失败（非致命，作为会话元数据记录）
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    pub hostname: String,
    pub reason: String,
}

/// 一轮验证的统计
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    pub submitted: usize,
    pub live: usize,
    pub dead: usize,
    pub failures: Vec<ValidationFailure>,
    pub interrupted: bool,
}

#[derive(Clone)]
pub struct DnsValidator {
    resolver: Arc<dyn Resolver>,
    retries: u32,
    batch_size: usize,
    batch_timeout: Duration,
}

impl DnsValidator {
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self {
            resolver,
            retries: 1,
            batch_size: 0,
            batch_timeout: Duration::from_secs(600),
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// 0 表示整轮一批
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = timeout;
        self
    }

    pub fn resolver(&self) -> &Arc<dyn Resolver> {
        &self.resolver
    }

    /// 验证所有 unknown 记录并写回
    pub async fn validate_unknown(&self, records: &mut SubdomainMap, cancel: &CancellationToken) -> ValidationSummary {
        let hosts: Vec<String> = records
            .values()
            .filter(|r| r.status == ResolutionStatus::Unknown)
            .map(|r| r.hostname.clone())
            .collect();
        self.validate_hosts(records, hosts, cancel).await
    }

    /// 验证指定主机（可包含已 live 的名字：live 不会被回退）
    pub async fn validate_hosts(
        &self,
        records: &mut SubdomainMap,
        hosts: Vec<String>,
        cancel: &CancellationToken,
    ) -> ValidationSummary {
        let mut summary = ValidationSummary {
            submitted: hosts.len(),
            ..Default::default()
        };
        if hosts.is_empty() {
            return summary;
        }
        tracing::info!(hosts = hosts.len(), resolver = self.resolver.name(), "validating subdomains");

        let (outcomes, interrupted) = self.resolve_with_retries(hosts, cancel).await;
        summary.interrupted = interrupted;

        for (host, outcome) in outcomes {
            let Some(record) = records.get_mut(&host) else {
                continue;
            };
            match outcome {
                HostResolution::Addresses(ips) => record.apply_resolution(&ips),
                HostResolution::NoRecords => record.apply_resolution(&BTreeSet::new()),
                HostResolution::Failed(reason) => {
                    record.apply_resolution(&BTreeSet::new());
                    summary.failures.push(ValidationFailure {
                        hostname: host.clone(),
                        reason,
                    });
                }
            }
            match record.status {
                ResolutionStatus::Live => summary.live += 1,
                ResolutionStatus::Dead => summary.dead += 1,
                ResolutionStatus::Unknown => {}
            }
        }
        summary.failures.sort_by(|a, b| a.hostname.cmp(&b.hostname));
        tracing::info!(
            live = summary.live,
            dead = summary.dead,
            failures = summary.failures.len(),
            interrupted = summary.interrupted,
            "validation pass finished"
        );
        summary
    }

    /// 返回每个已有结论的主机的结果；被取消时返回 (部分结果, true)
    async fn resolve_with_retries(
        &self,
        hosts: Vec<String>,
        cancel: &CancellationToken,
    ) -> (HashMap<String, HostResolution>, bool) {
        let mut outcomes: HashMap<String, HostResolution> = HashMap::new();
        let mut pending = hosts;

        for attempt in 0..=self.retries {
            if pending.is_empty() {
                break;
            }
            if attempt > 0 {
                tracing::debug!(attempt, hosts = pending.len(), "retrying failed resolutions");
            }
            let chunk_size = if self.batch_size == 0 {
                pending.len()
            } else {
                self.batch_size
            };
            let chunks: Vec<Vec<String>> = pending.chunks(chunk_size).map(|c| c.to_vec()).collect();

            let batches = stream::iter(chunks)
                .map(|chunk| self.resolve_chunk(chunk))
                .buffer_unordered(MAX_PARALLEL_BATCHES)
                .collect::<Vec<_>>();
            let results = tokio::select! {
                biased;
                _ = cancel.cancelled() => return (outcomes, true),
                results = batches => results,
            };

            pending = Vec::new();
            for batch in results {
                for (host, outcome) in batch {
                    if outcome.is_failed() {
                        pending.push(host.clone());
                    }
                    outcomes.insert(host, outcome);
                }
            }
        }
        (outcomes, false)
    }

    /// 一块主机的结果；解析器错误或超过预算仍无应答时整块记为 Failed
    async fn resolve_chunk(&self, chunk: Vec<String>) -> Vec<(String, HostResolution)> {
        let budget = self.batch_timeout + BATCH_TIMEOUT_GRACE;
        match tokio::time::timeout(budget, self.resolver.resolve_batch(&chunk)).await {
            Ok(Ok(mut batch)) => chunk
                .into_iter()
                .map(|host| {
                    let outcome = batch.remove(&host).unwrap_or(HostResolution::NoRecords);
                    (host, outcome)
                })
                .collect(),
            Ok(Err(e)) => {
                tracing::warn!(hosts = chunk.len(), error = %e, "resolver batch failed");
                let reason = e.to_string();
                chunk
                    .into_iter()
                    .map(|host| (host, HostResolution::Failed(reason.clone())))
                    .collect()
            }
            Err(_) => {
                tracing::warn!(hosts = chunk.len(), timeout_secs = budget.as_secs(), "resolver batch timed out");
                let reason = DnsError::Timeout(budget).to_string();
                chunk
                    .into_iter()
                    .map(|host| (host, HostResolution::Failed(reason.clone())))
                    .collect()
            }
        }
    }
}
