//! 侦察会话：顶层编排
//!
//! 构造时校验目标与工具子集（唯一会直接失败的阶段），run 依次执行：
//! IP 模式种子（PTR、证书、常见虚拟主机）→ 每个深度的发现 + 合并 + 验证 → 递归 → IP 映射 → 不可变报告。
//! 会话超时或中断只会截断运行，已合并的结果照常出现在报告中。

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use uuid::Uuid;

use crate::core::{CancelReason, ReconError, SessionSupervisor, TaskScheduler};
use crate::recon::aggregator::{ResultAggregator, SubdomainMap};
use crate::recon::ip_mapper::{build_ip_map, by_host_count};
use crate::recon::ip_seed::{resolving_to, vhost_candidates, CertificateSource, TLS_CERT_SOURCE, VHOST_SOURCE};
use crate::recon::model::{RawFinding, ToolRunReport, ToolStatus};
use crate::recon::recursion::RecursionController;
use crate::recon::report::{ReconReport, RunCompletion};
use crate::recon::target::{ScopeMode, ScopeRule, Target};
use crate::recon::validator::{DnsValidator, ValidationFailure};
use crate::tools::{ToolRegistry, ToolRunner, WORDLIST_TOOL};

/// IP 模式下 PTR 种子的来源名
pub const REVERSE_DNS_TOOL: &str = "reverse-dns";

/// IP 模式的种子来源；出现在 tool_runs 中，但不计入 tools_invoked
pub const SEED_SOURCES: &[&str] = &[REVERSE_DNS_TOOL, TLS_CERT_SOURCE, VHOST_SOURCE];

/// 单次会话的运行参数
#[derive(Clone, Debug)]
pub struct SessionOptions {
    /// 工具子集；空表示全部已注册工具
    pub tools: Vec<String>,
    pub recursive: bool,
    pub max_depth: u32,
    pub validate: bool,
    pub skip_wordlist: bool,
    /// 原样转交给工具
    pub wordlist: Option<PathBuf>,
    pub scope: ScopeMode,
    pub session_timeout: Option<Duration>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            tools: Vec::new(),
            recursive: false,
            max_depth: 1,
            validate: true,
            skip_wordlist: false,
            wordlist: None,
            scope: ScopeMode::Strict,
            session_timeout: None,
        }
    }
}

pub struct ReconSession {
    id: Uuid,
    target: Target,
    options: SessionOptions,
    tools: Vec<String>,
    runner: ToolRunner,
    aggregator: ResultAggregator,
    validator: DnsValidator,
    certificates: Option<Arc<dyn CertificateSource>>,
    supervisor: SessionSupervisor,
}

impl ReconSession {
    /// 校验输入并组装会话；目标非法或工具名未知时在任何发现开始前失败
    pub fn new(
        target: &str,
        options: SessionOptions,
        registry: ToolRegistry,
        validator: DnsValidator,
        scheduler: Arc<TaskScheduler>,
    ) -> Result<Self, ReconError> {
        let target = Target::parse(target)?;
        let exclude: &[&str] = if options.skip_wordlist { &[WORDLIST_TOOL] } else { &[] };
        let tools = registry.select(&options.tools, exclude)?;

        let scope = match &target {
            Target::Domain(_) => ScopeRule::new(&target, options.scope),
            Target::Ip(_) => ScopeRule::unrestricted(),
        };
        let runner = ToolRunner::new(registry, scheduler).with_wordlist(options.wordlist.clone());

        Ok(Self {
            id: Uuid::new_v4(),
            target,
            options,
            tools,
            runner,
            aggregator: ResultAggregator::new(scope),
            validator,
            certificates: None,
            supervisor: SessionSupervisor::new(),
        })
    }

    /// IP 模式下额外从证书取种子
    pub fn with_certificate_source(mut self, source: Arc<dyn CertificateSource>) -> Self {
        self.certificates = Some(source);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// 选中的工具（有序）
    pub fn tools(&self) -> &[String] {
        &self.tools
    }

    /// 监管器句柄：用于接信号处理或从外部取消
    pub fn supervisor(&self) -> SessionSupervisor {
        self.supervisor.clone()
    }

    pub async fn run(self) -> ReconReport {
        let started_at = Utc::now();
        if let Some(timeout) = self.options.session_timeout {
            self.supervisor.arm_deadline(timeout);
        }
        let cancel = self.supervisor.cancel_token();
        tracing::info!(
            session = %self.id,
            target = %self.target,
            tools = ?self.tools,
            recursive = self.options.recursive,
            max_depth = self.options.max_depth,
            validate = self.options.validate,
            "recon session started"
        );

        let mut records = SubdomainMap::new();
        let mut tool_runs: Vec<ToolRunReport> = Vec::new();
        let mut failures: Vec<ValidationFailure> = Vec::new();
        let mut validated = false;
        let mut recursion = RecursionController::new(self.options.recursive, self.options.max_depth);

        let mut targets = match &self.target {
            Target::Domain(domain) => vec![domain.clone()],
            Target::Ip(ip) => self.ip_seeds(*ip, &mut records, &mut tool_runs).await,
        };
        recursion.seed(&targets);

        let mut depth = 0;
        let mut depth_reached = 0;
        while !targets.is_empty() && !cancel.is_cancelled() {
            tracing::info!(depth, targets = targets.len(), "discovery pass");
            let runs = self.runner.run(&self.tools, &targets, depth, &cancel).await;
            let mut new_names = 0;
            for run in runs {
                new_names += self.aggregator.merge(&mut records, &run.findings, depth).new_names.len();
                tool_runs.push(run.report);
            }
            depth_reached = depth;
            tracing::info!(depth, new_names, total = records.len(), "findings merged");

            if self.options.validate && !cancel.is_cancelled() {
                let summary = self.validator.validate_unknown(&mut records, &cancel).await;
                failures.extend(summary.failures);
                validated = true;
            }
            if cancel.is_cancelled() {
                break;
            }

            targets = recursion.next_targets(&records, depth, self.options.validate);
            if !targets.is_empty() {
                depth += 1;
            }
        }

        let completion = match self.supervisor.reason() {
            None => RunCompletion::Complete,
            Some(CancelReason::Deadline(after)) => RunCompletion::TimedOut {
                after_ms: after.as_millis() as u64,
            },
            Some(CancelReason::Interrupted) => RunCompletion::Interrupted,
        };
        self.supervisor.finish();

        let ip_map = build_ip_map(&records);
        let ip_records = by_host_count(&ip_map).into_iter().cloned().collect();
        let tools_invoked: Vec<String> = tool_runs
            .iter()
            .filter(|r| !SEED_SOURCES.contains(&r.tool.as_str()))
            .map(|r| r.tool.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let report = ReconReport {
            session_id: self.id,
            target: self.target.clone(),
            started_at,
            finished_at: Utc::now(),
            completion,
            tools_invoked,
            depth_reached,
            validated,
            subdomains: records.into_values().collect(),
            ip_records,
            tool_runs,
            validation_failures: failures,
        };
        tracing::info!(
            session = %report.session_id,
            subdomains = report.subdomains.len(),
            live = report.live_count(),
            ips = report.ip_records.len(),
            completion = ?report.completion,
            elapsed_ms = report.duration().num_milliseconds(),
            "recon session finished"
        );
        report
    }

    /// IP 模式：PTR、证书名字与命中的常见虚拟主机作为深度 0 的记录合并，全部作为首轮目标
    async fn ip_seeds(&self, ip: IpAddr, records: &mut SubdomainMap, tool_runs: &mut Vec<ToolRunReport>) -> Vec<String> {
        let cancel = self.supervisor.cancel_token();
        let resolver = self.validator.resolver().clone();

        let start = Instant::now();
        let lookup = tokio::select! {
            result = resolver.reverse(ip) => Some(result.map_err(|e| e.to_string())),
            _ = cancel.cancelled() => None,
        };
        self.merge_seeds(REVERSE_DNS_TOOL, ip, lookup, start, records, tool_runs);

        if let Some(certificates) = &self.certificates {
            if !cancel.is_cancelled() {
                let start = Instant::now();
                let lookup = tokio::select! {
                    result = certificates.names(ip) => Some(result.map_err(|e| e.to_string())),
                    _ = cancel.cancelled() => None,
                };
                self.merge_seeds(TLS_CERT_SOURCE, ip, lookup, start, records, tool_runs);
            }
        }

        let candidates = vhost_candidates(records.keys());
        if !candidates.is_empty() && !cancel.is_cancelled() {
            let start = Instant::now();
            let lookup = tokio::select! {
                result = resolver.resolve_batch(&candidates) => Some(
                    result.map(|batch| resolving_to(&batch, ip)).map_err(|e| e.to_string()),
                ),
                _ = cancel.cancelled() => None,
            };
            self.merge_seeds(VHOST_SOURCE, ip, lookup, start, records, tool_runs);
        }

        if records.is_empty() {
            tracing::warn!(ip = %ip, "no names found for target address, nothing to enumerate");
        }
        records.keys().cloned().collect()
    }

    /// lookup 为 None 表示被取消
    fn merge_seeds(
        &self,
        source: &str,
        ip: IpAddr,
        lookup: Option<Result<Vec<String>, String>>,
        start: Instant,
        records: &mut SubdomainMap,
        tool_runs: &mut Vec<ToolRunReport>,
    ) {
        let (status, names) = match lookup {
            Some(Ok(names)) => (ToolStatus::Succeeded, names),
            Some(Err(e)) => {
                tracing::warn!(source, ip = %ip, error = %e, "seed source failed");
                (ToolStatus::Failed(e), Vec::new())
            }
            None => (ToolStatus::Interrupted, Vec::new()),
        };
        let findings: Vec<RawFinding> = names
            .iter()
            .map(|name| RawFinding::new(name.clone(), source, name.clone()))
            .collect();
        let outcome = self.aggregator.merge(records, &findings, 0);
        tracing::info!(source, ip = %ip, found = findings.len(), new_names = outcome.new_names.len(), "ip seed source");
        tool_runs.push(ToolRunReport {
            tool: source.to_string(),
            target: ip.to_string(),
            depth: 0,
            status,
            findings: findings.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        });
    }
}
