//! 最终侦察报告：会话结束后不可变的快照，可直接 serde 序列化
//!
//! 核心不写文件；JSON / CSV / 文本渲染交给调用方。

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::core::ReconError;
use crate::recon::model::{IpRecord, ResolutionStatus, SubdomainRecord, ToolRunReport};
use crate::recon::target::Target;
use crate::recon::validator::ValidationFailure;

/// 会话的完成状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunCompletion {
    Complete,
    TimedOut { after_ms: u64 },
    Interrupted,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReconReport {
    pub session_id: Uuid,
    pub target: Target,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub completion: RunCompletion,
    /// 实际被调用过的工具（去重、有序）
    pub tools_invoked: Vec<String>,
    /// 最后一个执行过的深度
    pub depth_reached: u32,
    /// 是否做过 DNS 验证
    pub validated: bool,
    /// 按主机名排序
    pub subdomains: Vec<SubdomainRecord>,
    /// 按承载主机名数量降序
    pub ip_records: Vec<IpRecord>,
    pub tool_runs: Vec<ToolRunReport>,
    pub validation_failures: Vec<ValidationFailure>,
}

impl ReconReport {
    pub fn is_complete(&self) -> bool {
        self.completion == RunCompletion::Complete
    }

    /// 不完整的运行映射为对应的会话错误
    pub fn completion_error(&self) -> Option<ReconError> {
        match self.completion {
            RunCompletion::Complete => None,
            RunCompletion::TimedOut { after_ms } => {
                Some(ReconError::SessionTimeout(Duration::from_millis(after_ms)))
            }
            RunCompletion::Interrupted => Some(ReconError::Interrupted),
        }
    }

    pub fn subdomain(&self, hostname: &str) -> Option<&SubdomainRecord> {
        self.subdomains
            .binary_search_by(|r| r.hostname.as_str().cmp(hostname))
            .ok()
            .map(|idx| &self.subdomains[idx])
    }

    pub fn ip_record(&self, ip: std::net::IpAddr) -> Option<&IpRecord> {
        self.ip_records.iter().find(|r| r.ip == ip)
    }

    pub fn count_by_status(&self, status: ResolutionStatus) -> usize {
        self.subdomains.iter().filter(|r| r.status == status).count()
    }

    pub fn live_count(&self) -> usize {
        self.count_by_status(ResolutionStatus::Live)
    }

    pub fn dead_count(&self) -> usize {
        self.count_by_status(ResolutionStatus::Dead)
    }

    pub fn unknown_count(&self) -> usize {
        self.count_by_status(ResolutionStatus::Unknown)
    }

    /// 每个工具贡献的（去重后）名字数量
    pub fn subdomains_by_tool(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.subdomains {
            for tool in &record.sources {
                *counts.entry(tool.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// 没有成功结束的工具调用
    pub fn failed_tools(&self) -> Vec<&ToolRunReport> {
        self.tool_runs.iter().filter(|r| !r.status.is_success()).collect()
    }

    pub fn subdomains_by_depth(&self) -> BTreeMap<u32, Vec<&str>> {
        let mut by_depth: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
        for record in &self.subdomains {
            by_depth.entry(record.depth).or_default().push(record.hostname.as_str());
        }
        by_depth
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recon::model::ToolStatus;

    fn report() -> ReconReport {
        let mut www = SubdomainRecord::new("www.example.com", 0);
        www.add_source("amass");
        www.add_source("subfinder");
        www.apply_resolution(&[std::net::IpAddr::from([10, 0, 0, 1])].into_iter().collect());
        let mut deep = SubdomainRecord::new("a.www.example.com", 1);
        deep.add_source("amass");

        let mut subdomains = vec![www, deep];
        subdomains.sort_by(|a, b| a.hostname.cmp(&b.hostname));
        let now = Utc::now();
        ReconReport {
            session_id: Uuid::new_v4(),
            target: Target::Domain("example.com".into()),
            started_at: now,
            finished_at: now,
            completion: RunCompletion::TimedOut { after_ms: 30_000 },
            tools_invoked: vec!["amass".into(), "subfinder".into()],
            depth_reached: 1,
            validated: true,
            subdomains,
            ip_records: Vec::new(),
            tool_runs: vec![ToolRunReport {
                tool: "subfinder".into(),
                target: "example.com".into(),
                depth: 0,
                status: ToolStatus::TimedOut,
                findings: 1,
                duration_ms: 10,
            }],
            validation_failures: Vec::new(),
        }
    }

    #[test]
    fn test_counts_and_lookup() {
        let r = report();
        assert_eq!(r.live_count(), 1);
        assert_eq!(r.unknown_count(), 1);
        assert!(r.subdomain("www.example.com").is_some());
        assert!(r.subdomain("nope.example.com").is_none());
        assert_eq!(r.subdomains_by_tool()["amass"], 2);
        assert_eq!(r.subdomains_by_depth()[&1], vec!["a.www.example.com"]);
        assert_eq!(r.failed_tools().len(), 1);
    }

    #[test]
    fn test_completion_error() {
        let r = report();
        assert!(!r.is_complete());
        assert_eq!(
            r.completion_error(),
            Some(ReconError::SessionTimeout(Duration::from_secs(30)))
        );
    }

    #[test]
    fn test_serializes_to_json() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["completion"]["state"], "timed_out");
        assert_eq!(json["target"]["mode"], "domain");
        assert_eq!(json["subdomains"][1]["status"], "live");
    }
}
