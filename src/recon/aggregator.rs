//! 结果聚合：规范化、语法校验、范围过滤、去重合并
//!
//! 单写者归约：会话持有 SubdomainMap，每轮把所有工具的 RawFinding 依次合并进来，
//! 合并顺序不影响结果（来源集合只增不减，深度取首次出现）。

use std::collections::BTreeMap;

use crate::recon::model::{RawFinding, SubdomainRecord};
use crate::recon::target::{normalize_hostname, ScopeRule};

/// 规范化主机名 → 记录
pub type SubdomainMap = BTreeMap<String, SubdomainRecord>;

/// 一次合并的统计
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub accepted: usize,
    pub invalid: usize,
    pub out_of_scope: usize,
}

/// 一次合并的结果：本轮新建的名字（按首次出现顺序）+ 统计
#[derive(Clone, Debug, Default)]
pub struct MergeOutcome {
    pub new_names: Vec<String>,
    pub stats: MergeStats,
}

#[derive(Clone, Debug)]
pub struct ResultAggregator {
    scope: ScopeRule,
}

impl ResultAggregator {
    pub fn new(scope: ScopeRule) -> Self {
        Self { scope }
    }

    /// 合并一批发现；已存在的名字只追加来源，深度保持不变
    pub fn merge<'a>(
        &self,
        records: &mut SubdomainMap,
        findings: impl IntoIterator<Item = &'a RawFinding>,
        depth: u32,
    ) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        for finding in findings {
            let Some(name) = normalize_hostname(&finding.hostname) else {
                outcome.stats.invalid += 1;
                continue;
            };
            if !self.scope.contains(&name) {
                outcome.stats.out_of_scope += 1;
                continue;
            }
            outcome.stats.accepted += 1;
            let record = records.entry(name.clone()).or_insert_with(|| {
                outcome.new_names.push(name.clone());
                SubdomainRecord::new(name, depth)
            });
            record.add_source(&finding.tool);
        }
        if outcome.stats.invalid > 0 || outcome.stats.out_of_scope > 0 {
            tracing::debug!(
                invalid = outcome.stats.invalid,
                out_of_scope = outcome.stats.out_of_scope,
                "findings dropped during merge"
            );
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recon::target::{ScopeMode, Target};

    fn aggregator() -> ResultAggregator {
        ResultAggregator::new(ScopeRule::new(&Target::parse("example.com").unwrap(), ScopeMode::Strict))
    }

    fn finding(host: &str, tool: &str) -> RawFinding {
        RawFinding::new(host, tool, host)
    }

    #[test]
    fn test_merge_two_tools() {
        let agg = aggregator();
        let mut records = SubdomainMap::new();
        let a = vec![finding("www.example.com", "A"), finding("mail.example.com", "A")];
        let b = vec![finding("WWW.example.com.", "B"), finding("api.example.com", "B")];
        agg.merge(&mut records, &a, 0);
        let outcome = agg.merge(&mut records, &b, 0);

        assert_eq!(
            records.keys().cloned().collect::<Vec<_>>(),
            vec!["api.example.com", "mail.example.com", "www.example.com"]
        );
        assert_eq!(records["www.example.com"].sources.len(), 2);
        assert_eq!(outcome.new_names, vec!["api.example.com"]);
    }

    #[test]
    fn test_same_finding_twice_counts_tool_once() {
        let agg = aggregator();
        let mut records = SubdomainMap::new();
        let f = vec![finding("www.example.com", "A"), finding("www.example.com", "A")];
        agg.merge(&mut records, &f, 0);
        assert_eq!(records.len(), 1);
        assert_eq!(records["www.example.com"].sources.len(), 1);
    }

    #[test]
    fn test_scope_and_syntax_filter() {
        let agg = aggregator();
        let mut records = SubdomainMap::new();
        let f = vec![
            finding("notexample.com", "A"),
            finding("evil.com", "A"),
            finding("[INF] banner", "A"),
            finding("*.dev.example.com", "A"),
            finding("example.com", "A"),
        ];
        let outcome = agg.merge(&mut records, &f, 0);
        assert_eq!(outcome.stats.out_of_scope, 2);
        assert_eq!(outcome.stats.invalid, 1);
        assert!(records.contains_key("dev.example.com"));
        assert!(records.contains_key("example.com"));
    }

    #[test]
    fn test_existing_name_keeps_depth() {
        let agg = aggregator();
        let mut records = SubdomainMap::new();
        agg.merge(&mut records, &[finding("new.example.com", "A")], 0);
        let outcome = agg.merge(&mut records, &[finding("new.example.com", "B")], 1);
        assert!(outcome.new_names.is_empty());
        assert_eq!(records["new.example.com"].depth, 0);
        assert_eq!(records["new.example.com"].sources.len(), 2);
    }

    #[test]
    fn test_unrestricted_scope() {
        let agg = ResultAggregator::new(ScopeRule::unrestricted());
        let mut records = SubdomainMap::new();
        agg.merge(&mut records, &[finding("host.other.org", "reverse-dns")], 0);
        assert!(records.contains_key("host.other.org"));
    }
}
