//! 递归控制：深度状态机 + 已提交目标集合
//!
//! 深度 d 验证完成后，若启用递归且 d < max_depth，则 d+1 轮的目标为深度 d 新建、且从未作为目标提交过的记录。
//! 每个名字最多作为目标提交一次，因此递归一定终止。

use std::collections::HashSet;

use crate::recon::aggregator::SubdomainMap;
use crate::recon::model::ResolutionStatus;

#[derive(Clone, Debug)]
pub struct RecursionController {
    enabled: bool,
    max_depth: u32,
    submitted: HashSet<String>,
}

impl RecursionController {
    pub fn new(enabled: bool, max_depth: u32) -> Self {
        Self {
            enabled,
            max_depth,
            submitted: HashSet::new(),
        }
    }

    /// 记录种子目标（深度 0 的目标同样不能再次提交）
    pub fn seed<'a>(&mut self, targets: impl IntoIterator<Item = &'a String>) {
        self.submitted.extend(targets.into_iter().cloned());
    }

    /// 是否还允许在 completed_depth 之后再跑一轮
    pub fn can_descend(&self, completed_depth: u32) -> bool {
        self.enabled && completed_depth < self.max_depth
    }

    /// 下一轮目标；require_live 为 false 时（未做验证）接受 unknown 记录
    pub fn next_targets(&mut self, records: &SubdomainMap, completed_depth: u32, require_live: bool) -> Vec<String> {
        if !self.can_descend(completed_depth) {
            return Vec::new();
        }
        let targets: Vec<String> = records
            .values()
            .filter(|r| r.depth == completed_depth)
            .filter(|r| {
                if require_live {
                    r.status == ResolutionStatus::Live
                } else {
                    r.status != ResolutionStatus::Dead
                }
            })
            .filter(|r| !self.submitted.contains(&r.hostname))
            .map(|r| r.hostname.clone())
            .collect();
        self.submitted.extend(targets.iter().cloned());
        targets
    }

    pub fn was_submitted(&self, name: &str) -> bool {
        self.submitted.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recon::model::SubdomainRecord;
    use std::net::IpAddr;

    fn live(name: &str, depth: u32) -> SubdomainRecord {
        let mut r = SubdomainRecord::new(name, depth);
        r.apply_resolution(&[IpAddr::from([10, 0, 0, 1])].into_iter().collect());
        r
    }

    fn map(records: Vec<SubdomainRecord>) -> SubdomainMap {
        records.into_iter().map(|r| (r.hostname.clone(), r)).collect()
    }

    #[test]
    fn test_next_targets_are_live_at_depth() {
        let mut ctl = RecursionController::new(true, 2);
        ctl.seed(&["example.com".to_string()]);
        let mut dead = SubdomainRecord::new("dead.example.com", 0);
        dead.apply_resolution(&Default::default());
        let records = map(vec![
            live("example.com", 0),
            live("www.example.com", 0),
            dead,
            SubdomainRecord::new("pending.example.com", 0),
            live("deep.www.example.com", 1),
        ]);

        assert_eq!(ctl.next_targets(&records, 0, true), vec!["www.example.com"]);
        // 已提交过的不再返回
        assert!(ctl.next_targets(&records, 0, true).is_empty());
        assert_eq!(ctl.next_targets(&records, 1, true), vec!["deep.www.example.com"]);
    }

    #[test]
    fn test_max_depth_stops_recursion() {
        let mut ctl = RecursionController::new(true, 1);
        let records = map(vec![live("a.example.com", 1)]);
        assert!(!ctl.can_descend(1));
        assert!(ctl.next_targets(&records, 1, true).is_empty());
    }

    #[test]
    fn test_disabled() {
        let mut ctl = RecursionController::new(false, 3);
        let records = map(vec![live("a.example.com", 0)]);
        assert!(ctl.next_targets(&records, 0, true).is_empty());
    }

    #[test]
    fn test_without_validation_uses_unknown() {
        let mut ctl = RecursionController::new(true, 1);
        let records = map(vec![SubdomainRecord::new("a.example.com", 0)]);
        assert_eq!(ctl.next_targets(&records, 0, false), vec!["a.example.com"]);
        assert!(ctl.was_submitted("a.example.com"));
    }
}
