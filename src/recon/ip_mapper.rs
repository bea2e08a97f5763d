//! IP → 主机名映射：从全部 live 记录纯函数式重建

use std::collections::BTreeMap;
use std::net::IpAddr;

use crate::recon::aggregator::SubdomainMap;
use crate::recon::model::IpRecord;

pub type IpMap = BTreeMap<IpAddr, IpRecord>;

/// 由 live 记录构建 IP 映射；无 live 记录时为空
pub fn build_ip_map(records: &SubdomainMap) -> IpMap {
    let mut map = IpMap::new();
    for record in records.values().filter(|r| r.is_live()) {
        for ip in &record.ips {
            map.entry(*ip)
                .or_insert_with(|| IpRecord {
                    ip: *ip,
                    hostnames: Default::default(),
                })
                .hostnames
                .insert(record.hostname.clone());
        }
    }
    map
}

/// 按承载的主机名数量降序（相同时按 IP 升序）
pub fn by_host_count(map: &IpMap) -> Vec<&IpRecord> {
    let mut records: Vec<&IpRecord> = map.values().collect();
    records.sort_by(|a, b| b.hostnames.len().cmp(&a.hostnames.len()).then(a.ip.cmp(&b.ip)));
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recon::model::SubdomainRecord;
    use std::collections::BTreeSet;

    fn record(name: &str, ips: &[[u8; 4]]) -> SubdomainRecord {
        let mut r = SubdomainRecord::new(name, 0);
        let set: BTreeSet<IpAddr> = ips.iter().map(|o| IpAddr::from(*o)).collect();
        r.apply_resolution(&set);
        r
    }

    #[test]
    fn test_exact_inverse_of_live_mapping() {
        let records: SubdomainMap = [
            record("www.example.com", &[[10, 0, 0, 1], [10, 0, 0, 2]]),
            record("api.example.com", &[[10, 0, 0, 1]]),
            record("dead.example.com", &[]),
            SubdomainRecord::new("unknown.example.com", 0),
        ]
        .into_iter()
        .map(|r| (r.hostname.clone(), r))
        .collect();

        let map = build_ip_map(&records);
        assert_eq!(map.len(), 2);

        // 反向展开后与 live 的 name → IP 完全一致
        let mut forward: BTreeSet<(String, IpAddr)> = BTreeSet::new();
        for rec in map.values() {
            for host in &rec.hostnames {
                forward.insert((host.clone(), rec.ip));
            }
        }
        let expected: BTreeSet<(String, IpAddr)> = records
            .values()
            .filter(|r| r.is_live())
            .flat_map(|r| r.ips.iter().map(move |ip| (r.hostname.clone(), *ip)))
            .collect();
        assert_eq!(forward, expected);

        let ordered = by_host_count(&map);
        assert_eq!(ordered[0].ip, IpAddr::from([10, 0, 0, 1]));
        assert_eq!(ordered[0].hostnames.len(), 2);
    }

    #[test]
    fn test_no_live_records() {
        let records: SubdomainMap = [("a.example.com".to_string(), SubdomainRecord::new("a.example.com", 0))]
            .into_iter()
            .collect();
        assert!(build_ip_map(&records).is_empty());
    }
}
