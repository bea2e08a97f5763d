//! DNS 解析层：批量正向解析与 PTR 反查
//!
//! Resolver 是验证器与字典爆破共用的接缝：一次请求提交整批主机名，返回每个名字的解析结果。
//! 实现：MassDnsResolver（外部 massdns 进程）与 SystemResolver（hickory-resolver）。

pub mod massdns;
pub mod system;

use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use massdns::MassDnsResolver;
pub use system::SystemResolver;

/// 单个主机名的解析结果
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostResolution {
    Addresses(BTreeSet<IpAddr>),
    /// 权威地回答了“没有记录”（NXDOMAIN / 空应答）
    NoRecords,
    /// 解析本身失败（超时、SERVFAIL 等），可重试
    Failed(String),
}

impl HostResolution {
    pub fn is_failed(&self) -> bool {
        matches!(self, HostResolution::Failed(_))
    }
}

/// 主机名 → 解析结果；批量中缺失的名字视为没有记录
pub type BatchResolution = HashMap<String, HostResolution>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    #[error("Resolver unavailable: {0}")]
    Unavailable(String),

    #[error("Resolver timed out after {0:?}")]
    Timeout(Duration),

    #[error("Resolver failed: {0}")]
    Failed(String),
}

/// 批量解析器
#[async_trait]
pub trait Resolver: Send + Sync {
    fn name(&self) -> &str;

    /// 解析整批主机名（已规范化）
    async fn resolve_batch(&self, hosts: &[String]) -> Result<BatchResolution, DnsError>;

    /// PTR 反查，返回规范化前的名字
    async fn reverse(&self, ip: IpAddr) -> Result<Vec<String>, DnsError>;
}

/// IP 的反查域名（in-addr.arpa / ip6.arpa），不带尾点
pub fn arpa_name(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            format!("{}.{}.{}.{}.in-addr.arpa", o[3], o[2], o[1], o[0])
        }
        IpAddr::V6(v6) => {
            let mut labels: Vec<String> = Vec::with_capacity(34);
            for byte in v6.octets().iter().rev() {
                labels.push(format!("{:x}", byte & 0x0f));
                labels.push(format!("{:x}", byte >> 4));
            }
            labels.push("ip6".to_string());
            labels.push("arpa".to_string());
            labels.join(".")
        }
    }
}
