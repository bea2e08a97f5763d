//! 基于 hickory-resolver 的解析器
//!
//! 每个主机名一次 lookup_ip，正反向查询都按解析信号量限制在途数；NXDOMAIN / 空应答记为 NoRecords，
//! 其它错误记为 Failed。hickory 内部只尝试一次，重试统一由验证器负责。

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::TokioAsyncResolver;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::dns::{BatchResolution, DnsError, HostResolution, Resolver};

/// 系统/公共 DNS 解析器
pub struct SystemResolver {
    resolver: TokioAsyncResolver,
    permits: Arc<Semaphore>,
    concurrency: usize,
}

fn resolver_opts(timeout: Duration) -> ResolverOpts {
    let mut opts = ResolverOpts::default();
    opts.timeout = timeout;
    opts.attempts = 1;
    opts.use_hosts_file = false;
    opts
}

impl SystemResolver {
    /// timeout 为单次查询超时
    pub fn new(timeout: Duration, permits: Arc<Semaphore>) -> Self {
        let concurrency = permits.available_permits().max(1);
        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), resolver_opts(timeout)),
            permits,
            concurrency,
        }
    }

    async fn permit(&self) -> Option<OwnedSemaphorePermit> {
        self.permits.clone().acquire_owned().await.ok()
    }

    async fn lookup(&self, host: &str) -> HostResolution {
        let Some(_permit) = self.permit().await else {
            return HostResolution::Failed("resolver shut down".to_string());
        };
        match self.resolver.lookup_ip(host).await {
            Ok(lookup) => {
                let addrs: BTreeSet<IpAddr> = lookup.iter().collect();
                if addrs.is_empty() {
                    HostResolution::NoRecords
                } else {
                    HostResolution::Addresses(addrs)
                }
            }
            Err(e) if is_no_records(&e) => HostResolution::NoRecords,
            Err(e) => HostResolution::Failed(e.to_string()),
        }
    }
}

fn is_no_records(err: &ResolveError) -> bool {
    matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. })
}

#[async_trait]
impl Resolver for SystemResolver {
    fn name(&self) -> &str {
        "system"
    }

    async fn resolve_batch(&self, hosts: &[String]) -> Result<BatchResolution, DnsError> {
        let results: Vec<(String, HostResolution)> = stream::iter(hosts.iter().cloned())
            .map(|host| async move {
                let resolution = self.lookup(&host).await;
                (host, resolution)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        Ok(results.into_iter().collect())
    }

    async fn reverse(&self, ip: IpAddr) -> Result<Vec<String>, DnsError> {
        let _permit = self
            .permit()
            .await
            .ok_or_else(|| DnsError::Unavailable("resolver shut down".to_string()))?;
        match self.resolver.reverse_lookup(ip).await {
            Ok(lookup) => Ok(lookup
                .iter()
                .map(|ptr| ptr.to_string().trim_end_matches('.').to_string())
                .collect()),
            Err(e) if is_no_records(&e) => Ok(Vec::new()),
            Err(e) => Err(DnsError::Failed(e.to_string())),
        }
    }
}
