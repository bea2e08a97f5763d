//! 字典爆破：把 `<word>.<target>` 交给会话解析器，能解析的名字即为发现
//!
//! 作为普通 ToolAdapter 参与调度；跳过字典爆破 = 从所选工具中去掉 "wordlist"。

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::dns::{HostResolution, Resolver};
use crate::recon::target::normalize_hostname;
use crate::recon::RawFinding;
use crate::tools::locate::expand_home;
use crate::tools::{DiscoveryContext, ToolAdapter, ToolError};

pub const WORDLIST_TOOL: &str = "wordlist";

/// 未指定字典文件时使用的常见子域名
pub const DEFAULT_WORDLIST: &[&str] = &[
    "www", "mail", "webmail", "smtp", "pop", "pop3", "imap", "ftp", "cpanel", "whm",
    "ns1", "ns2", "dns", "dns1", "dns2", "ns", "api", "api1", "api2", "dev", "test",
    "admin", "stage", "staging", "app", "apps", "secure", "vpn", "cloud", "cdn",
    "docs", "en", "es", "mx", "de", "fr", "it", "pt", "ru", "blog", "m", "mobile",
    "shop", "store", "web", "portal", "support", "help", "kb", "faq", "wiki", "git",
    "github", "gitlab", "jenkins", "jira", "confluence", "intranet", "remote", "host",
    "autodiscover", "news", "forum", "chat", "analytics", "stats", "metrics",
];

/// 每次提交给解析器的候选数；分块使超时时已解析的块仍能返回
const CHUNK_SIZE: usize = 512;

pub struct WordlistTool {
    resolver: Arc<dyn Resolver>,
    timeout: Duration,
}

impl WordlistTool {
    pub fn new(resolver: Arc<dyn Resolver>, timeout: Duration) -> Self {
        Self { resolver, timeout }
    }

    async fn load_words(path: Option<&Path>) -> Result<Vec<String>, ToolError> {
        let Some(path) = path else {
            return Ok(DEFAULT_WORDLIST.iter().map(|w| w.to_string()).collect());
        };
        let path = expand_home(path);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::Execution(format!("cannot read wordlist {}: {e}", path.display())))?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|w| !w.is_empty() && !w.starts_with('#'))
            .map(String::from)
            .collect())
    }

    fn candidates(words: &[String], target: &str) -> Vec<String> {
        let unique: BTreeSet<String> = words
            .iter()
            .filter_map(|w| normalize_hostname(&format!("{w}.{target}")))
            .collect();
        unique.into_iter().collect()
    }
}

#[async_trait]
impl ToolAdapter for WordlistTool {
    fn name(&self) -> &str {
        WORDLIST_TOOL
    }

    fn description(&self) -> &str {
        "brute-force common subdomain labels through the session resolver"
    }

    fn default_timeout(&self) -> Duration {
        self.timeout
    }

    async fn discover(&self, target: &str, ctx: &DiscoveryContext) -> Result<Vec<RawFinding>, ToolError> {
        let words = Self::load_words(ctx.wordlist.as_deref()).await?;
        let candidates = Self::candidates(&words, target);
        tracing::debug!(target = %target, candidates = candidates.len(), resolver = self.resolver.name(), "wordlist brute force");

        let start = Instant::now();
        let deadline = tokio::time::sleep(ctx.timeout);
        tokio::pin!(deadline);

        let mut findings = Vec::new();
        for chunk in candidates.chunks(CHUNK_SIZE) {
            let batch = tokio::select! {
                result = self.resolver.resolve_batch(chunk) => result,
                _ = &mut deadline => {
                    return Err(ToolError::Timeout { after: start.elapsed(), partial: findings });
                }
                _ = ctx.cancel.cancelled() => {
                    return Err(ToolError::Interrupted { partial: findings });
                }
            };
            let batch = batch.map_err(|e| ToolError::Execution(e.to_string()))?;
            for host in chunk {
                if let Some(HostResolution::Addresses(_)) = batch.get(host) {
                    findings.push(RawFinding::new(host.clone(), WORDLIST_TOOL, host.clone()));
                }
            }
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::{BatchResolution, DnsError};
    use std::net::IpAddr;

    struct OnlyWww;

    #[async_trait]
    impl Resolver for OnlyWww {
        fn name(&self) -> &str {
            "fake"
        }

        async fn resolve_batch(&self, hosts: &[String]) -> Result<BatchResolution, DnsError> {
            Ok(hosts
                .iter()
                .map(|h| {
                    let res = if h.starts_with("www.") {
                        HostResolution::Addresses([IpAddr::from([10, 0, 0, 1])].into_iter().collect())
                    } else {
                        HostResolution::NoRecords
                    };
                    (h.clone(), res)
                })
                .collect())
        }

        async fn reverse(&self, _ip: IpAddr) -> Result<Vec<String>, DnsError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_default_wordlist_has_common_labels() {
        assert!(DEFAULT_WORDLIST.contains(&"www"));
        assert!(DEFAULT_WORDLIST.contains(&"autodiscover"));
        assert_eq!(DEFAULT_WORDLIST.len(), 67);
    }

    #[tokio::test]
    async fn test_default_words_resolve() {
        let tool = WordlistTool::new(Arc::new(OnlyWww), Duration::from_secs(5));
        let ctx = DiscoveryContext::new(Duration::from_secs(5));
        let findings = tool.discover("example.com", &ctx).await.unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].hostname, "www.example.com");
        assert_eq!(findings[0].tool, WORDLIST_TOOL);
    }

    #[tokio::test]
    async fn test_wordlist_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.txt");
        std::fs::write(&path, "# comment\nwww\n\nWWW\nbad label\nftp\n").unwrap();

        let tool = WordlistTool::new(Arc::new(OnlyWww), Duration::from_secs(5));
        let mut ctx = DiscoveryContext::new(Duration::from_secs(5));
        ctx.wordlist = Some(path);
        let findings = tool.discover("example.com", &ctx).await.unwrap();
        assert_eq!(findings.len(), 1);
    }

    #[tokio::test]
    async fn test_wordlist_path_under_home() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir(home.path().join("lists")).unwrap();
        std::fs::write(home.path().join("lists/words.txt"), "www\nftp\n").unwrap();
        std::env::set_var("HOME", home.path());

        let tool = WordlistTool::new(Arc::new(OnlyWww), Duration::from_secs(5));
        let mut ctx = DiscoveryContext::new(Duration::from_secs(5));
        ctx.wordlist = Some("~/lists/words.txt".into());
        let findings = tool.discover("example.com", &ctx).await.unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].hostname, "www.example.com");
    }

    #[tokio::test]
    async fn test_missing_wordlist_file() {
        let tool = WordlistTool::new(Arc::new(OnlyWww), Duration::from_secs(5));
        let mut ctx = DiscoveryContext::new(Duration::from_secs(5));
        ctx.wordlist = Some("/nonexistent/words.txt".into());
        assert!(matches!(
            tool.discover("example.com", &ctx).await,
            Err(ToolError::Execution(_))
        ));
    }
}
