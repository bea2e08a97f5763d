//! 侦察构建器：统一的组件初始化逻辑
//!
//! 由 AppConfig 构建解析器、工具注册表（内置引擎 + 配置条目 + 字典爆破）、调度器、验证器与证书种子来源，
//! 二进制与测试都经由这里创建 ReconSession。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppConfig, ResolverKind};
use crate::core::{ReconError, TaskKind, TaskScheduler};
use crate::dns::{MassDnsResolver, Resolver, SystemResolver};
use crate::recon::{CertificateSource, DnsValidator, ReconSession, SessionOptions, TlsCertificateSource};
use crate::tools::{merge_tools, CommandTool, ToolRegistry, WordlistTool};

/// 侦察构建器：统一配置和初始化会话的各个组件
pub struct ReconBuilder {
    config: AppConfig,
    scheduler: Arc<TaskScheduler>,
    resolver: Option<Arc<dyn Resolver>>,
}

impl ReconBuilder {
    pub fn new(config: AppConfig) -> Self {
        let scheduler = Arc::new(TaskScheduler::new(
            config.concurrency.max_tools,
            config.concurrency.max_resolutions,
        ));
        Self {
            config,
            scheduler,
            resolver: None,
        }
    }

    /// 替换解析器（测试或自定义后端）
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// 构建配置选择的解析器
    pub fn build_resolver(&self) -> Arc<dyn Resolver> {
        if let Some(resolver) = &self.resolver {
            return resolver.clone();
        }
        let dns = &self.config.dns;
        match dns.resolver {
            ResolverKind::Massdns => Arc::new(
                MassDnsResolver::new(dns.massdns_path.clone(), Duration::from_secs(dns.batch_timeout_secs))
                    .with_search_paths(self.config.tools.search_paths.clone())
                    .with_resolvers_file(dns.resolvers_file.clone())
                    .with_concurrency(self.scheduler.limit(TaskKind::Resolution)),
            ),
            ResolverKind::System => Arc::new(SystemResolver::new(
                Duration::from_secs(dns.timeout_secs),
                self.scheduler.resolve_semaphore(),
            )),
        }
    }

    /// 构建统一的工具注册表：内置引擎（可被配置覆盖）+ 配置新增引擎 + 字典爆破
    pub fn build_tool_registry(&self, resolver: Arc<dyn Resolver>) -> ToolRegistry {
        let tools_cfg = &self.config.tools;
        let mut tools = ToolRegistry::new();
        for spec in merge_tools(&tools_cfg.discovery) {
            tools.register(CommandTool::new(
                spec,
                tools_cfg.search_paths.clone(),
                tools_cfg.default_timeout_secs,
            ));
        }
        tools.register(WordlistTool::new(
            resolver,
            Duration::from_secs(tools_cfg.default_timeout_secs),
        ));
        tools
    }

    pub fn build_validator(&self, resolver: Arc<dyn Resolver>) -> DnsValidator {
        let dns = &self.config.dns;
        DnsValidator::new(resolver)
            .with_retries(dns.retries)
            .with_batch_size(dns.batch_size)
            .with_batch_timeout(Duration::from_secs(dns.batch_timeout_secs))
    }

    /// 以配置默认参数构建会话
    pub fn build_session(&self, target: &str) -> Result<ReconSession, ReconError> {
        self.build_session_with(target, self.config.session_options())
    }

    /// 证书种子来源；配置关闭时为 None
    pub fn build_certificate_source(&self) -> Option<Arc<dyn CertificateSource>> {
        let ip_mode = &self.config.ip_mode;
        ip_mode.tls_certificates.then(|| {
            Arc::new(TlsCertificateSource::new(
                ip_mode.tls_port,
                Duration::from_secs(ip_mode.tls_timeout_secs),
            )) as Arc<dyn CertificateSource>
        })
    }

    /// 以给定参数构建会话
    pub fn build_session_with(&self, target: &str, options: SessionOptions) -> Result<ReconSession, ReconError> {
        let resolver = self.build_resolver();
        let registry = self.build_tool_registry(resolver.clone());
        let validator = self.build_validator(resolver);
        let session = ReconSession::new(target, options, registry, validator, self.scheduler.clone())?;
        Ok(match self.build_certificate_source() {
            Some(source) => session.with_certificate_source(source),
            None => session,
        })
    }

    /// 获取配置
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Arc<TaskScheduler> {
        &self.scheduler
    }
}

/// 便捷函数：加载配置并创建 ReconBuilder
///
/// 显式传入的配置文件必须能读取并解析；只用默认路径时，加载失败退回默认值。
pub fn create_recon_builder(config_path: Option<PathBuf>) -> Result<ReconBuilder, ReconError> {
    let explicit = config_path.is_some();
    let config = match crate::config::load_config(config_path) {
        Ok(config) => config,
        Err(e) if explicit => return Err(e.into()),
        Err(e) => {
            tracing::warn!("Config load failed ({}), using defaults", e);
            AppConfig::default()
        }
    };
    Ok(ReconBuilder::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{DiscoveryTool, WORDLIST_TOOL};

    #[test]
    fn test_registry_contains_builtins_and_wordlist() {
        let mut config = AppConfig::default();
        config
            .tools
            .discovery
            .push(DiscoveryTool::new("assetfinder", "assetfinder", &["--subs-only", "{{target}}"]));
        let builder = ReconBuilder::new(config);
        let registry = builder.build_tool_registry(builder.build_resolver());
        for name in ["amass", "subfinder", "dnsenum", "sublist3r", "assetfinder", WORDLIST_TOOL] {
            assert!(registry.contains(name), "missing {name}");
        }
        let descriptions = registry.tool_descriptions();
        assert!(descriptions.contains(&("amass".to_string(), "OWASP Amass passive enumeration".to_string())));
    }

    #[test]
    fn test_build_session_rejects_bad_input() {
        let builder = ReconBuilder::new(AppConfig::default());
        assert!(matches!(
            builder.build_session("not a domain"),
            Err(ReconError::InvalidTarget(_))
        ));

        let options = SessionOptions {
            tools: vec!["nosuchtool".into()],
            ..Default::default()
        };
        assert!(matches!(
            builder.build_session_with("example.com", options),
            Err(ReconError::UnknownTool(_))
        ));
    }

    #[test]
    fn test_skip_wordlist_removes_tool() {
        let builder = ReconBuilder::new(AppConfig::default());
        let options = SessionOptions {
            skip_wordlist: true,
            ..Default::default()
        };
        let session = builder.build_session_with("example.com", options).unwrap();
        assert!(!session.tools().iter().any(|t| t == WORDLIST_TOOL));
        assert_eq!(session.tools().len(), 4);
    }

    #[test]
    fn test_explicit_bad_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("dsint.toml");
        std::fs::write(&bad, "[dns]\nresolver = \"carrier-pigeon\"\n").unwrap();

        let err = create_recon_builder(Some(bad)).err().unwrap();
        assert!(matches!(err, ReconError::Config(_)));
    }

    #[test]
    fn test_certificate_source_follows_config() {
        assert!(ReconBuilder::new(AppConfig::default()).build_certificate_source().is_some());

        let mut config = AppConfig::default();
        config.ip_mode.tls_certificates = false;
        assert!(ReconBuilder::new(config).build_certificate_source().is_none());
    }
}
