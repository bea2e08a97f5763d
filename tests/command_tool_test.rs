//! 外部引擎端到端测试：用 shell 脚本扮演发现工具，经由 ReconBuilder 跑完整会话

#[cfg(all(test, unix))]
mod tests {
    use std::net::IpAddr;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;
    use dsint::config::AppConfig;
    use dsint::core::ReconBuilder;
    use dsint::dns::{BatchResolution, DnsError, HostResolution, Resolver};
    use dsint::recon::{ResolutionStatus, SessionOptions, ToolStatus};
    use dsint::tools::{DiscoveryTool, ParserKind};

    struct StaticResolver;

    #[async_trait]
    impl Resolver for StaticResolver {
        fn name(&self) -> &str {
            "static"
        }

        async fn resolve_batch(&self, hosts: &[String]) -> Result<BatchResolution, DnsError> {
            Ok(hosts
                .iter()
                .map(|h| {
                    let res = if h.starts_with("www.") || h.starts_with("api.") {
                        HostResolution::Addresses([IpAddr::from([192, 0, 2, 10])].into_iter().collect())
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

    fn script(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().to_string()
    }

    #[tokio::test]
    async fn test_external_engines_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let lines = script(
            dir.path(),
            "fake-lines",
            r#"echo "[INF] Enumerating $2"; echo "www.$2"; echo "api.$2"; echo "evil.com""#,
        );
        let dnsenum = script(
            dir.path(),
            "fake-dnsenum",
            r#"echo "mx.$1.  300 IN MX 10 mail.$1."; echo "www.$1.  60 IN A 192.0.2.10"; echo "old.$1.  60 IN A 192.0.2.11""#,
        );

        let mut config = AppConfig::default();
        config.tools.discovery = vec![
            DiscoveryTool::new("lines", &lines, &["-d", "{{target}}"]),
            DiscoveryTool::new("dnsenum", &dnsenum, &["{{target}}"]).with_parser(ParserKind::Dnsenum),
            DiscoveryTool::new("missing", "dsint-engine-not-installed", &["{{target}}"]),
        ];
        let builder = ReconBuilder::new(config).with_resolver(Arc::new(StaticResolver));
        let options = SessionOptions {
            tools: vec!["lines".into(), "dnsenum".into(), "missing".into()],
            ..Default::default()
        };

        let report = builder
            .build_session_with("example.com", options)
            .unwrap()
            .run()
            .await;

        let names: Vec<&str> = report.subdomains.iter().map(|r| r.hostname.as_str()).collect();
        assert_eq!(names, vec!["api.example.com", "old.example.com", "www.example.com"]);
        assert_eq!(report.subdomain("www.example.com").unwrap().sources.len(), 2);
        assert_eq!(
            report.subdomain("old.example.com").unwrap().status,
            ResolutionStatus::Dead
        );

        let missing = report.tool_runs.iter().find(|r| r.tool == "missing").unwrap();
        assert!(matches!(missing.status, ToolStatus::Unavailable(_)));
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_wordlist_file_is_forwarded() {
        let dir = tempfile::tempdir().unwrap();
        let words = dir.path().join("words.txt");
        std::fs::write(&words, "www\nstaging\n").unwrap();

        let builder = ReconBuilder::new(AppConfig::default()).with_resolver(Arc::new(StaticResolver));
        let options = SessionOptions {
            tools: vec!["wordlist".into()],
            wordlist: Some(words),
            ..Default::default()
        };
        let report = builder
            .build_session_with("example.com", options)
            .unwrap()
            .run()
            .await;

        let names: Vec<&str> = report.subdomains.iter().map(|r| r.hostname.as_str()).collect();
        assert_eq!(names, vec!["www.example.com"]);
        assert!(report.subdomain("www.example.com").unwrap().is_live());
    }
}
