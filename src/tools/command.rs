//! 外部命令发现工具：由 DiscoveryTool 描述（程序 + 参数模板 + 解析器 + 超时）构建
//!
//! 参数模板中 {{target}} 替换为当前目标，{{wordlist}} 替换为字典路径（未设置时该参数被丢弃）；
//! 执行时无 shell，直接 exec program + substituted args，逐行解析 stdout。

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;

use crate::recon::RawFinding;
use crate::tools::locate::{expand_home, locate_binary};
use crate::tools::parser::{OutputParser, ParserKind};
use crate::tools::process::{run_streaming, ProcessEnd};
use crate::tools::{DiscoveryContext, ToolAdapter, ToolError};

/// 发现引擎描述（对应配置 [[tools.discovery]]）
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DiscoveryTool {
    pub name: String,
    /// 程序名（在 PATH 与搜索目录中定位）或路径
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub parser: ParserKind,
    /// 单次调用超时（秒）；未设置时用 [tools] default_timeout_secs
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub description: String,
}

impl DiscoveryTool {
    pub fn new(name: &str, program: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            parser: ParserKind::Lines,
            timeout_secs: None,
            description: String::new(),
        }
    }

    pub fn with_parser(mut self, parser: ParserKind) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

/// 包装一个外部发现引擎的 ToolAdapter
pub struct CommandTool {
    spec: DiscoveryTool,
    parser: Box<dyn OutputParser>,
    search_paths: Vec<PathBuf>,
    default_timeout: Duration,
}

impl CommandTool {
    pub fn new(spec: DiscoveryTool, search_paths: Vec<PathBuf>, fallback_timeout_secs: u64) -> Self {
        let default_timeout = Duration::from_secs(spec.timeout_secs.unwrap_or(fallback_timeout_secs));
        Self {
            parser: spec.parser.build(),
            spec,
            search_paths,
            default_timeout,
        }
    }

    pub fn spec(&self) -> &DiscoveryTool {
        &self.spec
    }

    /// 替换模板中的 {{target}} / {{wordlist}}
    fn substitute(&self, target: &str, ctx: &DiscoveryContext) -> Vec<String> {
        let wordlist = ctx
            .wordlist
            .as_deref()
            .map(|p| expand_home(p).to_string_lossy().to_string());
        self.spec
            .args
            .iter()
            .filter_map(|tpl| {
                if tpl.contains("{{wordlist}}") {
                    let wl = wordlist.as_ref()?;
                    return Some(tpl.replace("{{wordlist}}", wl).replace("{{target}}", target));
                }
                Some(tpl.replace("{{target}}", target))
            })
            .collect()
    }

    fn collect(&self, lines: &[String], target: &str) -> Vec<RawFinding> {
        lines
            .iter()
            .flat_map(|line| {
                self.parser
                    .parse_line(line, target)
                    .into_iter()
                    .map(move |host| RawFinding::new(host, self.spec.name.clone(), line.clone()))
            })
            .collect()
    }
}

#[async_trait]
impl ToolAdapter for CommandTool {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    async fn discover(&self, target: &str, ctx: &DiscoveryContext) -> Result<Vec<RawFinding>, ToolError> {
        let program = locate_binary(&self.spec.program, &self.search_paths)
            .ok_or_else(|| ToolError::Unavailable(format!("{} not found", self.spec.program)))?;
        let args = self.substitute(target, ctx);
        tracing::debug!(tool = %self.spec.name, program = %program.display(), ?args, "discovery tool invoke");

        let start = Instant::now();
        let output = run_streaming(&program, &args, ctx.timeout, &ctx.cancel)
            .await
            .map_err(|e| ToolError::Execution(format!("spawn failed: {e}")))?;
        let findings = self.collect(&output.lines, target);

        match output.end {
            ProcessEnd::Exited { success: true, .. } => Ok(findings),
            ProcessEnd::Exited { code, stderr, .. } => Err(ToolError::Execution(format!(
                "exit {:?}: {}",
                code,
                stderr.trim()
            ))),
            ProcessEnd::TimedOut => Err(ToolError::Timeout {
                after: start.elapsed(),
                partial: findings,
            }),
            ProcessEnd::Cancelled => Err(ToolError::Interrupted { partial: findings }),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh_tool(name: &str, script: &str) -> CommandTool {
        let spec = DiscoveryTool::new(name, "/bin/sh", &["-c", script]);
        CommandTool::new(spec, Vec::new(), 5)
    }

    #[test]
    fn test_substitute_placeholders() {
        let spec = DiscoveryTool::new("x", "x", &["-d", "{{target}}", "-w", "{{wordlist}}"]);
        let tool = CommandTool::new(spec, Vec::new(), 5);

        let mut ctx = DiscoveryContext::new(Duration::from_secs(1));
        assert_eq!(tool.substitute("example.com", &ctx), vec!["-d", "example.com", "-w"]);

        ctx.wordlist = Some(PathBuf::from("/tmp/words.txt"));
        assert_eq!(
            tool.substitute("example.com", &ctx),
            vec!["-d", "example.com", "-w", "/tmp/words.txt"]
        );
    }

    #[tokio::test]
    async fn test_discover_parses_stdout() {
        let tool = sh_tool("fake", "echo '[INF] starting'; echo www.example.com; echo api.example.com");
        let ctx = DiscoveryContext::new(Duration::from_secs(5));
        let findings = tool.discover("example.com", &ctx).await.unwrap();
        let hosts: Vec<&str> = findings.iter().map(|f| f.hostname.as_str()).collect();
        assert_eq!(hosts, vec!["www.example.com", "api.example.com"]);
        assert!(findings.iter().all(|f| f.tool == "fake"));
    }

    #[tokio::test]
    async fn test_discover_unavailable() {
        let spec = DiscoveryTool::new("ghost", "dsint-no-such-engine", &[]);
        let tool = CommandTool::new(spec, Vec::new(), 5);
        let ctx = DiscoveryContext::new(Duration::from_secs(1));
        assert!(matches!(
            tool.discover("example.com", &ctx).await,
            Err(ToolError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_discover_nonzero_exit() {
        let tool = sh_tool("broken", "echo www.example.com; echo fatal >&2; exit 2");
        let ctx = DiscoveryContext::new(Duration::from_secs(5));
        match tool.discover("example.com", &ctx).await {
            Err(ToolError::Execution(msg)) => assert!(msg.contains("fatal")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_discover_timeout_returns_partial() {
        let tool = sh_tool("slow", "echo foo.example.com; exec sleep 5");
        let ctx = DiscoveryContext::new(Duration::from_millis(500));
        match tool.discover("example.com", &ctx).await {
            Err(ToolError::Timeout { partial, .. }) => {
                assert_eq!(partial.len(), 1);
                assert_eq!(partial[0].hostname, "foo.example.com");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
