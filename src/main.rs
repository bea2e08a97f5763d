//! DSInt 命令行入口
//!
//! 初始化日志、加载配置、构建一次侦察会话并运行，把报告以 JSON 打印到 stdout。
//! 运行被超时或中断截断时，报告照常输出，进程以非零码退出。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use dsint::core::{create_recon_builder, ShutdownManager};
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "dsint", version, about = "Subdomain reconnaissance: run discovery engines, merge, validate, map IPs")]
struct Cli {
    /// Target domain or IP address
    #[arg(required_unless_present = "list_tools")]
    target: Option<String>,
    /// Re-run discovery on newly found live subdomains
    #[arg(short, long)]
    recursive: bool,
    /// Maximum recursion depth
    #[arg(long)]
    max_depth: Option<u32>,
    /// Skip DNS validation
    #[arg(long)]
    no_validate: bool,
    /// Comma-separated tool subset
    #[arg(short, long, value_delimiter = ',')]
    tools: Vec<String>,
    /// Wordlist forwarded to brute-force tools
    #[arg(short, long)]
    wordlist: Option<PathBuf>,
    /// Do not run the wordlist brute force
    #[arg(long)]
    skip_wordlist: bool,
    /// Session timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
    /// Extra config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
    /// List the registered discovery tools and exit
    #[arg(long)]
    list_tools: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dsint::observability::init_with_level(if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    });

    let builder = create_recon_builder(cli.config.clone()).context("Failed to load configuration")?;

    if cli.list_tools {
        let registry = builder.build_tool_registry(builder.build_resolver());
        for (name, description) in registry.tool_descriptions() {
            println!("{name:<12} {description}");
        }
        return Ok(());
    }
    let target = cli.target.clone().context("a target is required")?;

    let mut options = builder.config().session_options();
    options.recursive |= cli.recursive;
    if let Some(depth) = cli.max_depth {
        options.max_depth = depth;
    }
    if cli.no_validate {
        options.validate = false;
    }
    if !cli.tools.is_empty() {
        options.tools = cli.tools.clone();
    }
    if cli.wordlist.is_some() {
        options.wordlist = cli.wordlist.clone();
    }
    options.skip_wordlist |= cli.skip_wordlist;
    if let Some(secs) = cli.timeout.filter(|s| *s > 0) {
        options.session_timeout = Some(Duration::from_secs(secs));
    }

    let session = builder
        .build_session_with(&target, options)
        .context("Failed to start reconnaissance session")?;

    let shutdown = Arc::new(ShutdownManager::new(session.supervisor()));
    shutdown.install_signal_handlers();

    let report = session.run().await;
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    println!("{json}");

    if let Some(err) = report.completion_error() {
        tracing::warn!(error = %err, "reconnaissance incomplete, partial results reported");
        std::process::exit(2);
    }
    Ok(())
}
