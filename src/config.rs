//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `DSINT__*` 覆盖（双下划线表示嵌套，如 `DSINT__DNS__RESOLVER=system`）。
//! 所有段都有默认值，空配置即可运行。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::recon::{ScopeMode, SessionOptions};
use crate::tools::DiscoveryTool;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub recon: ReconSection,
    pub concurrency: ConcurrencySection,
    pub dns: DnsSection,
    pub ip_mode: IpModeSection,
    pub tools: ToolsSection,
}

/// [recon] 段：递归、验证、范围、会话超时、工具子集、字典
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconSection {
    pub recursive: bool,
    pub max_depth: u32,
    pub validate: bool,
    pub scope: ScopeMode,
    /// 会话级超时（秒），0 表示不限
    pub session_timeout_secs: u64,
    /// 空表示全部工具
    pub tools: Vec<String>,
    pub skip_wordlist: bool,
    pub wordlist: Option<PathBuf>,
}

impl Default for ReconSection {
    fn default() -> Self {
        Self {
            recursive: false,
            max_depth: 1,
            validate: true,
            scope: ScopeMode::Strict,
            session_timeout_secs: 0,
            tools: Vec::new(),
            skip_wordlist: false,
            wordlist: None,
        }
    }
}

/// [concurrency] 段：两个扇出点各自的上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConcurrencySection {
    pub max_tools: usize,
    pub max_resolutions: usize,
}

impl Default for ConcurrencySection {
    fn default() -> Self {
        Self {
            max_tools: 4,
            max_resolutions: 64,
        }
    }
}

/// 解析器后端
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverKind {
    #[default]
    Massdns,
    System,
}

/// [dns] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DnsSection {
    pub resolver: ResolverKind,
    pub massdns_path: String,
    pub resolvers_file: Option<PathBuf>,
    /// 单次查询超时（秒）
    pub timeout_secs: u64,
    /// 解析失败主机的重试次数
    pub retries: u32,
    /// 每批主机数，0 表示整轮一批
    pub batch_size: usize,
    /// 单批请求的总预算（秒）
    pub batch_timeout_secs: u64,
}

impl Default for DnsSection {
    fn default() -> Self {
        Self {
            resolver: ResolverKind::Massdns,
            massdns_path: "massdns".to_string(),
            resolvers_file: None,
            timeout_secs: 5,
            retries: 1,
            batch_size: 0,
            batch_timeout_secs: 600,
        }
    }
}

/// [ip_mode] 段：IP 目标的证书种子
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IpModeSection {
    pub tls_certificates: bool,
    pub tls_port: u16,
    pub tls_timeout_secs: u64,
}

impl Default for IpModeSection {
    fn default() -> Self {
        Self {
            tls_certificates: true,
            tls_port: 443,
            tls_timeout_secs: 5,
        }
    }
}

/// [tools] 段：默认超时、额外搜索目录、引擎定义
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub default_timeout_secs: u64,
    pub search_paths: Vec<PathBuf>,
    /// [[tools.discovery]]：覆盖或扩展内置引擎
    pub discovery: Vec<DiscoveryTool>,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            default_timeout_secs: 300,
            search_paths: Vec::new(),
            discovery: Vec::new(),
        }
    }
}

impl AppConfig {
    /// 由配置得到一次会话的运行参数（调用方可再覆盖）
    pub fn session_options(&self) -> SessionOptions {
        let recon = &self.recon;
        SessionOptions {
            tools: recon.tools.clone(),
            recursive: recon.recursive,
            max_depth: recon.max_depth,
            validate: recon.validate,
            skip_wordlist: recon.skip_wordlist,
            wordlist: recon.wordlist.clone(),
            scope: recon.scope,
            session_timeout: (recon.session_timeout_secs > 0)
                .then(|| Duration::from_secs(recon.session_timeout_secs)),
        }
    }
}

/// 从 config 目录加载配置，环境变量 DSINT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path，则追加该文件（可覆盖前面的键）；显式指定的文件缺失或无法解析都是错误
/// 3. 最后叠加环境变量 DSINT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("DSINT")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
