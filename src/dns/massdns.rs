//! massdns 批量解析
//!
//! 整批主机名写入临时文件，一次运行 `massdns -r <resolvers> -t A -s <并发> -o S -w /dev/stdout <file>`，
//! 逐行解析简单文本输出（`name. A ip` / `name. AAAA ip` / `name. CNAME alias.` / `arpa. PTR name.`）。
//! CNAME 链在应答内部跟随（有跳数上限），别名最终地址归到被查询的名字上。

use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::Write;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

use crate::dns::{arpa_name, BatchResolution, DnsError, HostResolution, Resolver};
use crate::tools::locate::{expand_home, locate_binary};
use crate::tools::process::{run_streaming, ProcessEnd};

/// 解析器文件缺失时使用的公共解析器
pub const DEFAULT_RESOLVERS: &[&str] = &["1.1.1.1", "8.8.8.8", "9.9.9.9", "208.67.222.222"];

const MAX_CNAME_HOPS: usize = 8;

/// massdns 自身的默认并发
const DEFAULT_CONCURRENCY: usize = 10_000;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Answer {
    Addr(IpAddr),
    Cname(String),
    Ptr(String),
}

/// name（小写、无尾点）→ 应答记录
type AnswerTable = HashMap<String, Vec<Answer>>;

fn clean_name(raw: &str) -> String {
    raw.trim_end_matches('.').to_ascii_lowercase()
}

/// 解析 `-o S` 输出；无法识别的行跳过
fn parse_simple_output(lines: &[String]) -> AnswerTable {
    let mut table: AnswerTable = HashMap::new();
    for line in lines {
        let mut parts = line.split_whitespace();
        let (Some(name), Some(rtype), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
            continue;
        };
        let answer = match rtype {
            "A" | "AAAA" => match value.parse::<IpAddr>() {
                Ok(ip) => Answer::Addr(ip),
                Err(_) => continue,
            },
            "CNAME" => Answer::Cname(clean_name(value)),
            "PTR" => Answer::Ptr(value.trim_end_matches('.').to_string()),
            _ => continue,
        };
        let entry = table.entry(clean_name(name)).or_default();
        if !entry.contains(&answer) {
            entry.push(answer);
        }
    }
    table
}

/// 从 name 出发沿 CNAME 收集地址
fn follow_addresses(name: &str, table: &AnswerTable) -> BTreeSet<IpAddr> {
    let mut addrs = BTreeSet::new();
    let mut visited = HashSet::new();
    let mut frontier = vec![name.to_string()];
    for _ in 0..=MAX_CNAME_HOPS {
        let mut next = Vec::new();
        for current in frontier.drain(..) {
            if !visited.insert(current.clone()) {
                continue;
            }
            for answer in table.get(&current).into_iter().flatten() {
                match answer {
                    Answer::Addr(ip) => {
                        addrs.insert(*ip);
                    }
                    Answer::Cname(alias) => next.push(alias.clone()),
                    Answer::Ptr(_) => {}
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    addrs
}

/// massdns 进程封装
#[derive(Clone, Debug)]
pub struct MassDnsResolver {
    program: String,
    search_paths: Vec<PathBuf>,
    resolvers_file: Option<PathBuf>,
    /// 单次进程运行的总预算
    timeout: Duration,
    /// 同时在途的查询数（massdns `-s`）
    concurrency: usize,
}

impl MassDnsResolver {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            search_paths: Vec::new(),
            resolvers_file: None,
            timeout,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = paths;
        self
    }

    pub fn with_resolvers_file(mut self, path: Option<PathBuf>) -> Self {
        self.resolvers_file = path;
        self
    }

    /// 配置的解析器文件存在则直接用，否则写一份默认列表到临时文件（随返回值存活）
    fn resolvers(&self) -> Result<(PathBuf, Option<NamedTempFile>), DnsError> {
        if let Some(path) = &self.resolvers_file {
            let path = expand_home(path);
            if path.is_file() {
                return Ok((path, None));
            }
            tracing::warn!(path = %path.display(), "resolvers file missing, using default public resolvers");
        }
        let file = write_temp_lines(DEFAULT_RESOLVERS.iter().copied())?;
        Ok((file.path().to_path_buf(), Some(file)))
    }

    /// 运行一次 massdns；返回应答表与是否因超时被截断
    async fn query(&self, names: &[String], record_type: &str) -> Result<(AnswerTable, bool), DnsError> {
        let program = locate_binary(&self.program, &self.search_paths)
            .ok_or_else(|| DnsError::Unavailable(format!("{} not found", self.program)))?;
        let input = write_temp_lines(names.iter().map(String::as_str))?;
        let (resolvers, _default_resolvers) = self.resolvers()?;

        let args = massdns_args(&resolvers, record_type, self.concurrency, input.path());
        tracing::debug!(program = %program.display(), names = names.len(), record_type, "massdns run");

        let output = run_streaming(&program, &args, self.timeout, &CancellationToken::new())
            .await
            .map_err(|e| DnsError::Failed(format!("spawn massdns: {e}")))?;

        let truncated = match output.end {
            ProcessEnd::Exited { success: true, .. } => false,
            ProcessEnd::Exited { code, stderr, .. } => {
                return Err(DnsError::Failed(format!("massdns exit {:?}: {}", code, stderr.trim())));
            }
            ProcessEnd::TimedOut | ProcessEnd::Cancelled => {
                tracing::warn!(timeout_secs = self.timeout.as_secs(), "massdns run cut short, keeping partial answers");
                true
            }
        };
        Ok((parse_simple_output(&output.lines), truncated))
    }
}

fn massdns_args(resolvers: &Path, record_type: &str, concurrency: usize, input: &Path) -> Vec<String> {
    vec![
        "-r".to_string(),
        resolvers.to_string_lossy().to_string(),
        "-t".to_string(),
        record_type.to_string(),
        "-s".to_string(),
        concurrency.to_string(),
        "-o".to_string(),
        "S".to_string(),
        "-w".to_string(),
        "/dev/stdout".to_string(),
        input.to_string_lossy().to_string(),
    ]
}

fn write_temp_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Result<NamedTempFile, DnsError> {
    let mut file = NamedTempFile::new().map_err(|e| DnsError::Failed(format!("temp file: {e}")))?;
    for line in lines {
        writeln!(file, "{line}").map_err(|e| DnsError::Failed(format!("temp file: {e}")))?;
    }
    file.flush().map_err(|e| DnsError::Failed(format!("temp file: {e}")))?;
    Ok(file)
}

#[async_trait]
impl Resolver for MassDnsResolver {
    fn name(&self) -> &str {
        "massdns"
    }

    async fn resolve_batch(&self, hosts: &[String]) -> Result<BatchResolution, DnsError> {
        if hosts.is_empty() {
            return Ok(BatchResolution::new());
        }
        let (table, truncated) = self.query(hosts, "A").await?;
        Ok(hosts
            .iter()
            .map(|host| {
                let key = clean_name(host);
                let addrs = follow_addresses(&key, &table);
                let resolution = if !addrs.is_empty() {
                    HostResolution::Addresses(addrs)
                } else if truncated && !table.contains_key(&key) {
                    HostResolution::Failed("massdns run cut short".to_string())
                } else {
                    HostResolution::NoRecords
                };
                (host.clone(), resolution)
            })
            .collect())
    }

    async fn reverse(&self, ip: IpAddr) -> Result<Vec<String>, DnsError> {
        let arpa = arpa_name(ip);
        let (table, _) = self.query(std::slice::from_ref(&arpa), "PTR").await?;
        Ok(table
            .get(&arpa)
            .into_iter()
            .flatten()
            .filter_map(|answer| match answer {
                Answer::Ptr(name) => Some(name.clone()),
                _ => None,
            })
            .collect())
    }
}
