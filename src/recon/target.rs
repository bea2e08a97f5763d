//! 侦察目标与主机名规范化
//!
//! Target 有两种互斥模式：域名侦察与 IP 侦察（IP 模式下不做域名范围过滤）。
//! normalize_hostname 统一做小写、去尾点、去通配符前缀与语法校验；ScopeRule 决定某个名字是否属于目标。

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::ReconError;

const MAX_HOSTNAME_LEN: usize = 253;

static HOSTNAME_RE: OnceLock<Regex> = OnceLock::new();

fn hostname_re() -> &'static Regex {
    // 标签允许下划线（_dmarc 等），顶级标签必须以字母开头，因此纯 IPv4 不会匹配
    HOSTNAME_RE.get_or_init(|| {
        Regex::new(
            r"^(?:[a-z0-9_](?:[a-z0-9_-]{0,61}[a-z0-9_])?\.)+[a-z](?:[a-z0-9-]{0,61}[a-z0-9])?$",
        )
        .unwrap()
    })
}

/// 侦察目标：域名或 IP 地址
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum Target {
    Domain(String),
    Ip(IpAddr),
}

impl Target {
    /// 解析用户输入；IP 自动识别，否则按域名规范化并校验
    pub fn parse(input: &str) -> Result<Self, ReconError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ReconError::InvalidTarget("empty target".to_string()));
        }
        if let Ok(ip) = trimmed.parse::<IpAddr>() {
            return Ok(Target::Ip(ip));
        }
        normalize_hostname(trimmed)
            .map(Target::Domain)
            .ok_or_else(|| ReconError::InvalidTarget(trimmed.to_string()))
    }

    pub fn domain(&self) -> Option<&str> {
        match self {
            Target::Domain(d) => Some(d),
            Target::Ip(_) => None,
        }
    }
}

impl FromStr for Target {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Target::parse(s)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Domain(d) => write!(f, "{d}"),
            Target::Ip(ip) => write!(f, "{ip}"),
        }
    }
}

/// 规范化主机名：trim、小写、去掉尾部 `.` 与前导 `*.`，校验语法；非法返回 None
///
/// 对同一输入重复调用结果不变（幂等）。
pub fn normalize_hostname(raw: &str) -> Option<String> {
    let mut name = raw.trim().to_ascii_lowercase();
    while name.ends_with('.') {
        name.pop();
    }
    while let Some(rest) = name.strip_prefix("*.") {
        name = rest.to_string();
    }
    if name.is_empty() || name.len() > MAX_HOSTNAME_LEN {
        return None;
    }
    if hostname_re().is_match(&name) {
        Some(name)
    } else {
        None
    }
}

/// 范围匹配模式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeMode {
    /// 严格后缀匹配：等于目标域名或以 `.目标域名` 结尾
    #[default]
    Strict,
    /// 宽松：与目标共享同一基础域名（最后两个标签）即视为范围内
    BaseDomain,
}

/// 范围规则：由目标与模式构造，IP 模式下接受一切合法主机名
#[derive(Clone, Debug)]
pub struct ScopeRule {
    root: Option<String>,
}

impl ScopeRule {
    pub fn new(target: &Target, mode: ScopeMode) -> Self {
        let root = target.domain().map(|d| match mode {
            ScopeMode::Strict => d.to_string(),
            ScopeMode::BaseDomain => base_domain(d).to_string(),
        });
        Self { root }
    }

    /// 不做任何范围限制（IP 侦察模式）
    pub fn unrestricted() -> Self {
        Self { root: None }
    }

    /// name 须已规范化
    pub fn contains(&self, name: &str) -> bool {
        match &self.root {
            None => true,
            Some(root) => is_within(name, root),
        }
    }
}

/// name 等于 root 或是其子域名（按标签边界，`notexample.com` 不属于 `example.com`）
pub fn is_within(name: &str, root: &str) -> bool {
    if name == root {
        return true;
    }
    name.len() > root.len()
        && name.ends_with(root)
        && name.as_bytes()[name.len() - root.len() - 1] == b'.'
}

/// 取最后两个标签作为基础域名
pub fn base_domain(name: &str) -> &str {
    let mut dots = name.rmatch_indices('.');
    dots.next();
    match dots.next() {
        Some((idx, _)) => &name[idx + 1..],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_hostname() {
        assert_eq!(normalize_hostname("WWW.Example.COM."), Some("www.example.com".into()));
        assert_eq!(normalize_hostname("  api.example.com  "), Some("api.example.com".into()));
        assert_eq!(normalize_hostname("*.cdn.example.com"), Some("cdn.example.com".into()));
        assert_eq!(normalize_hostname("_dmarc.example.com"), Some("_dmarc.example.com".into()));

        assert_eq!(normalize_hostname(""), None);
        assert_eq!(normalize_hostname("localhost"), None);
        assert_eq!(normalize_hostname("10.0.0.1"), None);
        assert_eq!(normalize_hostname("[INF] Loading provider"), None);
        assert_eq!(normalize_hostname("-bad.example.com"), None);
        assert_eq!(normalize_hostname("a..example.com"), None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_hostname("Mail.EXAMPLE.com.").unwrap();
        assert_eq!(normalize_hostname(&once), Some(once.clone()));
    }

    #[test]
    fn test_target_parse() {
        assert_eq!(Target::parse("Example.com").unwrap(), Target::Domain("example.com".into()));
        assert!(matches!(Target::parse("93.184.216.34"), Ok(Target::Ip(_))));
        assert!(matches!(Target::parse("::1"), Ok(Target::Ip(_))));
        assert!(matches!(Target::parse(""), Err(ReconError::InvalidTarget(_))));
        assert!(matches!(Target::parse("not a domain"), Err(ReconError::InvalidTarget(_))));
        assert!(matches!(Target::parse("999.1.1.1"), Err(ReconError::InvalidTarget(_))));
    }

    #[test]
    fn test_strict_scope() {
        let target = Target::parse("example.com").unwrap();
        let scope = ScopeRule::new(&target, ScopeMode::Strict);
        assert!(scope.contains("example.com"));
        assert!(scope.contains("a.b.example.com"));
        assert!(!scope.contains("notexample.com"));
        assert!(!scope.contains("example.com.cdn.net"));
        assert!(!scope.contains("other.org"));
    }

    #[test]
    fn test_base_domain_scope() {
        let target = Target::parse("dev.example.com").unwrap();
        let strict = ScopeRule::new(&target, ScopeMode::Strict);
        let loose = ScopeRule::new(&target, ScopeMode::BaseDomain);
        assert!(!strict.contains("www.example.com"));
        assert!(loose.contains("www.example.com"));
        assert!(!loose.contains("www.example.org"));
    }

    #[test]
    fn test_ip_target_is_unrestricted() {
        let target = Target::parse("1.2.3.4").unwrap();
        let scope = ScopeRule::new(&target, ScopeMode::Strict);
        assert!(scope.contains("anything.example.net"));
        assert!(ScopeRule::unrestricted().contains("x.y.z"));
    }

    #[test]
    fn test_base_domain() {
        assert_eq!(base_domain("a.b.example.com"), "example.com");
        assert_eq!(base_domain("example.com"), "example.com");
        assert_eq!(base_domain("com"), "com");
    }
}
