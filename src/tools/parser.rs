//! 输出解析器：每种输出格式一个实现，由配置 `parser = "..."` 选择
//!
//! 解析器是防御性的：不是合法主机名的行（日志、横幅、进度）直接跳过，不会中断整次运行。

use serde::Deserialize;

use crate::recon::target::{is_within, normalize_hostname};

/// 从工具输出中提取主机名
pub trait OutputParser: Send + Sync {
    /// 单行解析，返回该行中的主机名（原样，规范化交给聚合器）
    fn parse_line(&self, line: &str, target: &str) -> Vec<String>;

    /// 整段输出解析
    fn parse(&self, raw: &str, target: &str) -> Vec<String> {
        raw.lines()
            .flat_map(|line| self.parse_line(line, target))
            .collect()
    }
}

/// 配置中可选的解析器类型
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserKind {
    /// 每行一个主机名（amass / subfinder / sublist3r）
    #[default]
    Lines,
    /// dnsenum 的分段表格输出
    Dnsenum,
    /// 取每行第一列（massdns -o S 等）
    FirstColumn,
}

impl ParserKind {
    pub fn build(self) -> Box<dyn OutputParser> {
        match self {
            ParserKind::Lines => Box::new(LineParser),
            ParserKind::Dnsenum => Box::new(DnsenumParser),
            ParserKind::FirstColumn => Box::new(FirstColumnParser),
        }
    }
}

/// 整行即主机名；含空白或语法不合法的行丢弃
#[derive(Debug, Default)]
pub struct LineParser;

impl OutputParser for LineParser {
    fn parse_line(&self, line: &str, _target: &str) -> Vec<String> {
        let token = line.trim();
        if token.is_empty() || token.contains(char::is_whitespace) {
            return Vec::new();
        }
        match normalize_hostname(token) {
            Some(_) => vec![token.to_string()],
            None => Vec::new(),
        }
    }
}

/// dnsenum：只看提到目标的行，跳过 NS / MX 记录行，取以目标结尾的列
#[derive(Debug, Default)]
pub struct DnsenumParser;

impl OutputParser for DnsenumParser {
    fn parse_line(&self, line: &str, target: &str) -> Vec<String> {
        if target.is_empty() || !line.to_ascii_lowercase().contains(target) {
            return Vec::new();
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.iter().any(|t| *t == "NS" || *t == "MX") {
            return Vec::new();
        }
        tokens
            .into_iter()
            .filter(|t| {
                normalize_hostname(t)
                    .map(|name| is_within(&name, target))
                    .unwrap_or(false)
            })
            .map(|t| t.to_string())
            .collect()
    }
}

/// 第一列
#[derive(Debug, Default)]
pub struct FirstColumnParser;

impl OutputParser for FirstColumnParser {
    fn parse_line(&self, line: &str, _target: &str) -> Vec<String> {
        line.split_whitespace()
            .next()
            .filter(|t| normalize_hostname(t).is_some())
            .map(|t| vec![t.to_string()])
            .unwrap_or_default()
    }
}
