//! 侦察数据模型：RawFinding、SubdomainRecord、IpRecord、工具运行报告

use std::collections::BTreeSet;
use std::net::IpAddr;

use serde::Serialize;

/// 单个工具输出的一行原始发现（解析后未规范化的主机名 + 工具名 + 原始行）
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFinding {
    pub hostname: String,
    pub tool: String,
    pub line: String,
}

impl RawFinding {
    pub fn new(hostname: impl Into<String>, tool: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            tool: tool.into(),
            line: line.into(),
        }
    }
}

/// 解析状态：unknown → live 单向；unknown → dead 可在后续验证中被 live 覆盖
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    #[default]
    Unknown,
    Live,
    Dead,
}

/// 规范化主机名对应的唯一记录
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubdomainRecord {
    pub hostname: String,
    /// 贡献该名字的工具集合，只增不减
    pub sources: BTreeSet<String>,
    pub status: ResolutionStatus,
    pub ips: BTreeSet<IpAddr>,
    /// 首次发现时的递归深度（0 = 种子轮）
    pub depth: u32,
}

impl SubdomainRecord {
    pub fn new(hostname: impl Into<String>, depth: u32) -> Self {
        Self {
            hostname: hostname.into(),
            sources: BTreeSet::new(),
            status: ResolutionStatus::Unknown,
            ips: BTreeSet::new(),
            depth,
        }
    }

    /// 添加来源工具；返回是否为新来源
    pub fn add_source(&mut self, tool: &str) -> bool {
        if self.sources.contains(tool) {
            return false;
        }
        self.sources.insert(tool.to_string())
    }

    pub fn is_live(&self) -> bool {
        self.status == ResolutionStatus::Live
    }

    /// 写入解析结果：有地址则 live（地址并入），无地址时仅 unknown 转为 dead，live 不回退
    pub fn apply_resolution(&mut self, ips: &BTreeSet<IpAddr>) {
        if ips.is_empty() {
            if self.status == ResolutionStatus::Unknown {
                self.status = ResolutionStatus::Dead;
            }
            return;
        }
        self.status = ResolutionStatus::Live;
        self.ips.extend(ips.iter().copied());
    }
}

/// IP → 解析到该 IP 的主机名集合（由 live 记录整体重建）
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IpRecord {
    pub ip: IpAddr,
    pub hostnames: BTreeSet<String>,
}

/// 单次工具调用的结局
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ToolStatus {
    Succeeded,
    /// 找不到可执行文件，跳过
    Unavailable(String),
    /// 超出预算；部分输出仍已合并
    TimedOut,
    /// 非零退出或输出不可用
    Failed(String),
    /// 会话被取消时仍在运行
    Interrupted,
}

impl ToolStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolStatus::Succeeded)
    }

    /// 结果是否完整（超时与中断都算不完整）
    pub fn is_complete(&self) -> bool {
        !matches!(self, ToolStatus::TimedOut | ToolStatus::Interrupted)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ToolStatus::Succeeded => "ok",
            ToolStatus::Unavailable(_) => "unavailable",
            ToolStatus::TimedOut => "timeout",
            ToolStatus::Failed(_) => "error",
            ToolStatus::Interrupted => "interrupted",
        }
    }
}

/// 一次 (工具, 目标, 深度) 调用的报告
#[derive(Clone, Debug, Serialize)]
pub struct ToolRunReport {
    pub tool: String,
    pub target: String,
    pub depth: u32,
    pub status: ToolStatus,
    /// 工具原始输出中解析出的发现数（合并前）
    pub findings: usize,
    pub duration_ms: u64,
}
