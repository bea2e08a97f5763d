//! 发现工具注册表
//!
//! 所有发现引擎实现 ToolAdapter trait（name / default_timeout / discover），由 ToolRegistry 按名注册与查找，
//! ToolRunner 在调用时加超时、并发限制，并把失败统一转为 ToolStatus。

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::ReconError;
use crate::recon::RawFinding;
use crate::tools::ToolError;

/// 单次调用的上下文：超时预算、字典路径（原样转交）、取消令牌
#[derive(Clone, Debug)]
pub struct DiscoveryContext {
    pub timeout: Duration,
    pub wordlist: Option<PathBuf>,
    pub cancel: CancellationToken,
}

impl DiscoveryContext {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            wordlist: None,
            cancel: CancellationToken::new(),
        }
    }
}

/// 发现工具 trait：对一个目标做一次枚举，返回原始发现
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    /// 工具名称（即 provenance 中记录的工具身份）
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// 未被覆盖时使用的超时预算
    fn default_timeout(&self) -> Duration;

    /// 执行枚举；超时/中断时在错误中携带部分发现
    async fn discover(&self, target: &str, ctx: &DiscoveryContext) -> Result<Vec<RawFinding>, ToolError>;
}

/// 工具注册表：按名称存储 Arc<dyn ToolAdapter>，名称有序，选择结果确定
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn ToolAdapter>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工具；同名工具会被替换（配置覆盖内置）
    pub fn register(&mut self, tool: impl ToolAdapter + 'static) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn ToolAdapter>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::debug!(tool = %name, "tool definition replaced");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolAdapter>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// 返回 (name, description) 列表
    pub fn tool_descriptions(&self) -> Vec<(String, String)> {
        self.tools
            .iter()
            .map(|(name, tool)| (name.clone(), tool.description().to_string()))
            .collect()
    }

    /// 按名称选择子集；空列表表示全部。`exclude` 中的工具被直接剔除（如跳过字典爆破）。
    /// 未注册的名字是输入错误，在任何发现开始前报告。
    pub fn select(&self, names: &[String], exclude: &[&str]) -> Result<Vec<String>, ReconError> {
        let selected: Vec<String> = if names.is_empty() {
            self.tool_names()
        } else {
            let mut picked = Vec::new();
            for name in names {
                let name = name.trim().to_lowercase();
                if !self.tools.contains_key(&name) {
                    return Err(ReconError::UnknownTool(name));
                }
                if !picked.contains(&name) {
                    picked.push(name);
                }
            }
            picked
        };
        Ok(selected
            .into_iter()
            .filter(|n| !exclude.contains(&n.as_str()))
            .collect())
    }
}
