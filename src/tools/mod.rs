//! 发现工具层：适配器接口、外部命令封装、输出解析、并发执行

pub mod builtin;
pub mod command;
pub mod error;
pub mod locate;
pub mod parser;
pub mod process;
pub mod registry;
pub mod runner;
pub mod wordlist;

pub use builtin::{builtin_tools, merge_tools};
pub use command::{CommandTool, DiscoveryTool};
pub use error::ToolError;
pub use parser::{OutputParser, ParserKind};
pub use registry::{DiscoveryContext, ToolAdapter, ToolRegistry};
pub use runner::{ToolRun, ToolRunner};
pub use wordlist::{WordlistTool, DEFAULT_WORDLIST, WORDLIST_TOOL};
