//! 核心层：错误、会话监管、任务调度、优雅关闭、组件构建

pub mod builder;
pub mod error;
pub mod session_supervisor;
pub mod shutdown;
pub mod task_scheduler;

pub use builder::{create_recon_builder, ReconBuilder};
pub use error::ReconError;
pub use session_supervisor::{CancelReason, SessionSupervisor};
pub use shutdown::{ShutdownManager, ShutdownReason};
pub use task_scheduler::{TaskKind, TaskScheduler};
