//! 核心层：错误与恢复、整轮重试、后台任务调度、Agent 构建

pub mod builder;
pub mod error;
pub mod recovery;
pub mod retry;
pub mod task_scheduler;

pub use builder::AgentBuilder;
pub use error::{AgentError, RecoveryAction};
pub use recovery::RecoveryEngine;
pub use retry::{RetryShell, DEFAULT_MAX_ATTEMPTS};
pub use task_scheduler::{TaskHandle, TaskScheduler};
