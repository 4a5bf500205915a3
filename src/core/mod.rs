//! 核心层：错误分类、运行锁与工具执行槽、Waiting-For-User 标志

pub mod error;
pub mod state;
pub mod task_scheduler;

pub use error::AgentError;
pub use state::{UserWait, UserWaitGuard};
pub use task_scheduler::{RunPermit, TaskScheduler, ToolPermit};
