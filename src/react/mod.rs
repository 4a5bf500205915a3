//! 认知层：Worker 主循环、Supervisor、消息回调、过程事件与提示词

pub mod events;
pub mod handler;
pub mod loop_;
pub mod prompts;
pub mod supervisor;

pub use events::AgentEvent;
pub use handler::{Continuation, MessageHandler, OperatorHandler};
pub use loop_::Worker;
pub use supervisor::Supervisor;
