//! Ratpi - 终端里的编程助手
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类、运行锁与工具执行槽、Waiting-For-User 标志
//! - **llm**: 对话通道抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **observability**: tracing 初始化
//! - **react**: Worker 主循环、Supervisor、消息回调
//! - **tools**: 工具目录与执行器（文件、Shell、用户输入、环境快照）
//! - **ui**: 终端交互、spinner、过程叙述

pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod react;
pub mod tools;
pub mod ui;

pub use crate::config::{load_config, AppConfig};
pub use crate::core::AgentError;
pub use react::{Supervisor, Worker};
