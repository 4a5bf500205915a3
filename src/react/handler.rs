//! Worker 消息回调：决定停止、继续或带着修正意见继续

use std::sync::Arc;

use async_trait::async_trait;

use crate::ui::Terminal;

/// 回调的决定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// 结束本次运行
    Stop,
    /// 继续（中间消息之后发送 continue）
    Continue,
    /// 把这段文本作为下一条消息发给模型
    Feedback(String),
}

/// Worker 在收到模型文本（is_final = false）或 finish 总结（is_final = true）时调用
#[async_trait]
pub trait MessageHandler: Send {
    async fn on_message(&mut self, text: &str, is_final: bool) -> Continuation;
}

/// 无 Supervisor 时的处理器：把消息交给操作员阅读，最终答案由 finish 工具的确认提示决定去留
pub struct OperatorHandler {
    terminal: Arc<dyn Terminal>,
}

impl OperatorHandler {
    pub fn new(terminal: Arc<dyn Terminal>) -> Self {
        Self { terminal }
    }
}

#[async_trait]
impl MessageHandler for OperatorHandler {
    async fn on_message(&mut self, text: &str, is_final: bool) -> Continuation {
        let label = if is_final { "Final answer" } else { "Agent" };
        self.terminal.print_line(&format!("[ratpi] {label}:\n{text}"));
        Continuation::Continue
    }
}
