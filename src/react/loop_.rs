//! Worker 主循环
//!
//! 首条消息 → [模型回复 → 工具执行 → 批量回传]* → finish 总结交给 MessageHandler。
//! 批次按请求顺序执行，finish 之前的调用先执行完，再交给 MessageHandler 判断。
//! 整个 run 持有运行锁（排队、FIFO）；锁与 spinner 在任何退出路径上都会释放。
//! 通道错误不吞掉，直接返回给调用方。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::AgentSection;
use crate::core::AgentError;
use crate::llm::{
    ChatSession, LlmClient, ModelResponse, OutboundMessage, ToolCallRequest, ToolResultMessage,
};
use crate::react::events::preview;
use crate::react::prompts::{agent_first_message, AGENT_INSTRUCTIONS, CONTINUE_NUDGE};
use crate::react::{AgentEvent, Continuation, MessageHandler};
use crate::tools::{FinishPayload, ToolExecutor, ToolName};
use crate::ui::Spinner;

/// Observation 预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;

/// 一轮处理后的去向
enum Step {
    Send(OutboundMessage),
    Stop,
}

/// Worker：驱动单个目标直到 MessageHandler 叫停
pub struct Worker {
    llm: Arc<dyn LlmClient>,
    executor: Arc<ToolExecutor>,
    spinner: Arc<Spinner>,
    debounce: Duration,
    system_prompt: String,
    event_tx: Option<mpsc::UnboundedSender<AgentEvent>>,
}

impl Worker {
    pub fn new(llm: Arc<dyn LlmClient>, executor: Arc<ToolExecutor>, spinner: Arc<Spinner>) -> Self {
        Self {
            llm,
            executor,
            spinner,
            debounce: Duration::from_millis(1000),
            system_prompt: AGENT_INSTRUCTIONS.to_string(),
            event_tx: None,
        }
    }

    /// 应用 [agent] 配置：debounce 与系统提示覆盖
    pub fn with_config(mut self, cfg: &AgentSection) -> Self {
        self.debounce = Duration::from_millis(cfg.debounce_ms);
        if let Some(prompt) = cfg.system_prompt.as_ref().filter(|p| !p.trim().is_empty()) {
            self.system_prompt = prompt.clone();
        }
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_events(mut self, tx: mpsc::UnboundedSender<AgentEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }

    /// 执行一个目标；同一进程内的其他 run 在此排队
    pub async fn run(&self, goal: &str, handler: &mut dyn MessageHandler) -> Result<(), AgentError> {
        let _permit = self.executor.scheduler().acquire_run().await;
        tracing::info!(goal = %preview(goal, 120), "worker run started");

        let result = self.drive(goal, handler).await;
        self.spinner.stop();

        let (prompt_tokens, completion_tokens, total_tokens) = self.llm.token_usage();
        tracing::info!(prompt_tokens, completion_tokens, total_tokens, "worker run ended");
        self.emit(AgentEvent::TokenUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens,
        });
        if let Err(e) = &result {
            tracing::warn!(error = %e, "worker run aborted");
            self.emit(AgentEvent::Error { text: e.to_string() });
        }
        result
    }

    async fn drive(&self, goal: &str, handler: &mut dyn MessageHandler) -> Result<(), AgentError> {
        let mut session = self
            .llm
            .create_session(self.executor.registry().specs())
            .await?;
        let first = OutboundMessage::text(agent_first_message(&self.system_prompt, goal));
        let mut response = self.send(session.as_mut(), first).await?;

        loop {
            self.executor.user_wait().wait_until_clear().await;
            match self.step(&response, handler).await {
                Step::Stop => return Ok(()),
                Step::Send(next) => response = self.send(session.as_mut(), next).await?,
            }
        }
    }

    async fn send(
        &self,
        session: &mut dyn ChatSession,
        message: OutboundMessage,
    ) -> Result<ModelResponse, AgentError> {
        self.spinner.start("Waiting for model answer");
        self.emit(AgentEvent::Thinking);
        tracing::debug!(message = ?message, "sending to model");
        let response = session.send(message).await;
        self.spinner.stop();
        let response = response?;
        tracing::debug!(response = ?response, "model response");
        Ok(response)
    }

    async fn step(&self, response: &ModelResponse, handler: &mut dyn MessageHandler) -> Step {
        let calls = response.calls();

        if !calls.is_empty() {
            if let Some(text) = response.text() {
                self.emit(AgentEvent::ModelText {
                    text: text.to_string(),
                });
            }
            let asks_user = calls
                .iter()
                .any(|c| ToolName::parse(&c.name) == Some(ToolName::AskUserInput));
            if asks_user {
                self.spinner.stop();
            }

            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                if let Some(finish) = FinishPayload::completed(call) {
                    // 同批次中排在前面的调用都已执行；输入请求未结束前不交给 handler
                    self.executor.user_wait().wait_until_clear().await;
                    self.spinner.succeed("Final answer generated.");
                    self.emit(AgentEvent::FinalAnswer {
                        summary: finish.summary.clone(),
                    });
                    match handler.on_message(&finish.summary, true).await {
                        Continuation::Stop => return Step::Stop,
                        Continuation::Feedback(feedback) => {
                            self.emit(AgentEvent::Feedback {
                                text: feedback.clone(),
                            });
                            if results.is_empty() {
                                return Step::Send(OutboundMessage::Text(feedback));
                            }
                            return Step::Send(OutboundMessage::Feedback {
                                results,
                                text: feedback,
                            });
                        }
                        // 交给 finish 工具本身（操作员确认）
                        Continuation::Continue => {}
                    }
                }
                results.push(self.execute(call).await);
            }

            if asks_user {
                self.executor.user_wait().wait_until_clear().await;
            } else {
                tokio::time::sleep(self.debounce).await;
            }
            return Step::Send(OutboundMessage::ToolResults(results));
        }

        if let Some(text) = response.text() {
            self.emit(AgentEvent::ModelText {
                text: text.to_string(),
            });
            match handler.on_message(text, false).await {
                Continuation::Stop => return Step::Stop,
                Continuation::Feedback(feedback) => {
                    self.emit(AgentEvent::Feedback {
                        text: feedback.clone(),
                    });
                    tokio::time::sleep(self.debounce).await;
                    return Step::Send(OutboundMessage::Text(feedback));
                }
                Continuation::Continue => {}
            }
        }

        self.emit(AgentEvent::Nudge);
        tokio::time::sleep(self.debounce).await;
        Step::Send(OutboundMessage::text(CONTINUE_NUDGE))
    }

    async fn execute(&self, call: &ToolCallRequest) -> ToolResultMessage {
        self.emit(AgentEvent::ToolCall {
            tool: call.name.clone(),
            call_id: call.id.clone(),
            args: call.args.clone(),
        });
        let result = self.executor.execute(call).await;
        let payload = result.to_payload();
        self.emit(AgentEvent::Observation {
            tool: call.name.clone(),
            call_id: call.id.clone(),
            success: result.success,
            preview: preview(&payload.to_string(), OBSERVATION_PREVIEW_CHARS),
        });
        ToolResultMessage {
            call_id: call.id.clone(),
            name: call.name.clone(),
            payload,
        }
    }
}
