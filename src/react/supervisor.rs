//! Supervisor：改写目标、驱动 Worker、核验最终答案
//!
//! 使用独立于 Worker 的会话（不开放工具）。核验回复含 YES 视为通过，其余一律不通过（含超时与出错），
//! 不通过时向会话索取修正意见作为 Worker 的下一条消息。execute_task 永不返回错误，只返回可读字符串。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::SupervisorSection;
use crate::llm::{ChatSession, LlmClient, OutboundMessage};
use crate::react::events::preview;
use crate::react::prompts::{self, FALLBACK_FEEDBACK};
use crate::react::{AgentEvent, Continuation, MessageHandler, Worker};

pub const TASK_COMPLETED: &str = "Agent execution flow completed, overseen by supervisor.";
pub const SESSION_UNAVAILABLE: &str =
    "Error: Supervisor chat could not be initialized. Aborting task.";

type Session = Option<Box<dyn ChatSession>>;

/// Supervisor：持有 Worker 与自己的会话
pub struct Supervisor {
    llm: Arc<dyn LlmClient>,
    worker: Worker,
    session: Session,
    verify_timeout: Duration,
    event_tx: Option<mpsc::UnboundedSender<AgentEvent>>,
}

impl Supervisor {
    pub fn new(llm: Arc<dyn LlmClient>, worker: Worker) -> Self {
        Self {
            llm,
            worker,
            session: None,
            verify_timeout: Duration::from_secs(60),
            event_tx: None,
        }
    }

    pub fn with_config(mut self, cfg: &SupervisorSection) -> Self {
        self.verify_timeout = Duration::from_secs(cfg.verify_timeout_secs);
        self
    }

    pub fn with_verify_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = timeout;
        self
    }

    pub fn with_events(mut self, tx: mpsc::UnboundedSender<AgentEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// 首次使用时建立会话；失败时保持 None，下次再试
    async fn ensure_session(&mut self) -> bool {
        if self.session.is_none() {
            match self.llm.create_session(&[]).await {
                Ok(s) => {
                    tracing::debug!("supervisor session initialized");
                    self.session = Some(s);
                }
                Err(e) => tracing::warn!(error = %e, "supervisor session unavailable"),
            }
        }
        self.session.is_some()
    }

    /// 改写目标；会话不可用或调用失败时原样返回
    pub async fn optimize_prompt(&mut self, goal: &str) -> String {
        if !self.ensure_session().await {
            return goal.to_string();
        }
        let optimized = optimize(&mut self.session, goal).await;
        emit(&self.event_tx, AgentEvent::PromptOptimized {
            prompt: optimized.clone(),
        });
        optimized
    }

    pub async fn verify_answer(&mut self, answer: &str, goal: &str) -> bool {
        self.ensure_session().await;
        verify(&mut self.session, answer, goal, self.verify_timeout, &self.event_tx).await
    }

    pub async fn get_feedback(&mut self, answer: &str, goal: &str) -> String {
        self.ensure_session().await;
        feedback(&mut self.session, answer, goal).await
    }

    /// 执行任务并返回结果描述
    pub async fn execute_task(&mut self, goal: &str) -> String {
        if !self.ensure_session().await {
            return SESSION_UNAVAILABLE.to_string();
        }
        let optimized = self.optimize_prompt(goal).await;
        tracing::info!("starting worker with optimized prompt");

        let mut review = Review {
            session: &mut self.session,
            goal,
            verify_timeout: self.verify_timeout,
            event_tx: &self.event_tx,
        };
        match self.worker.run(&optimized, &mut review).await {
            Ok(()) => {
                tracing::info!("worker finished under supervision");
                TASK_COMPLETED.to_string()
            }
            Err(e) => {
                tracing::error!(error = %e, "agent execution failed");
                format!("Error: Agent execution failed - {e}")
            }
        }
    }
}

/// execute_task 期间交给 Worker 的回调
struct Review<'a> {
    session: &'a mut Session,
    goal: &'a str,
    verify_timeout: Duration,
    event_tx: &'a Option<mpsc::UnboundedSender<AgentEvent>>,
}

#[async_trait]
impl MessageHandler for Review<'_> {
    async fn on_message(&mut self, text: &str, is_final: bool) -> Continuation {
        if !is_final {
            tracing::debug!(message = %preview(text, 200), "agent message");
            return Continuation::Continue;
        }
        tracing::info!("agent reported final answer, verifying");
        if verify(&mut *self.session, text, self.goal, self.verify_timeout, self.event_tx).await {
            return Continuation::Stop;
        }
        let fb = feedback(&mut *self.session, text, self.goal).await;
        tracing::info!(feedback = %preview(&fb, 200), "final answer rejected");
        Continuation::Feedback(fb)
    }
}

fn emit(tx: &Option<mpsc::UnboundedSender<AgentEvent>>, event: AgentEvent) {
    if let Some(tx) = tx {
        let _ = tx.send(event);
    }
}

async fn ask(session: &mut Session, prompt: String) -> Option<String> {
    let s = session.as_mut()?;
    match s.send(OutboundMessage::Text(prompt)).await {
        Ok(resp) => resp.text().map(String::from),
        Err(e) => {
            tracing::warn!(error = %e, "supervisor request failed");
            None
        }
    }
}

async fn optimize(session: &mut Session, goal: &str) -> String {
    match ask(session, prompts::optimize_prompt(goal)).await {
        Some(text) => text.trim().to_string(),
        None => {
            tracing::warn!("prompt optimization failed, using original goal");
            goal.to_string()
        }
    }
}

/// 回复含 YES 即通过；含 NO、不明确、超时或出错都视为不通过
async fn verify(
    session: &mut Session,
    answer: &str,
    goal: &str,
    timeout: Duration,
    events: &Option<mpsc::UnboundedSender<AgentEvent>>,
) -> bool {
    let reply = tokio::time::timeout(timeout, ask(session, prompts::verify_answer(answer, goal)))
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    let verdict = reply.to_uppercase();
    let satisfied = if verdict.contains("YES") {
        true
    } else if verdict.contains("NO") {
        tracing::info!(reason = %preview(&reply, 200), "verification failed");
        false
    } else {
        tracing::warn!("verification inconclusive");
        false
    };
    emit(events, AgentEvent::Verification { satisfied, reply });
    satisfied
}

async fn feedback(session: &mut Session, answer: &str, goal: &str) -> String {
    ask(session, prompts::feedback_for_agent(answer, goal))
        .await
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| FALLBACK_FEEDBACK.to_string())
}
