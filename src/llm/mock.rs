//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 所有会话共用同一份剧本：每次 send 按顺序弹出一条预置回复，并记录发出的消息。
//! 剧本用尽时返回 ScriptExhausted，测试据此发现多余的往返。

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::llm::{ChatSession, LlmClient, LlmError, ModelResponse, OutboundMessage};
use crate::tools::ToolSpec;

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<Result<ModelResponse, LlmError>>,
    sent: Vec<OutboundMessage>,
    sessions: Vec<usize>,
}

/// Mock 客户端：按剧本回复
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    state: Arc<Mutex<MockState>>,
    refuse_sessions: bool,
}

impl MockLlmClient {
    pub fn new<I>(script: I) -> Self
    where
        I: IntoIterator<Item = ModelResponse>,
    {
        let client = Self::default();
        for r in script {
            client.push(r);
        }
        client
    }

    /// create_session 一律失败
    pub fn failing_sessions() -> Self {
        Self {
            refuse_sessions: true,
            ..Self::default()
        }
    }

    pub fn push(&self, response: ModelResponse) {
        if let Ok(mut s) = self.state.lock() {
            s.script.push_back(Ok(response));
        }
    }

    pub fn push_error(&self, error: LlmError) {
        if let Ok(mut s) = self.state.lock() {
            s.script.push_back(Err(error));
        }
    }

    /// 按时间顺序返回所有会话发出的消息
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.state.lock().map(|s| s.sent.clone()).unwrap_or_default()
    }

    /// 发出的纯文本消息
    pub fn sent_texts(&self) -> Vec<String> {
        self.sent()
            .iter()
            .filter_map(|m| m.as_text().map(String::from))
            .collect()
    }

    /// 每个已创建会话拿到的工具数量
    pub fn sessions(&self) -> Vec<usize> {
        self.state
            .lock()
            .map(|s| s.sessions.clone())
            .unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.state.lock().map(|s| s.script.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn create_session(&self, tools: &[ToolSpec]) -> Result<Box<dyn ChatSession>, LlmError> {
        if self.refuse_sessions {
            return Err(LlmError::SessionUnavailable("mock refuses sessions".to_string()));
        }
        if let Ok(mut s) = self.state.lock() {
            s.sessions.push(tools.len());
        }
        Ok(Box::new(MockSession {
            state: self.state.clone(),
        }))
    }
}

struct MockSession {
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl ChatSession for MockSession {
    async fn send(&mut self, message: OutboundMessage) -> Result<ModelResponse, LlmError> {
        let mut s = self
            .state
            .lock()
            .map_err(|_| LlmError::SessionUnavailable("mock state poisoned".to_string()))?;
        s.sent.push(message);
        s.script.pop_front().unwrap_or(Err(LlmError::ScriptExhausted))
    }
}
