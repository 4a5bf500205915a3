//! OpenAI 兼容 Chat Completions 客户端
//!
//! 直接用 reqwest 调用 `{base_url}/chat/completions`，以原生 function calling 暴露工具目录。
//! 每个 OpenAiSession 维护自己的消息历史；DeepSeek 与 OpenAI 共用此实现，只是端点与模型不同。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::llm::{
    ChatSession, LlmClient, LlmError, ModelResponse, OutboundMessage, ToolCallRequest, ToolResultMessage,
};
use crate::tools::ToolSpec;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// 未被回答的工具调用在下一条文本前补上的占位结果
const NOT_EXECUTED: &str = "Tool call was not executed.";

/// Token 使用统计（累计值，跨会话共享）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

/// OpenAI 兼容客户端：持有 HTTP 客户端、端点、模型名与凭据
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    /// 累计 token 使用统计
    pub usage: TokenUsage,
}

impl OpenAiClient {
    pub fn new(
        base_url: Option<&str>,
        model: &str,
        api_key: &str,
        request_timeout: Duration,
    ) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| LlmError::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url
                .unwrap_or(OPENAI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            usage: TokenUsage::new(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn create_session(&self, tools: &[ToolSpec]) -> Result<Box<dyn ChatSession>, LlmError> {
        if self.api_key.trim().is_empty() {
            return Err(LlmError::SessionUnavailable("missing API key".to_string()));
        }
        tracing::debug!(model = %self.model, tools = tools.len(), "chat session created");
        Ok(Box::new(OpenAiSession {
            http: self.http.clone(),
            endpoint: self.endpoint(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            tools: tools.iter().map(tool_to_chat).collect(),
            conversation: Conversation::default(),
            usage: self.usage.clone(),
        }))
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }
}

/// 单个会话
pub struct OpenAiSession {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    tools: Vec<Value>,
    conversation: Conversation,
    usage: TokenUsage,
}

#[async_trait]
impl ChatSession for OpenAiSession {
    async fn send(&mut self, message: OutboundMessage) -> Result<ModelResponse, LlmError> {
        self.conversation.push_outbound(message);

        let mut body = json!({
            "model": self.model,
            "messages": self.conversation.messages,
        });
        if !self.tools.is_empty() {
            body["tools"] = json!(self.tools);
            body["tool_choice"] = json!("auto");
        }

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "chat completion failed");
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let payload: Value =
            serde_json::from_str(&text).map_err(|e| LlmError::Decode(e.to_string()))?;
        if let Some(usage) = payload.get("usage") {
            let read = |k: &str| usage.get(k).and_then(Value::as_u64).unwrap_or(0);
            self.usage.add(read("prompt_tokens"), read("completion_tokens"));
        }

        let (text, calls) = parse_chat_message(&payload)?;
        self.conversation.record_assistant(text.as_deref(), &calls);
        Ok(ModelResponse::from_parts(text, calls))
    }
}

/// 会话消息历史与尚未回答的工具调用
#[derive(Debug, Default)]
pub struct Conversation {
    pub messages: Vec<Value>,
    pending: Vec<String>,
}

impl Conversation {
    /// 追加一条发出的消息；发文本前先为未回答的调用补上占位结果，保证历史合法
    pub fn push_outbound(&mut self, message: OutboundMessage) {
        match message {
            OutboundMessage::Text(text) => {
                self.close_pending();
                self.messages.push(json!({"role": "user", "content": text}));
            }
            OutboundMessage::ToolResults(results) => {
                self.push_results(results);
                self.close_pending();
            }
            OutboundMessage::Feedback { results, text } => {
                self.push_results(results);
                self.close_pending();
                self.messages.push(json!({"role": "user", "content": text}));
            }
        }
    }

    fn push_results(&mut self, results: Vec<ToolResultMessage>) {
        for r in results {
            self.pending.retain(|id| id != &r.call_id);
            let content = match &r.payload {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            self.messages.push(json!({
                "role": "tool",
                "tool_call_id": r.call_id,
                "content": content,
            }));
        }
    }

    pub fn record_assistant(&mut self, text: Option<&str>, calls: &[ToolCallRequest]) {
        let mut msg = json!({"role": "assistant", "content": text});
        if !calls.is_empty() {
            msg["tool_calls"] = calls
                .iter()
                .map(|c| {
                    json!({
                        "id": c.id,
                        "type": "function",
                        "function": {"name": c.name, "arguments": c.args.to_string()},
                    })
                })
                .collect();
            self.pending = calls.iter().map(|c| c.id.clone()).collect();
        }
        self.messages.push(msg);
    }

    fn close_pending(&mut self) {
        for id in std::mem::take(&mut self.pending) {
            self.messages.push(json!({
                "role": "tool",
                "tool_call_id": id,
                "content": NOT_EXECUTED,
            }));
        }
    }

    pub fn pending(&self) -> &[String] {
        &self.pending
    }
}

fn tool_to_chat(tool: &ToolSpec) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

/// 解析 choices[0].message：文本与工具调用；缺失 id 时生成 UUID
pub fn parse_chat_message(payload: &Value) -> Result<(Option<String>, Vec<ToolCallRequest>), LlmError> {
    let message = payload
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .ok_or_else(|| LlmError::Decode("response missing choices[0].message".to_string()))?;

    let text = message
        .get("content")
        .and_then(Value::as_str)
        .map(String::from);

    let mut calls = Vec::new();
    if let Some(tool_calls) = message.get("tool_calls").and_then(Value::as_array) {
        for tc in tool_calls {
            let Some(function) = tc.get("function") else {
                continue;
            };
            let name = function
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let id = tc
                .get("id")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4()));
            calls.push(ToolCallRequest::new(id, name, parse_arguments(function.get("arguments"))));
        }
    }
    Ok((text, calls))
}

/// arguments 通常是 JSON 字符串；空串视为 {}，无法解析时原样保留为字符串交由参数校验报错
fn parse_arguments(raw: Option<&Value>) -> Value {
    match raw {
        Some(Value::String(s)) if s.trim().is_empty() => json!({}),
        Some(Value::String(s)) => serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone())),
        Some(Value::Null) | None => json!({}),
        Some(other) => other.clone(),
    }
}
