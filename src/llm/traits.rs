//! 对话通道抽象
//!
//! LlmClient 负责创建会话（附带工具目录），ChatSession 持有各自的轮次历史，
//! send 发送文本或一批工具结果，返回结构化的 ModelResponse。
//! 通道不内置重试：一次 send 失败即由调用方决定如何处理。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::tools::ToolSpec;

/// 通道层错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Request timed out")]
    Timeout,

    /// 会话无法建立（如凭据或端点不可用）
    #[error("Session unavailable: {0}")]
    SessionUnavailable(String),

    /// Mock 剧本已用尽（仅测试）
    #[error("Mock script exhausted")]
    ScriptExhausted,
}

/// 模型发起的单个工具调用请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// 用于关联结果的调用 ID
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }
}

/// 回传给模型的单个工具结果，按 call_id 关联原请求
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResultMessage {
    pub call_id: String,
    pub name: String,
    pub payload: Value,
}

/// 发往模型的一条消息
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum OutboundMessage {
    Text(String),
    /// 同一批次的全部工具结果，一次往返送回
    ToolResults(Vec<ToolResultMessage>),
    /// 已执行调用的结果，后跟一条修正意见（finish 被驳回时）
    Feedback {
        results: Vec<ToolResultMessage>,
        text: String,
    },
}

impl OutboundMessage {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) | Self::Feedback { text: t, .. } => Some(t),
            Self::ToolResults(_) => None,
        }
    }
}

/// 模型回复：纯文本、工具调用（可附带文本）或空回复
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    Text(String),
    ToolCalls {
        calls: Vec<ToolCallRequest>,
        text: Option<String>,
    },
    /// 既无文本也无工具调用，Worker 会发送 continue 提示
    Empty,
}

impl ModelResponse {
    /// 由可选文本与调用列表构造；空白文本视为缺失
    pub fn from_parts(text: Option<String>, calls: Vec<ToolCallRequest>) -> Self {
        let text = text.filter(|t| !t.trim().is_empty());
        match (calls.is_empty(), text) {
            (false, text) => Self::ToolCalls { calls, text },
            (true, Some(t)) => Self::Text(t),
            (true, None) => Self::Empty,
        }
    }

    pub fn tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self::from_parts(None, calls)
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            Self::ToolCalls { text, .. } => text.as_deref(),
            Self::Empty => None,
        }
    }

    pub fn calls(&self) -> &[ToolCallRequest] {
        match self {
            Self::ToolCalls { calls, .. } => calls,
            _ => &[],
        }
    }
}

/// 单个会话：由创建者独占，不在 Worker 与 Supervisor 之间共享
#[async_trait]
pub trait ChatSession: Send {
    async fn send(&mut self, message: OutboundMessage) -> Result<ModelResponse, LlmError>;
}

/// LLM 客户端：创建会话
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 创建新会话；tools 为空表示不向模型开放工具
    async fn create_session(&self, tools: &[ToolSpec]) -> Result<Box<dyn ChatSession>, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_parts_normalizes() {
        assert_eq!(ModelResponse::from_parts(None, vec![]), ModelResponse::Empty);
        assert_eq!(
            ModelResponse::from_parts(Some("  \n".into()), vec![]),
            ModelResponse::Empty
        );
        assert_eq!(
            ModelResponse::from_parts(Some("hi".into()), vec![]),
            ModelResponse::Text("hi".into())
        );
        let call = ToolCallRequest::new("c1", "listFiles", json!({"path": "."}));
        let resp = ModelResponse::from_parts(Some(" ".into()), vec![call.clone()]);
        assert_eq!(
            resp,
            ModelResponse::ToolCalls {
                calls: vec![call],
                text: None
            }
        );
        assert_eq!(resp.calls().len(), 1);
        assert!(resp.text().is_none());
    }
}
