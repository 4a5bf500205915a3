//! Agent 过程事件：Worker 与 Supervisor 推送给叙述层（CLI 或测试）

use serde::Serialize;

/// 单步过程事件（可序列化为 JSON）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// 正在等待模型回复
    Thinking,
    /// 模型的文本输出（中间消息）
    ModelText { text: String },
    /// 调用工具
    ToolCall {
        tool: String,
        call_id: String,
        args: serde_json::Value,
    },
    /// 工具返回（预览，避免过长）
    Observation {
        tool: String,
        call_id: String,
        success: bool,
        preview: String,
    },
    /// 模型通过 finish 报告最终答案
    FinalAnswer { summary: String },
    /// 空闲回复后发送 continue
    Nudge,
    /// Supervisor 改写后的目标
    PromptOptimized { prompt: String },
    /// Supervisor 核验结论
    Verification { satisfied: bool, reply: String },
    /// Supervisor 发给 Worker 的修正意见
    Feedback { text: String },
    /// 运行结束时客户端的累计 token 统计（同一客户端上的所有会话，含 Supervisor）
    TokenUsage {
        prompt_tokens: u64,
        completion_tokens: u64,
        total_tokens: u64,
    },
    /// 错误
    Error { text: String },
}

/// 截断到 max_chars 个字符，超出部分以 ... 表示
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_tag() {
        let v = serde_json::to_value(AgentEvent::FinalAnswer {
            summary: "done".into(),
        })
        .unwrap();
        assert_eq!(v["type"], "final_answer");
        assert_eq!(v["summary"], "done");
    }

    #[test]
    fn test_preview_is_char_safe() {
        assert_eq!(preview("héllo", 10), "héllo");
        assert_eq!(preview("héllo", 2), "hé...");
    }
}
