//! DeepSeek API 客户端（OpenAI 兼容格式）
//!
//! DeepSeek 提供与 OpenAI 完全兼容的 API 接口。
//! - Base URL: https://api.deepseek.com
//! - 模型: deepseek-chat（支持 function calling）

use std::time::Duration;

use crate::llm::{LlmError, OpenAiClient};

/// DeepSeek API 常量
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";

/// 凭据：优先 DEEPSEEK_API_KEY，其次 OPENAI_API_KEY
pub fn deepseek_api_key() -> Option<String> {
    ["DEEPSEEK_API_KEY", "OPENAI_API_KEY"]
        .into_iter()
        .filter_map(|k| std::env::var(k).ok())
        .find(|v| !v.trim().is_empty())
}

/// 创建 DeepSeek 客户端；base_url 为空时使用官方端点
pub fn create_deepseek_client(
    base_url: Option<&str>,
    model: &str,
    api_key: &str,
    request_timeout: Duration,
) -> Result<OpenAiClient, LlmError> {
    OpenAiClient::new(
        Some(base_url.unwrap_or(DEEPSEEK_BASE_URL)),
        model,
        api_key,
        request_timeout,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint() {
        let client =
            create_deepseek_client(None, DEEPSEEK_CHAT, "sk-test", Duration::from_secs(5)).unwrap();
        assert_eq!(client.endpoint(), "https://api.deepseek.com/chat/completions");
        assert_eq!(client.model(), DEEPSEEK_CHAT);
    }
}
