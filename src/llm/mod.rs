//! LLM 层：对话通道抽象与实现（OpenAI 兼容 / DeepSeek / Mock）

pub mod deepseek;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;
use std::time::Duration;

pub use deepseek::{create_deepseek_client, deepseek_api_key, DEEPSEEK_BASE_URL, DEEPSEEK_CHAT};
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage, OPENAI_BASE_URL};
pub use traits::{
    ChatSession, LlmClient, LlmError, ModelResponse, OutboundMessage, ToolCallRequest,
    ToolResultMessage,
};

use crate::config::AppConfig;
use crate::core::AgentError;

/// 根据 [llm] 配置创建客户端；缺少凭据时返回 MissingCredential（进程以 1 退出）
pub fn create_llm_from_config(cfg: &AppConfig) -> Result<Arc<dyn LlmClient>, AgentError> {
    let timeout = Duration::from_secs(cfg.llm.timeouts.request);
    let base_url = cfg.llm.base_url.as_deref();
    let client = match cfg.llm.provider.to_lowercase().as_str() {
        "deepseek" => {
            let key = deepseek_api_key()
                .ok_or_else(|| AgentError::MissingCredential("DEEPSEEK_API_KEY".to_string()))?;
            create_deepseek_client(base_url, &cfg.llm.model, &key, timeout)?
        }
        "openai" => {
            let key = std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| AgentError::MissingCredential("OPENAI_API_KEY".to_string()))?;
            OpenAiClient::new(base_url, &cfg.llm.model, &key, timeout)?
        }
        other => {
            return Err(AgentError::Config(format!(
                "unknown llm provider '{other}' (expected deepseek or openai)"
            )))
        }
    };
    tracing::debug!(provider = %cfg.llm.provider, model = %cfg.llm.model, "llm client ready");
    Ok(Arc::new(client))
}
