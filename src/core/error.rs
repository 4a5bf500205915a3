//! Agent 错误类型
//!
//! 分类：配置错误（缺少凭据，致命）、通道错误（LLM 调用失败，由 Worker 向上传播）、
//! 终端错误（交互读取失败）。工具执行错误不走这里，而是作为 ToolExecutionResult 回传给模型。

use thiserror::Error;

use crate::llm::LlmError;

/// Agent 运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 缺少必需的外部凭据（如 DEEPSEEK_API_KEY），进程以 1 退出
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Config error: {0}")]
    Config(String),

    /// 远端对话通道失败；Worker 不吞掉，交由 Supervisor 转为可读字符串
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Terminal error: {0}")]
    Terminal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// 配置类错误：直接报告并退出，不重试
    pub fn is_configuration(&self) -> bool {
        matches!(self, AgentError::MissingCredential(_) | AgentError::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_converts() {
        let err: AgentError = LlmError::Timeout.into();
        assert!(matches!(err, AgentError::Llm(LlmError::Timeout)));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_missing_credential_is_configuration() {
        let err = AgentError::MissingCredential("DEEPSEEK_API_KEY".to_string());
        assert!(err.is_configuration());
        assert!(err.to_string().contains("DEEPSEEK_API_KEY"));
    }
}
