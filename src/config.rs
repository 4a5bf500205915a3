//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `RATPI__*` 覆盖（双下划线表示嵌套，如 `RATPI__LLM__PROVIDER=openai`）。
//! API Key 不进配置文件，只从 DEEPSEEK_API_KEY / OPENAI_API_KEY 读取。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub agent: AgentSection,
    pub tools: ToolsSection,
    pub supervisor: SupervisorSection,
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：deepseek / openai
    pub provider: String,
    pub model: String,
    /// 覆盖默认端点（OpenAI 兼容服务）
    pub base_url: Option<String>,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    120
}

/// [agent] 段：Worker 节奏与系统提示
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    /// 两次自动往返之间的间隔（毫秒）
    pub debounce_ms: u64,
    /// 覆盖内置系统提示
    pub system_prompt: Option<String>,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            debounce_ms: 1000,
            system_prompt: None,
        }
    }
}

/// [tools] 段：命令超时、getContext 暴露的环境变量白名单
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    pub command_timeout_secs: u64,
    pub env_whitelist: Vec<String>,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            command_timeout_secs: 300,
            env_whitelist: default_env_whitelist(),
        }
    }
}

fn default_env_whitelist() -> Vec<String> {
    ["NODE_ENV", "CI", "REACT_APP_BUILD_TARGET", "CUSTOM_API_URL"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// [supervisor] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SupervisorSection {
    /// false 时 agent 子命令直接让操作员审阅结果
    pub enabled: bool,
    /// 单次 YES/NO 核验的等待上限（秒）
    pub verify_timeout_secs: u64,
}

impl Default for SupervisorSection {
    fn default() -> Self {
        Self {
            enabled: true,
            verify_timeout_secs: 60,
        }
    }
}

/// 从 config 目录加载配置，环境变量 RATPI__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml，找到则作为第一源
/// 2. 若传入 config_path，则追加该文件（必须存在，可覆盖前面的键）
/// 3. 最后叠加环境变量 RATPI__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default"] {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("RATPI")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("tools.env_whitelist"),
    );

    builder.build()?.try_deserialize()
}
