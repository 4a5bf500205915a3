//! 工具目录与调用解析
//!
//! 工具集合固定：ToolName 为每个可识别的名称一个变体，ToolInvocation 携带已解析的参数。
//! 目录（ToolSpec 列表）同时供对话通道声明能力与 listTools 工具返回。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::ToolCallRequest;
use crate::tools::schema::parameters_schema;

/// 提供给模型的单个工具定义
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// 可识别的工具名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    ReadFile,
    WriteFile,
    RunCommand,
    ListFiles,
    GetContext,
    AskUserInput,
    Finish,
    ListTools,
}

impl ToolName {
    pub const ALL: [ToolName; 8] = [
        ToolName::ReadFile,
        ToolName::WriteFile,
        ToolName::RunCommand,
        ToolName::Finish,
        ToolName::ListFiles,
        ToolName::AskUserInput,
        ToolName::GetContext,
        ToolName::ListTools,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::ReadFile => "readFile",
            ToolName::WriteFile => "writeFile",
            ToolName::RunCommand => "runCommand",
            ToolName::ListFiles => "listFiles",
            ToolName::GetContext => "getContext",
            ToolName::AskUserInput => "askUserInput",
            ToolName::Finish => "finish",
            ToolName::ListTools => "listTools",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    fn description(self) -> &'static str {
        match self {
            ToolName::ReadFile => "Read a file from disk and return its text content",
            ToolName::WriteFile => "Write text content to a file",
            ToolName::RunCommand => "Execute a shell command and return its output",
            ToolName::ListFiles => "List all files and folders in a directory",
            ToolName::GetContext => {
                "Get the current project context including { cwd, project_name, user, platform, \
                 runtime_version, git, package_manager, scripts, dependencies, env, date }."
            }
            ToolName::AskUserInput => {
                "Ask the user for an input and return the response as a string."
            }
            ToolName::Finish => {
                "Call this when the task is complete. Provide a summary in 'summary'. Summary \
                 should be a full list of changes made and observations, not just a brief \
                 description. Tell if you think you have successfully completed the task or if \
                 not. If not specify what was missing. You MUST include a field 'userSatisfied' \
                 (boolean) indicating if the user confirmed satisfaction."
            }
            ToolName::ListTools => "List all available tools and their descriptions.",
        }
    }

    fn parameters(self) -> Value {
        match self {
            ToolName::ReadFile => parameters_schema::<ReadFileArgs>(),
            ToolName::WriteFile => parameters_schema::<WriteFileArgs>(),
            ToolName::RunCommand => parameters_schema::<RunCommandArgs>(),
            ToolName::ListFiles => parameters_schema::<ListFilesArgs>(),
            ToolName::AskUserInput => parameters_schema::<AskUserInputArgs>(),
            ToolName::Finish => {
                let mut schema = parameters_schema::<FinishPayload>();
                // userSatisfied 虽是 Option，但要求模型总是给出
                schema["required"] = serde_json::json!(["summary", "userSatisfied"]);
                schema
            }
            ToolName::GetContext | ToolName::ListTools => parameters_schema::<NoArgs>(),
        }
    }

    pub fn spec(self) -> ToolSpec {
        ToolSpec {
            name: self.as_str().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct ReadFileArgs {
    /// Path of the file
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct WriteFileArgs {
    /// File path
    pub path: String,
    /// Text to write
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct RunCommandArgs {
    /// Command to execute
    pub command: String,
    /// Optional: The directory in which to run the command.
    #[serde(default)]
    pub cwd: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct ListFilesArgs {
    /// Path of the directory
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct AskUserInputArgs {
    /// Prompt/question to display to the user
    pub prompt: String,
}

/// finish 的参数即 Finish Payload：{ summary, userSatisfied? }
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinishPayload {
    /// Summary of the work
    pub summary: String,
    /// Whether the user confirmed satisfaction (true/false)
    #[serde(default)]
    pub user_satisfied: Option<bool>,
}

impl FinishPayload {
    /// 调用为 finish 且 summary 非空白时，视为已完成的 Finish Payload
    pub fn completed(call: &ToolCallRequest) -> Option<Self> {
        if ToolName::parse(&call.name) != Some(ToolName::Finish) {
            return None;
        }
        serde_json::from_value::<FinishPayload>(call.args.clone())
            .ok()
            .filter(|p| !p.summary.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct NoArgs {}

/// 已解析的工具调用
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    ReadFile(ReadFileArgs),
    WriteFile(WriteFileArgs),
    RunCommand(RunCommandArgs),
    ListFiles(ListFilesArgs),
    GetContext,
    AskUserInput(AskUserInputArgs),
    Finish(FinishPayload),
    ListTools,
}

/// 解析失败：未知工具或参数不合法
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationError {
    UnknownTool(String),
    InvalidArguments { tool: &'static str, reason: String },
}

impl std::fmt::Display for InvocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvocationError::UnknownTool(name) => write!(f, "Unknown tool: {name}"),
            InvocationError::InvalidArguments { tool, reason } => {
                write!(f, "Invalid arguments for {tool}: {reason}")
            }
        }
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(
    tool: ToolName,
    args: &Value,
) -> Result<T, InvocationError> {
    serde_json::from_value(args.clone()).map_err(|e| InvocationError::InvalidArguments {
        tool: tool.as_str(),
        reason: e.to_string(),
    })
}

impl ToolInvocation {
    pub fn parse(call: &ToolCallRequest) -> Result<Self, InvocationError> {
        let name = ToolName::parse(&call.name)
            .ok_or_else(|| InvocationError::UnknownTool(call.name.clone()))?;
        let args = &call.args;
        Ok(match name {
            ToolName::ReadFile => ToolInvocation::ReadFile(parse_args(name, args)?),
            ToolName::WriteFile => ToolInvocation::WriteFile(parse_args(name, args)?),
            ToolName::RunCommand => ToolInvocation::RunCommand(parse_args(name, args)?),
            ToolName::ListFiles => ToolInvocation::ListFiles(parse_args(name, args)?),
            ToolName::AskUserInput => ToolInvocation::AskUserInput(parse_args(name, args)?),
            ToolName::Finish => ToolInvocation::Finish(parse_args(name, args)?),
            ToolName::GetContext => ToolInvocation::GetContext,
            ToolName::ListTools => ToolInvocation::ListTools,
        })
    }
}

/// 工具注册表：固定目录
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
}

impl ToolRegistry {
    /// 标准目录（全部内置工具）
    pub fn standard() -> Self {
        Self {
            specs: ToolName::ALL.into_iter().map(ToolName::spec).collect(),
        }
    }

    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.specs.iter().map(|s| s.name.clone()).collect()
    }

    /// 目录 JSON（listTools 返回与 CLI 打印共用）
    pub fn to_schema_json(&self) -> String {
        serde_json::to_string_pretty(&self.specs).unwrap_or_else(|_| "[]".to_string())
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(name: &str, args: Value) -> ToolCallRequest {
        ToolCallRequest::new("id-1", name, args)
    }

    #[test]
    fn test_registry_lists_every_tool_once() {
        let registry = ToolRegistry::standard();
        let names = registry.tool_names();
        assert_eq!(names.len(), ToolName::ALL.len());
        for tool in ToolName::ALL {
            assert_eq!(names.iter().filter(|n| *n == tool.as_str()).count(), 1);
        }
    }

    #[test]
    fn test_finish_schema_requires_user_satisfied() {
        let spec = ToolName::Finish.spec();
        assert_eq!(spec.parameters["required"], json!(["summary", "userSatisfied"]));
        assert!(spec.parameters["properties"].get("userSatisfied").is_some());
    }

    #[test]
    fn test_parse_known_tools() {
        let inv = ToolInvocation::parse(&call("runCommand", json!({"command": "ls", "cwd": "src"})))
            .unwrap();
        assert_eq!(
            inv,
            ToolInvocation::RunCommand(RunCommandArgs {
                command: "ls".into(),
                cwd: Some("src".into())
            })
        );
        assert_eq!(
            ToolInvocation::parse(&call("getContext", Value::Null)).unwrap(),
            ToolInvocation::GetContext
        );
    }

    #[test]
    fn test_parse_unknown_and_invalid() {
        let err = ToolInvocation::parse(&call("deleteEverything", json!({}))).unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: deleteEverything");

        let err = ToolInvocation::parse(&call("readFile", json!({"path": 3}))).unwrap_err();
        assert!(err.to_string().starts_with("Invalid arguments for readFile:"));
    }

    #[test]
    fn test_completed_finish_payload() {
        let done = call("finish", json!({"summary": "all good", "userSatisfied": true}));
        let payload = FinishPayload::completed(&done).unwrap();
        assert_eq!(payload.summary, "all good");
        assert_eq!(payload.user_satisfied, Some(true));

        assert!(FinishPayload::completed(&call("finish", json!({"summary": "  "}))).is_none());
        assert!(FinishPayload::completed(&call("readFile", json!({"summary": "x"}))).is_none());
    }
}
