//! 工具执行器
//!
//! execute(call) 永不返回 Err：所有失败都折叠进 ToolExecutionResult 交给模型决定下一步。
//! 进程内同一时刻只允许一个工具执行：执行槽被占用时立即返回「另一个工具正在运行」，不排队。
//! 每次调用输出结构化审计日志（JSON）。

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::config::ToolsSection;
use crate::core::{TaskScheduler, UserWait};
use crate::llm::ToolCallRequest;
use crate::tools::{
    ContextProvider, FinishPayload, ProjectFs, ShellRunner, ToolInvocation, ToolName,
    ToolRegistry,
};
use crate::ui::Terminal;

/// 操作员在 finish 后选择继续时回给模型的指示
pub const CONTINUE_AFTER_FINISH: &str =
    "The user wants to continue, ask them what they want or need next.";

const BUSY_ERROR: &str = "Another tool is currently running. Please wait.";
const WAITING_ERROR: &str = "Cannot finish: waiting for user input.";

/// 进程退出钩子；默认 std::process::exit，测试中替换为记录器
pub type ExitHook = Arc<dyn Fn(i32) + Send + Sync>;

/// 单次工具执行结果：成功时 output 有意义，失败时 error 有意义
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolExecutionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolExecutionResult {
    pub fn ok(output: impl Into<Value>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(message.into()),
        }
    }

    pub fn output_str(&self) -> Option<&str> {
        self.output.as_ref().and_then(|v| v.as_str())
    }

    /// 回传给模型的内容：对象输出直接展开，其余包装为 {output, success, error}
    pub fn to_payload(&self) -> Value {
        if self.success {
            if let Some(Value::Object(obj)) = &self.output {
                return Value::Object(obj.clone());
            }
        }
        let mut map = Map::new();
        if let Some(output) = &self.output {
            map.insert("output".to_string(), output.clone());
        }
        map.insert("success".to_string(), json!(self.success));
        if let Some(error) = &self.error {
            map.insert("error".to_string(), json!(error));
        }
        Value::Object(map)
    }
}

/// 工具执行器：按名分派，持有执行槽与 Waiting-For-User 标志
pub struct ToolExecutor {
    registry: ToolRegistry,
    scheduler: Arc<TaskScheduler>,
    user_wait: UserWait,
    terminal: Arc<dyn Terminal>,
    fs: ProjectFs,
    shell: ShellRunner,
    context: ContextProvider,
    exit_hook: ExitHook,
}

impl ToolExecutor {
    pub fn new(
        root: impl AsRef<Path>,
        scheduler: Arc<TaskScheduler>,
        user_wait: UserWait,
        terminal: Arc<dyn Terminal>,
        cfg: &ToolsSection,
    ) -> Self {
        let fs = ProjectFs::new(root.as_ref());
        Self {
            registry: ToolRegistry::standard(),
            scheduler,
            user_wait,
            terminal,
            shell: ShellRunner::new(fs.clone(), cfg.command_timeout_secs),
            context: ContextProvider::new(root.as_ref(), cfg.env_whitelist.clone()),
            fs,
            exit_hook: Arc::new(|code| std::process::exit(code)),
        }
    }

    pub fn with_exit_hook(mut self, hook: ExitHook) -> Self {
        self.exit_hook = hook;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn user_wait(&self) -> &UserWait {
        &self.user_wait
    }

    pub fn scheduler(&self) -> &Arc<TaskScheduler> {
        &self.scheduler
    }

    /// 执行一个工具调用；永不失败，错误进入结果
    pub async fn execute(&self, call: &ToolCallRequest) -> ToolExecutionResult {
        let start = Instant::now();

        // 等待用户输入期间模型不能结束任务；先于执行槽检查，避免被报告为「工具繁忙」
        if ToolName::parse(&call.name) == Some(ToolName::Finish) && self.user_wait.is_waiting() {
            tracing::warn!(call_id = %call.id, "finish rejected while waiting for user input");
            return ToolExecutionResult::err(WAITING_ERROR);
        }

        let invocation = match ToolInvocation::parse(call) {
            Ok(inv) => inv,
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "tool call rejected");
                return ToolExecutionResult::err(e.to_string());
            }
        };

        let Some(_permit) = self.scheduler.try_acquire_tool() else {
            tracing::warn!(tool = %call.name, "tool slot busy");
            return ToolExecutionResult::err(BUSY_ERROR);
        };

        let result = self.dispatch(invocation).await;

        let audit = json!({
            "event": "tool_audit",
            "tool": call.name,
            "call_id": call.id,
            "ok": result.success,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview(&call.args),
        });
        tracing::info!(audit = %audit, "tool");
        result
    }

    async fn dispatch(&self, invocation: ToolInvocation) -> ToolExecutionResult {
        match invocation {
            ToolInvocation::ReadFile(a) => into_result(self.fs.read_file(&a.path).await),
            ToolInvocation::WriteFile(a) => {
                into_result(self.fs.write_file(&a.path, &a.content).await)
            }
            ToolInvocation::RunCommand(a) => {
                into_result(self.shell.run(&a.command, a.cwd.as_deref()).await)
            }
            ToolInvocation::ListFiles(a) => into_result(self.fs.list_files(&a.path).await),
            ToolInvocation::GetContext => {
                let provider = self.context.clone();
                match tokio::task::spawn_blocking(move || provider.snapshot()).await {
                    Ok(ctx) => match serde_json::to_value(ctx) {
                        Ok(v) => ToolExecutionResult::ok(v),
                        Err(e) => ToolExecutionResult::err(format!("Failed to encode context: {e}")),
                    },
                    Err(e) => ToolExecutionResult::err(format!(
                        "Tool execution failed for getContext: {e}"
                    )),
                }
            }
            ToolInvocation::AskUserInput(a) => self.ask_user(&a.prompt).await,
            ToolInvocation::Finish(payload) => self.confirm_finish(&payload).await,
            ToolInvocation::ListTools => ToolExecutionResult::ok(json!(self.registry.specs())),
        }
    }

    async fn ask_user(&self, prompt: &str) -> ToolExecutionResult {
        let _waiting = self.user_wait.begin();
        tracing::info!("asking user input");
        let question = format!("[ratpi] {prompt}\nWaiting for user input > ");
        match self.terminal.read_line(&question).await {
            Ok(answer) => ToolExecutionResult::ok(answer),
            Err(e) => ToolExecutionResult::err(format!("Tool execution failed for askUserInput: {e}")),
        }
    }

    /// 打印总结后询问操作员是否还有其他需求：no 结束进程，yes 让模型继续
    async fn confirm_finish(&self, payload: &FinishPayload) -> ToolExecutionResult {
        tracing::info!(
            user_satisfied = ?payload.user_satisfied,
            "task finished: {}",
            payload.summary
        );
        self.terminal
            .print_line(&format!("[ratpi] Task finished: {}", payload.summary));
        loop {
            let answer = match self
                .terminal
                .read_line("[ratpi] Do you need anything else? (Yes/No): ")
                .await
            {
                Ok(a) => a,
                Err(e) => {
                    return ToolExecutionResult::err(format!(
                        "Tool execution failed for finish: {e}"
                    ))
                }
            };
            match answer.trim().to_lowercase().as_str() {
                "no" => {
                    self.terminal.print_line("[ratpi] Goodbye!");
                    (self.exit_hook)(0);
                    return ToolExecutionResult::ok("The operator ended the session.");
                }
                "yes" => return ToolExecutionResult::ok(CONTINUE_AFTER_FINISH),
                _ => self.terminal.print_line("[ratpi] Please answer Yes or No."),
            }
        }
    }
}

fn into_result<T: Into<Value>>(r: Result<T, String>) -> ToolExecutionResult {
    match r {
        Ok(v) => ToolExecutionResult::ok(v),
        Err(e) => ToolExecutionResult::err(e),
    }
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.len() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
