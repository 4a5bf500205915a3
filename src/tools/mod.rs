//! 工具箱：固定工具目录、参数 schema、执行器与各工具实现

pub mod context;
pub mod executor;
pub mod filesystem;
pub mod registry;
pub mod schema;
pub mod shell;

pub use context::{ContextProvider, GitContext, ProjectContext};
pub use executor::{ExitHook, ToolExecutionResult, ToolExecutor, CONTINUE_AFTER_FINISH};
pub use filesystem::ProjectFs;
pub use registry::{FinishPayload, InvocationError, ToolInvocation, ToolName, ToolRegistry, ToolSpec};
pub use schema::parameters_schema;
pub use shell::ShellRunner;
