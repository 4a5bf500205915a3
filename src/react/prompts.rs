//! 内置提示词：Worker 的系统指令与 Supervisor 的改写、核验、反馈模板

/// Worker 的系统指令；首条消息为 `{AGENT_INSTRUCTIONS}\n Your goal: {goal}`
pub const AGENT_INSTRUCTIONS: &str = r#"You are an AI agent named Ratpi.

MISSION
Assist the user with technical tasks in their local project: answer questions, inspect and edit files, run commands and automate workflows with the tools you are given.

CORE DIRECTIVES
- Be direct and concise.
- Call 'getContext' when you lack information about the environment.
- Call 'askUserInput' whenever you need clarification. Never ask the user a free-form question in plain text.
- Call 'listTools' to see what you can do.
- Issue one side-effecting tool call at a time. If a tool reports that another tool is running, wait and issue the call again.
- When something fails, say so clearly and either try another approach or explain why the task cannot be completed.

TASK COMPLETION
When the task is done, call the 'finish' tool exactly once with:
- summary: a clear and complete account of what you did and the conclusion you reached.
- userSatisfied: whether you believe the user's request is fully met.
Do not call 'finish' while a question to the user is still pending. If you receive feedback after finishing, keep working and call 'finish' again when done."#;

/// 空闲回复后的催促消息
pub const CONTINUE_NUDGE: &str = "continue";

/// 核验失败且无法取得具体意见时发给 Worker 的通用反馈
pub const FALLBACK_FEEDBACK: &str = "The answer is not satisfactory, please correct it.";

pub fn agent_first_message(system_prompt: &str, goal: &str) -> String {
    format!("{system_prompt}\n Your goal: {goal}")
}

pub fn optimize_prompt(goal: &str) -> String {
    format!(
        "Given the following user request, rephrase and optimize it to be as clear, concise, and actionable as possible for an AI agent. \
Ensure it includes instructions for the agent to double-check its work. \
Do not add any conversational filler, just the optimized prompt.\nOriginal Prompt: \"{goal}\""
    )
}

pub fn verify_answer(answer: &str, goal: &str) -> String {
    format!(
        "Given the original task prompt: \"{goal}\"\nAnd the agent's final answer: \"{answer}\"\n\n\
Is the agent's answer satisfactory, complete, and does it address the original prompt effectively? \
Respond with \"YES\" if satisfactory, \"NO\" if not. Provide a brief reason for your decision."
    )
}

pub fn feedback_for_agent(answer: &str, goal: &str) -> String {
    format!(
        "The agent tried to answer the following instruction:\n\"{goal}\"\nIts answer:\n\"{answer}\"\n\n\
Briefly explain to the agent what it should correct or improve to properly address the instruction."
    )
}
