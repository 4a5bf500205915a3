//! 过程叙述：把 AgentEvent 打印到 stdout（打印时暂停 spinner）

use std::sync::Arc;

use crossterm::style::Stylize;
use tokio::sync::mpsc;

use crate::react::AgentEvent;
use crate::ui::Spinner;

/// 事件对应的一行（或多行）文字；不需要展示的事件返回 None
pub fn describe(event: &AgentEvent) -> Option<String> {
    let worker = "[Ratpi Worker]".green();
    let supervisor = "[Ratpi Supervisor]".magenta();
    let line = match event {
        AgentEvent::Thinking | AgentEvent::Nudge => return None,
        AgentEvent::ModelText { text } => format!("{worker} {text}"),
        // 这两个工具自己在终端上提示，异步叙述会与提示交错
        AgentEvent::ToolCall { tool, .. } if tool == "askUserInput" || tool == "finish" => return None,
        AgentEvent::ToolCall { tool, args, .. } => {
            format!("{worker} Executing tool: {} {}", tool.as_str().bold(), args)
        }
        AgentEvent::Observation {
            tool,
            success,
            preview,
            ..
        } => {
            let status = if *success { "ok".green() } else { "failed".red() };
            format!("{worker} {tool} {status}: {preview}")
        }
        AgentEvent::FinalAnswer { summary } => format!("{worker} Final answer:\n{summary}"),
        AgentEvent::PromptOptimized { prompt } => format!("{supervisor} Optimized prompt: {prompt}"),
        AgentEvent::Verification { satisfied, reply } => {
            if *satisfied {
                format!("{supervisor} Verification passed.")
            } else {
                format!("{supervisor} Verification failed: {reply}")
            }
        }
        AgentEvent::Feedback { text } => format!("{supervisor} Feedback to agent: {text}"),
        AgentEvent::TokenUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens,
        } => format!(
            "{} Token totals (all sessions): prompt {prompt_tokens}, completion {completion_tokens}, total {total_tokens}",
            "[Ratpi]".dark_grey()
        ),
        AgentEvent::Error { text } => format!("{} {text}", "[Ratpi]".red()),
    };
    Some(line)
}

/// 消费事件直到所有发送端关闭
pub async fn narrate(mut rx: mpsc::UnboundedReceiver<AgentEvent>, spinner: Arc<Spinner>) {
    while let Some(event) = rx.recv().await {
        if let Some(line) = describe(&event) {
            let _pause = spinner.suspend();
            println!("{line}");
        }
    }
}
