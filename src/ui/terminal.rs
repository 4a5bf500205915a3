//! 终端交互：按行提示与读取
//!
//! StdTerminal 读 stdin 前暂停 spinner，读完恢复；ScriptedTerminal 供测试注入操作员回答，
//! 可选 gate 使读取一直挂起直到测试放行。

use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::core::AgentError;
use crate::ui::Spinner;

/// 行式终端
#[async_trait]
pub trait Terminal: Send + Sync {
    /// 显示提示并阻塞读取一行（不含换行符）
    async fn read_line(&self, prompt: &str) -> Result<String, AgentError>;

    /// 输出一行提示信息
    fn print_line(&self, line: &str);
}

/// 真实终端：stdout 写提示，stdin 读一行
pub struct StdTerminal {
    spinner: Arc<Spinner>,
}

impl StdTerminal {
    pub fn new(spinner: Arc<Spinner>) -> Self {
        Self { spinner }
    }
}

#[async_trait]
impl Terminal for StdTerminal {
    async fn read_line(&self, prompt: &str) -> Result<String, AgentError> {
        let _pause = self.spinner.suspend();
        let prompt = prompt.to_string();
        let line = tokio::task::spawn_blocking(move || -> std::io::Result<Option<String>> {
            let mut out = std::io::stdout();
            write!(out, "{prompt}")?;
            out.flush()?;
            let mut buf = String::new();
            let n = std::io::stdin().read_line(&mut buf)?;
            if n == 0 {
                return Ok(None);
            }
            Ok(Some(buf.trim_end_matches(['\r', '\n']).to_string()))
        })
        .await
        .map_err(|e| AgentError::Terminal(format!("terminal reader panicked: {e}")))??;
        line.ok_or_else(|| AgentError::Terminal("stdin closed".to_string()))
    }

    fn print_line(&self, line: &str) {
        let _pause = self.spinner.suspend();
        println!("{line}");
    }
}

/// 测试终端：按顺序返回预置回答，并记录所有提示
#[derive(Debug, Default)]
pub struct ScriptedTerminal {
    answers: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    printed: Mutex<Vec<String>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedTerminal {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// 每次读取都先等待 gate 被 notify_one
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn printed(&self) -> Vec<String> {
        self.printed.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Terminal for ScriptedTerminal {
    async fn read_line(&self, prompt: &str) -> Result<String, AgentError> {
        if let Ok(mut p) = self.prompts.lock() {
            p.push(prompt.to_string());
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut a| a.pop_front())
            .ok_or_else(|| AgentError::Terminal("stdin closed".to_string()))
    }

    fn print_line(&self, line: &str) {
        if let Ok(mut p) = self.printed.lock() {
            p.push(line.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_terminal_answers_in_order() {
        let term = ScriptedTerminal::new(["first", "second"]);
        assert_eq!(term.read_line("a? ").await.unwrap(), "first");
        assert_eq!(term.read_line("b? ").await.unwrap(), "second");
        assert!(matches!(
            term.read_line("c? ").await,
            Err(AgentError::Terminal(_))
        ));
        assert_eq!(term.prompts(), vec!["a? ", "b? ", "c? "]);
    }
}
