//! 端到端场景：Supervisor + Worker + ToolExecutor，LLM 与终端均为脚本化替身

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use ratpi::config::ToolsSection;
use ratpi::core::{TaskScheduler, UserWait};
use ratpi::llm::{LlmClient, LlmError, MockLlmClient, ModelResponse, OutboundMessage, ToolCallRequest};
use ratpi::react::prompts::AGENT_INSTRUCTIONS;
use ratpi::react::supervisor::TASK_COMPLETED;
use ratpi::react::{Continuation, MessageHandler, Supervisor, Worker};
use ratpi::tools::{ToolExecutor, CONTINUE_AFTER_FINISH};
use ratpi::ui::{ScriptedTerminal, Spinner, Terminal};

fn executor(dir: &Path, terminal: Arc<dyn Terminal>, exits: Arc<Mutex<Vec<i32>>>) -> Arc<ToolExecutor> {
    Arc::new(
        ToolExecutor::new(
            dir,
            Arc::new(TaskScheduler::new()),
            UserWait::new(),
            terminal,
            &ToolsSection::default(),
        )
        .with_exit_hook(Arc::new(move |code| exits.lock().unwrap().push(code))),
    )
}

fn worker(mock: &MockLlmClient, executor: Arc<ToolExecutor>) -> Worker {
    Worker::new(Arc::new(mock.clone()), executor, Spinner::hidden()).with_debounce(Duration::ZERO)
}

fn supervisor(mock: &MockLlmClient, dir: &Path) -> Supervisor {
    let exec = executor(dir, Arc::new(ScriptedTerminal::default()), Arc::default());
    let llm: Arc<dyn LlmClient> = Arc::new(mock.clone());
    Supervisor::new(llm, worker(mock, exec))
}

fn call(id: &str, name: &str, args: serde_json::Value) -> ToolCallRequest {
    ToolCallRequest::new(id, name, args)
}

fn finish(id: &str, summary: &str) -> ModelResponse {
    ModelResponse::tool_calls(vec![call(
        id,
        "finish",
        json!({"summary": summary, "userSatisfied": true}),
    )])
}

fn tool_results(msg: &OutboundMessage) -> Vec<(String, serde_json::Value)> {
    match msg {
        OutboundMessage::ToolResults(results) => results
            .iter()
            .map(|r| (r.call_id.clone(), r.payload.clone()))
            .collect(),
        other => panic!("expected tool results, got {other:?}"),
    }
}

#[tokio::test]
async fn scenario_list_files_verified_yes() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();
    std::fs::write(dir.path().join("src/lib.rs"), "").unwrap();

    let mock = MockLlmClient::new([
        ModelResponse::Text("List every entry in ./src and double-check the result.".into()),
        ModelResponse::tool_calls(vec![call("c1", "listFiles", json!({"path": "./src"}))]),
        finish("f1", "./src contains lib.rs and main.rs"),
        ModelResponse::Text("YES, the listing is complete.".into()),
    ]);
    let mut sup = supervisor(&mock, dir.path());

    let outcome = sup.execute_task("list files in ./src").await;
    assert_eq!(outcome, TASK_COMPLETED);
    assert_eq!(mock.remaining(), 0);

    let sent = mock.sent();
    assert_eq!(sent.len(), 4);
    assert!(sent[1]
        .as_text()
        .unwrap()
        .ends_with("Your goal: List every entry in ./src and double-check the result."));
    assert_eq!(
        tool_results(&sent[2]),
        vec![(
            "c1".to_string(),
            json!({"output": ["lib.rs", "main.rs"], "success": true})
        )]
    );
    assert!(sent[3].as_text().unwrap().contains("./src contains lib.rs and main.rs"));
}

#[tokio::test]
async fn scenario_rejected_answer_feeds_back_to_worker() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockLlmClient::new([
        ModelResponse::Text("Write a parser and test it.".into()),
        finish("f1", "Parser written."),
        ModelResponse::Text("NO - missing test coverage".into()),
        ModelResponse::Text("Add unit tests that cover the parser's error paths.".into()),
        finish("f2", "Parser written and covered by tests."),
        ModelResponse::Text("YES".into()),
    ]);
    let mut sup = supervisor(&mock, dir.path());

    let outcome = sup.execute_task("write a parser").await;
    assert_eq!(outcome, TASK_COMPLETED);

    let texts = mock.sent_texts();
    assert_eq!(texts.len(), 6);
    assert!(texts[2].contains("Parser written."));
    assert!(texts[3].contains("Briefly explain to the agent"));
    // Worker 收到的下一条消息就是 Supervisor 的修正意见
    assert_eq!(texts[4], "Add unit tests that cover the parser's error paths.");
}

#[tokio::test]
async fn scenario_ambiguous_verification_is_treated_as_no() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockLlmClient::new([
        ModelResponse::Text("goal".into()),
        finish("f1", "first try"),
        ModelResponse::Text("It depends.".into()),
        ModelResponse::Text("Be more specific.".into()),
        finish("f2", "second try"),
        ModelResponse::Text("yes".into()),
    ]);
    let mut sup = supervisor(&mock, dir.path());
    assert_eq!(sup.execute_task("goal").await, TASK_COMPLETED);
    assert_eq!(mock.sent_texts()[4], "Be more specific.");
}

#[cfg(unix)]
#[tokio::test]
async fn scenario_batched_commands_run_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockLlmClient::new([
        ModelResponse::Text("Run both commands.".into()),
        ModelResponse::tool_calls(vec![
            call("a", "runCommand", json!({"command": "sleep 0.2; echo A >> order.txt; echo A"})),
            call("b", "runCommand", json!({"command": "echo B >> order.txt; echo B"})),
        ]),
        finish("f1", "Both commands ran."),
        ModelResponse::Text("YES".into()),
    ]);
    let mut sup = supervisor(&mock, dir.path());
    assert_eq!(sup.execute_task("run A then B").await, TASK_COMPLETED);

    let results = tool_results(&mock.sent()[2]);
    assert_eq!(
        results,
        vec![
            ("a".to_string(), json!({"output": "A\n", "success": true})),
            ("b".to_string(), json!({"output": "B\n", "success": true})),
        ]
    );
    let order = std::fs::read_to_string(dir.path().join("order.txt")).unwrap();
    assert_eq!(order, "A\nB\n");
}

#[tokio::test]
async fn scenario_optimizer_failure_keeps_original_goal() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockLlmClient::default();
    mock.push_error(LlmError::Http("connection reset".into()));
    mock.push(finish("f1", "done"));
    mock.push(ModelResponse::Text("YES".into()));
    let mut sup = supervisor(&mock, dir.path());

    assert_eq!(sup.execute_task("count the files").await, TASK_COMPLETED);
    let first = &mock.sent_texts()[1];
    assert!(first.starts_with(AGENT_INSTRUCTIONS));
    assert!(first.ends_with("Your goal: count the files"));
}

#[tokio::test]
async fn scenario_channel_error_becomes_message() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockLlmClient::new([ModelResponse::Text("goal".into())]);
    mock.push_error(LlmError::Status {
        status: 500,
        body: "internal".into(),
    });
    let mut sup = supervisor(&mock, dir.path());

    let outcome = sup.execute_task("goal").await;
    assert!(outcome.starts_with("Error: Agent execution failed - "));
    assert!(outcome.contains("500"));
}

#[tokio::test]
async fn scenario_write_then_finish_in_one_batch() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockLlmClient::new([
        ModelResponse::Text("Write out.txt, then finish.".into()),
        ModelResponse::tool_calls(vec![
            call("w1", "writeFile", json!({"path": "out.txt", "content": "hello"})),
            call("f1", "finish", json!({"summary": "out.txt written", "userSatisfied": true})),
        ]),
        ModelResponse::Text("YES".into()),
    ]);
    let mut sup = supervisor(&mock, dir.path());

    assert_eq!(sup.execute_task("write out.txt").await, TASK_COMPLETED);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("out.txt")).unwrap(),
        "hello"
    );
    assert!(mock.sent_texts()[2].contains("out.txt written"));
}

#[tokio::test]
async fn scenario_rejected_batch_keeps_executed_results() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "").unwrap();
    let mock = MockLlmClient::new([
        ModelResponse::Text("List the directory.".into()),
        ModelResponse::tool_calls(vec![
            call("l1", "listFiles", json!({"path": "."})),
            call("f1", "finish", json!({"summary": "Nothing here.", "userSatisfied": true})),
        ]),
        ModelResponse::Text("NO".into()),
        ModelResponse::Text("Report the files you listed.".into()),
        finish("f2", "The directory holds a.txt."),
        ModelResponse::Text("YES".into()),
    ]);
    let mut sup = supervisor(&mock, dir.path());

    assert_eq!(sup.execute_task("list the directory").await, TASK_COMPLETED);
    match &mock.sent()[4] {
        OutboundMessage::Feedback { results, text } => {
            assert_eq!(text, "Report the files you listed.");
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].call_id, "l1");
            assert_eq!(results[0].payload, json!({"output": ["a.txt"], "success": true}));
        }
        other => panic!("expected feedback with results, got {other:?}"),
    }
}

/// 最终答案到达时记录终端已收到的提示数
struct PromptCounter {
    terminal: Arc<ScriptedTerminal>,
    seen: Vec<(String, usize)>,
}

#[async_trait]
impl MessageHandler for PromptCounter {
    async fn on_message(&mut self, text: &str, is_final: bool) -> Continuation {
        if is_final {
            self.seen.push((text.to_string(), self.terminal.prompts().len()));
        }
        Continuation::Stop
    }
}

#[tokio::test]
async fn ask_then_finish_in_one_batch_reads_input_first() {
    let dir = tempfile::tempdir().unwrap();
    let terminal = Arc::new(ScriptedTerminal::new(["blue"]));
    let exec = executor(dir.path(), terminal.clone(), Arc::default());
    let mock = MockLlmClient::new([ModelResponse::tool_calls(vec![
        call("ask", "askUserInput", json!({"prompt": "Which colour?"})),
        call("f1", "finish", json!({"summary": "Asked for a colour.", "userSatisfied": true})),
    ])]);
    let w = worker(&mock, exec.clone());
    let mut handler = PromptCounter {
        terminal: terminal.clone(),
        seen: Vec::new(),
    };
    w.run("ask for a colour", &mut handler).await.unwrap();

    assert_eq!(handler.seen, vec![("Asked for a colour.".to_string(), 1)]);
    assert!(terminal.prompts()[0].contains("Which colour?"));
    assert!(!exec.user_wait().is_waiting());
}

/// 按预置决定回答，记录收到的消息
struct Scripted {
    decisions: Vec<Continuation>,
    seen: Vec<(String, bool)>,
}

impl Scripted {
    fn new(decisions: Vec<Continuation>) -> Self {
        Self {
            decisions,
            seen: Vec::new(),
        }
    }
}

#[async_trait]
impl MessageHandler for Scripted {
    async fn on_message(&mut self, text: &str, is_final: bool) -> Continuation {
        self.seen.push((text.to_string(), is_final));
        if self.decisions.is_empty() {
            Continuation::Stop
        } else {
            self.decisions.remove(0)
        }
    }
}

#[tokio::test]
async fn operator_says_yes_and_loop_keeps_going() {
    let dir = tempfile::tempdir().unwrap();
    let terminal = Arc::new(ScriptedTerminal::new(["blue", "Yes"]));
    let exits: Arc<Mutex<Vec<i32>>> = Arc::default();
    let exec = executor(dir.path(), terminal.clone(), exits.clone());

    let mock = MockLlmClient::new([
        ModelResponse::tool_calls(vec![call(
            "ask",
            "askUserInput",
            json!({"prompt": "Which colour?"}),
        )]),
        finish("f1", "Picked blue."),
        finish("f2", "Anything else handled."),
    ]);
    let w = worker(&mock, exec.clone());
    let mut handler = Scripted::new(vec![Continuation::Continue, Continuation::Stop]);
    w.run("pick a colour", &mut handler).await.unwrap();

    let sent = mock.sent();
    assert_eq!(
        tool_results(&sent[1]),
        vec![("ask".to_string(), json!({"output": "blue", "success": true}))]
    );
    // 操作员选择继续：结果作为工具结果回传，而不是当作最终答案
    assert_eq!(
        tool_results(&sent[2]),
        vec![(
            "f1".to_string(),
            json!({"output": CONTINUE_AFTER_FINISH, "success": true})
        )]
    );
    assert_eq!(
        handler.seen,
        vec![
            ("Picked blue.".to_string(), true),
            ("Anything else handled.".to_string(), true)
        ]
    );
    assert!(exits.lock().unwrap().is_empty());
    assert!(!exec.user_wait().is_waiting());
}

#[tokio::test]
async fn finish_is_rejected_while_user_input_is_pending() {
    let dir = tempfile::tempdir().unwrap();
    let gate = Arc::new(tokio::sync::Notify::new());
    let terminal = Arc::new(ScriptedTerminal::new(["42", "no"]).gated(gate.clone()));
    let exits: Arc<Mutex<Vec<i32>>> = Arc::default();
    let exec = executor(dir.path(), terminal, exits.clone());

    let ask = {
        let exec = exec.clone();
        tokio::spawn(async move {
            exec.execute(&call("ask", "askUserInput", json!({"prompt": "Answer?"})))
                .await
        })
    };
    while !exec.user_wait().is_waiting() {
        tokio::task::yield_now().await;
    }

    let early = exec
        .execute(&call("f1", "finish", json!({"summary": "done", "userSatisfied": true})))
        .await;
    assert!(!early.success);
    assert_eq!(early.error.as_deref(), Some("Cannot finish: waiting for user input."));
    assert!(exits.lock().unwrap().is_empty());

    gate.notify_one();
    assert_eq!(ask.await.unwrap().output_str(), Some("42"));

    // 输入完成后 finish 正常进入确认流程，操作员回答 no 结束进程
    let finish = {
        let exec = exec.clone();
        tokio::spawn(async move {
            exec.execute(&call("f2", "finish", json!({"summary": "done"}))).await
        })
    };
    gate.notify_one();
    assert!(finish.await.unwrap().success);
    assert_eq!(*exits.lock().unwrap(), vec![0]);
}

#[tokio::test]
async fn concurrent_runs_are_serialized() {
    let dir = tempfile::tempdir().unwrap();
    let exec = executor(dir.path(), Arc::new(ScriptedTerminal::default()), Arc::default());
    let mock = MockLlmClient::new([
        ModelResponse::tool_calls(vec![call("c1", "listFiles", json!({"path": "."}))]),
        finish("f1", "first goal done"),
        finish("f2", "second goal done"),
    ]);
    let first = Arc::new(worker(&mock, exec.clone()).with_debounce(Duration::from_millis(50)));
    let second = Arc::new(worker(&mock, exec));

    let run_first = {
        let w = first.clone();
        tokio::spawn(async move {
            let mut h = Scripted::new(vec![]);
            w.run("first", &mut h).await.map(|_| h.seen)
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let run_second = {
        let w = second.clone();
        tokio::spawn(async move {
            let mut h = Scripted::new(vec![]);
            w.run("second", &mut h).await.map(|_| h.seen)
        })
    };

    let seen_first = run_first.await.unwrap().unwrap();
    let seen_second = run_second.await.unwrap().unwrap();
    assert_eq!(seen_first, vec![("first goal done".to_string(), true)]);
    assert_eq!(seen_second, vec![("second goal done".to_string(), true)]);
    let texts = mock.sent_texts();
    assert!(texts[0].ends_with("Your goal: first"));
    assert!(texts[1].ends_with("Your goal: second"));
}
