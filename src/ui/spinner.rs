//! 进度指示器（stderr 上的单行 spinner）
//!
//! 与终端交互读取共享同一个终端：读取前必须 suspend，读取后恢复。
//! suspend 返回 guard，drop 时恢复，保证「停止指示器 → 读取 → 恢复」的顺序在任何退出路径上成立。

use std::io::{IsTerminal, Write};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use crossterm::cursor::MoveToColumn;
use crossterm::style::{Print, Stylize};
use crossterm::terminal::{Clear, ClearType};
use crossterm::queue;

const FRAMES: &[&str] = &["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];
const TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
struct SpinnerState {
    /// Some 表示正在转动
    message: Option<String>,
    /// 嵌套 suspend 计数
    suspended: usize,
    frame: usize,
    /// 当前行是否画着 spinner
    drawn: bool,
}

/// 单行进度指示器；hidden() 版本不输出任何内容（测试 / 非 TTY）
#[derive(Debug)]
pub struct Spinner {
    state: Arc<Mutex<SpinnerState>>,
    visible: bool,
}

impl Spinner {
    /// 创建并在 stderr 为 TTY 时启动刷新任务（需在 tokio 运行时内调用）
    pub fn new() -> Arc<Self> {
        let visible = std::io::stderr().is_terminal();
        let spinner = Arc::new(Self {
            state: Arc::new(Mutex::new(SpinnerState::default())),
            visible,
        });
        if visible {
            let weak = Arc::downgrade(&spinner.state);
            tokio::spawn(tick_loop(weak));
        }
        spinner
    }

    pub fn hidden() -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(Mutex::new(SpinnerState::default())),
            visible: false,
        })
    }

    pub fn start(&self, message: impl Into<String>) {
        if let Ok(mut st) = self.state.lock() {
            st.message = Some(message.into());
        }
    }

    /// 停止并清除当前行
    pub fn stop(&self) {
        if let Ok(mut st) = self.state.lock() {
            st.message = None;
            self.clear_line(&mut st);
        }
    }

    /// 停止并打印一行完成提示
    pub fn succeed(&self, message: &str) {
        self.stop();
        if self.visible {
            eprintln!("{} {}", "✔".green(), message);
        }
    }

    pub fn is_spinning(&self) -> bool {
        self.state
            .lock()
            .map(|st| st.message.is_some() && st.suspended == 0)
            .unwrap_or(false)
    }

    /// 暂停绘制并清行；guard drop 后恢复
    pub fn suspend(&self) -> SpinnerPause<'_> {
        if let Ok(mut st) = self.state.lock() {
            st.suspended += 1;
            self.clear_line(&mut st);
        }
        SpinnerPause { spinner: self }
    }

    fn clear_line(&self, st: &mut SpinnerState) {
        if self.visible && st.drawn {
            let mut err = std::io::stderr();
            let _ = queue!(err, MoveToColumn(0), Clear(ClearType::CurrentLine));
            let _ = err.flush();
        }
        st.drawn = false;
    }
}

/// 见 [`Spinner::suspend`]
#[must_use = "spinner resumes as soon as the pause guard is dropped"]
pub struct SpinnerPause<'a> {
    spinner: &'a Spinner,
}

impl Drop for SpinnerPause<'_> {
    fn drop(&mut self) {
        if let Ok(mut st) = self.spinner.state.lock() {
            st.suspended = st.suspended.saturating_sub(1);
        }
    }
}

async fn tick_loop(state: Weak<Mutex<SpinnerState>>) {
    let mut interval = tokio::time::interval(TICK);
    loop {
        interval.tick().await;
        let Some(state) = state.upgrade() else { break };
        let Ok(mut st) = state.lock() else { break };
        if st.suspended > 0 {
            continue;
        }
        let Some(message) = st.message.clone() else {
            continue;
        };
        st.frame = (st.frame + 1) % FRAMES.len();
        let mut err = std::io::stderr();
        let _ = queue!(
            err,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(FRAMES[st.frame].cyan()),
            Print(" "),
            Print(message)
        );
        let _ = err.flush();
        st.drawn = true;
    }
}
