//! 任务调度：运行锁与工具执行槽
//!
//! 两种互斥策略刻意不同：
//! - 运行锁（Worker Loop 级）：排队等待，tokio Mutex 按 FIFO 公平唤醒，同一时刻只有一个任务在跑；
//! - 工具执行槽（单次工具调用级）：只 try_acquire，不排队；被占用时调用方直接得到「另一个工具正在运行」。

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, OwnedSemaphorePermit, Semaphore};

/// 运行许可：持有期间其他 Worker 运行在 acquire_run 上排队，drop 即释放
pub type RunPermit = OwnedMutexGuard<()>;

/// 工具执行许可：持有期间其他工具调用会被立即拒绝，drop 即释放
pub type ToolPermit = OwnedSemaphorePermit;

/// 任务调度器（进程内共享一份，通常以 Arc 传递）
#[derive(Debug)]
pub struct TaskScheduler {
    run_lock: Arc<Mutex<()>>,
    tool_slot: Arc<Semaphore>,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self {
            run_lock: Arc::new(Mutex::new(())),
            tool_slot: Arc::new(Semaphore::new(1)),
        }
    }

    /// 获取运行锁；已有任务在跑时排队等待
    pub async fn acquire_run(&self) -> RunPermit {
        self.run_lock.clone().lock_owned().await
    }

    /// 尝试获取工具执行槽；已被占用时返回 None（不排队）
    pub fn try_acquire_tool(&self) -> Option<ToolPermit> {
        self.tool_slot.clone().try_acquire_owned().ok()
    }

    /// 当前是否有工具正在执行
    pub fn tool_busy(&self) -> bool {
        self.tool_slot.available_permits() == 0
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}
