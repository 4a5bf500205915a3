//! 进程级交互状态：Waiting-For-User 标志
//!
//! askUserInput 读取终端期间为 true；此时 finish 必须被拒绝，Worker 也不会发送 continue。
//! 以 watch 通道承载，等待方 await 标志清除而不是轮询。

use std::sync::Arc;

use tokio::sync::watch;

/// 等待用户输入标志（Clone 后共享同一份状态）
#[derive(Debug, Clone)]
pub struct UserWait {
    tx: Arc<watch::Sender<bool>>,
}

impl UserWait {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_waiting(&self) -> bool {
        *self.tx.borrow()
    }

    /// 置位标志，返回的 guard 在 drop 时清除（包括读取出错的路径）
    pub fn begin(&self) -> UserWaitGuard {
        self.tx.send_replace(true);
        UserWaitGuard { tx: self.tx.clone() }
    }

    /// 等待标志清除；未置位时立即返回
    pub async fn wait_until_clear(&self) {
        let mut rx = self.tx.subscribe();
        // Sender 由 self 持有，wait_for 不会因通道关闭而失败
        let _ = rx.wait_for(|waiting| !*waiting).await;
    }
}

impl Default for UserWait {
    fn default() -> Self {
        Self::new()
    }
}

/// 见 [`UserWait::begin`]
#[derive(Debug)]
pub struct UserWaitGuard {
    tx: Arc<watch::Sender<bool>>,
}

impl Drop for UserWaitGuard {
    fn drop(&mut self) {
        self.tx.send_replace(false);
    }
}
