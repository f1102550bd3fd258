//! 取消信号
//!
//! [`CancelSource`] 持有一个永远不发送数据的 `Sender`，`cancel()` 时将其 drop，
//! 所有 [`CancelToken`] 持有的 `Receiver` 随即进入 Disconnected 状态。
//! 因此 token 可以直接放进 `select!` 与其他通道一起等待。

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// 取消信号的发起方（由 facade 持有）
#[derive(Debug)]
pub struct CancelSource {
    flag: Arc<AtomicBool>,
    tx: Mutex<Option<Sender<()>>>,
    rx: Receiver<()>,
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            tx: Mutex::new(Some(tx)),
            rx,
        }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            flag: Arc::clone(&self.flag),
            rx: self.rx.clone(),
        }
    }

    /// 发出取消（幂等）
    ///
    /// 返回是否是本次调用发出的取消。
    pub fn cancel(&self) -> bool {
        // 先置位，再断开通道：被唤醒的等待者一定能看到 flag
        let first = !self.flag.swap(true, Ordering::AcqRel);
        self.tx.lock().take();
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// 取消信号的观察方（可克隆，跨线程传递）
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    rx: Receiver<()>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// 用于 `select!` 的接收端，取消后立即就绪（Disconnected）
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }

    /// 阻塞至多 `timeout`
    ///
    /// 返回 `true` 表示期间发生了取消。
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }
        match self.rx.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => self.is_cancelled(),
            Err(RecvTimeoutError::Disconnected) | Ok(()) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_cancel_is_idempotent() {
        let source = CancelSource::new();
        let token = source.token();
        assert!(!token.is_cancelled());
        assert!(source.cancel());
        assert!(!source.cancel());
        assert!(token.is_cancelled());
        assert!(source.is_cancelled());
    }

    #[test]
    fn test_wait_timeout_without_cancel() {
        let source = CancelSource::new();
        let token = source.token();
        let start = Instant::now();
        assert!(!token.wait_timeout(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_cancel_wakes_waiter() {
        let source = CancelSource::new();
        let token = source.token();

        let waiter = thread::spawn(move || {
            let start = Instant::now();
            let cancelled = token.wait_timeout(Duration::from_secs(10));
            (cancelled, start.elapsed())
        });

        thread::sleep(Duration::from_millis(20));
        source.cancel();

        let (cancelled, elapsed) = waiter.join().unwrap();
        assert!(cancelled);
        assert!(elapsed < Duration::from_secs(5));
    }
}
