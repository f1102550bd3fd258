//! Action 队列
//!
//! 多生产者单消费者 FIFO（crossbeam unbounded channel）。消费者始终是 loop 线程。
//!
//! # 排空语义
//!
//! [`ActionQueue::drain`] 只执行进入时已在 channel 中的 action，worker 在排空过程中
//! 新提交的 action 留到下一个 tick。action 体在 loop 线程上重入提交的 action
//! 走 tick 本地通道，在同一个 tick 内排空到底。每个 action 执行完成后才取下一个。

use crate::action::{Action, ActionKind};
use crate::metrics::FacadeMetrics;
use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use syncop_hardware::{HardwareError, HwResult};
use tracing::{debug, trace, warn};

/// 创建队列，返回（生产端，消费端）
pub fn action_queue(high_water: usize, metrics: Arc<FacadeMetrics>) -> (QueueHandle, ActionQueue) {
    let (tx, rx) = unbounded();
    let alerted = Arc::new(AtomicBool::new(false));
    let local = Arc::new(Mutex::new(LocalLane::default()));
    let handle = QueueHandle {
        tx,
        local: Arc::clone(&local),
        high_water,
        alerted: Arc::clone(&alerted),
        metrics: Arc::clone(&metrics),
    };
    let queue = ActionQueue {
        rx,
        local,
        high_water,
        alerted,
        metrics,
    };
    (handle, queue)
}

/// 排空期间 loop 线程自己提交的 action
#[derive(Debug, Default)]
struct LocalLane {
    /// 正在排空的线程
    owner: Option<ThreadId>,
    pending: VecDeque<Action>,
}

/// 队列生产端（可克隆）
#[derive(Debug, Clone)]
pub struct QueueHandle {
    tx: Sender<Action>,
    local: Arc<Mutex<LocalLane>>,
    high_water: usize,
    alerted: Arc<AtomicBool>,
    metrics: Arc<FacadeMetrics>,
}

impl QueueHandle {
    /// 入队，从不阻塞
    ///
    /// 在排空中的 loop 线程上调用时，action 进入 tick 本地通道，本 tick 内执行。
    ///
    /// # 错误
    /// - `HardwareError::Cancelled`: 队列已被 `stop` 关闭
    pub fn enqueue(&self, action: Action) -> HwResult<()> {
        let label = action.label();
        let action = {
            let mut local = self.local.lock();
            if local.owner == Some(thread::current().id()) {
                local.pending.push_back(action);
                self.metrics.actions_enqueued.fetch_add(1, Ordering::Relaxed);
                trace!(action = label, "Action enqueued re-entrantly");
                return Ok(());
            }
            action
        };

        self.tx.send(action).map_err(|_| HardwareError::Cancelled)?;
        self.metrics.actions_enqueued.fetch_add(1, Ordering::Relaxed);

        let depth = self.tx.len();
        self.metrics.observe_depth(depth);
        if depth > self.high_water && !self.alerted.swap(true, Ordering::Relaxed) {
            self.metrics.high_water_alerts.fetch_add(1, Ordering::Relaxed);
            warn!(
                depth,
                high_water = self.high_water,
                last = label,
                "Action queue above high-water mark; is the host still calling loop()?"
            );
        }
        trace!(action = label, depth, "Action enqueued");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

/// 一次排空的统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    /// 执行的 action 数（含失败）
    pub executed: usize,
    /// 失败的 action 数
    pub failed: usize,
    /// 耗时
    pub elapsed: Duration,
}

/// 队列消费端（仅 loop 线程持有）
#[derive(Debug)]
pub struct ActionQueue {
    rx: Receiver<Action>,
    local: Arc<Mutex<LocalLane>>,
    high_water: usize,
    alerted: Arc<AtomicBool>,
    metrics: Arc<FacadeMetrics>,
}

impl ActionQueue {
    /// 取出一个 action（非阻塞）
    pub fn poll(&self) -> Option<Action> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// 排空队列
    ///
    /// 先按 FIFO 执行进入时 channel 中已有的 action（数量以进入时的快照为上限），
    /// 再把本 tick 内重入提交的 action 执行到本地通道为空。
    ///
    /// action 的失败不会越过本函数：awaitable 的错误已写入其完成槽，
    /// fire-and-forget 的错误在这里记录日志后丢弃。
    pub fn drain(&self) -> DrainReport {
        let start = Instant::now();
        let mut report = DrainReport::default();
        self.local.lock().owner = Some(thread::current().id());

        let budget = self.rx.len();
        for _ in 0..budget {
            let Ok(action) = self.rx.try_recv() else {
                break;
            };
            self.execute(action, &mut report);
        }
        loop {
            let next = self.local.lock().pending.pop_front();
            let Some(action) = next else {
                break;
            };
            self.execute(action, &mut report);
        }

        self.local.lock().owner = None;
        let remaining = self.rx.len();
        if remaining > 0 {
            trace!(remaining, "Actions submitted during drain deferred to next loop");
        }
        if remaining <= self.high_water / 2 {
            self.alerted.store(false, Ordering::Relaxed);
        }
        report.elapsed = start.elapsed();
        report
    }

    fn execute(&self, action: Action, report: &mut DrainReport) {
        let label = action.label();
        let kind = action.kind();

        let result = action.run();
        report.executed += 1;
        self.metrics.actions_executed.fetch_add(1, Ordering::Relaxed);

        if let Err(e) = result {
            report.failed += 1;
            self.metrics.actions_failed.fetch_add(1, Ordering::Relaxed);
            match kind {
                ActionKind::FireAndForget => {
                    warn!(action = label, error = %e, "Fire-and-forget action failed");
                },
                ActionKind::Awaitable => {
                    debug!(action = label, error = %e, "Awaitable action failed");
                },
            }
        } else {
            trace!(action = label, "Action executed");
        }
    }

    /// 关闭队列
    ///
    /// 未执行的 action 被丢弃（其完成槽随之释放，等待方得到 `Cancelled`），
    /// 之后所有入队操作都会失败。返回丢弃数量。
    pub fn close(self) -> usize {
        let mut discarded = 0;
        while let Ok(action) = self.rx.try_recv() {
            debug!(action = action.label(), "Discarding pending action");
            discarded += 1;
        }
        let stranded = std::mem::take(&mut self.local.lock().pending);
        discarded += stranded.len();
        self.metrics
            .actions_discarded
            .fetch_add(discarded as u64, Ordering::Relaxed);
        discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelSource;
    use proptest::prelude::*;

    fn queue() -> (QueueHandle, ActionQueue, Arc<FacadeMetrics>) {
        let metrics = Arc::new(FacadeMetrics::new());
        let (handle, queue) = action_queue(4, Arc::clone(&metrics));
        (handle, queue, metrics)
    }

    #[test]
    fn test_drain_fifo() {
        let (handle, queue, metrics) = queue();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..5 {
            let log = Arc::clone(&log);
            handle
                .enqueue(Action::fire_and_forget("push", move || {
                    log.lock().push(i);
                    Ok(())
                }))
                .unwrap();
        }
        assert_eq!(queue.len(), 5);

        let report = queue.drain();
        assert_eq!(report.executed, 5);
        assert_eq!(report.failed, 0);
        assert!(queue.is_empty());
        assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.actions_enqueued, 5);
        assert_eq!(snapshot.actions_executed, 5);
        assert_eq!(snapshot.queue_depth_max, 5);
    }

    #[test]
    fn test_drain_includes_reentrant_actions() {
        let (handle, queue, _) = queue();
        let log = Arc::new(Mutex::new(Vec::new()));

        let inner_log = Arc::clone(&log);
        let inner_handle = handle.clone();
        handle
            .enqueue(Action::fire_and_forget("outer", move || {
                inner_log.lock().push("outer");
                let log = Arc::clone(&inner_log);
                inner_handle.enqueue(Action::fire_and_forget("inner", move || {
                    log.lock().push("inner");
                    Ok(())
                }))
            }))
            .unwrap();

        let report = queue.drain();
        assert_eq!(report.executed, 2);
        assert_eq!(*log.lock(), vec!["outer", "inner"]);
    }

    #[test]
    fn test_drain_defers_foreign_submissions() {
        let (handle, queue, _) = queue();
        let log = Arc::new(Mutex::new(Vec::new()));

        // action 体内由另一个线程（模拟 worker）提交：不属于本次排空
        let producer = handle.clone();
        let producer_log = Arc::clone(&log);
        handle
            .enqueue(Action::fire_and_forget("first", move || {
                producer_log.lock().push("first");
                let log = Arc::clone(&producer_log);
                let producer = producer.clone();
                thread::spawn(move || {
                    producer.enqueue(Action::fire_and_forget("late", move || {
                        log.lock().push("late");
                        Ok(())
                    }))
                })
                .join()
                .unwrap()
            }))
            .unwrap();

        let report = queue.drain();
        assert_eq!(report.executed, 1);
        assert_eq!(queue.len(), 1);
        assert_eq!(*log.lock(), vec!["first"]);

        let report = queue.drain();
        assert_eq!(report.executed, 1);
        assert!(queue.is_empty());
        assert_eq!(*log.lock(), vec!["first", "late"]);
    }

    #[test]
    fn test_drain_is_bounded_by_entry_snapshot() {
        let (handle, queue, _) = queue();
        let refill = handle.clone();
        handle
            .enqueue(Action::fire_and_forget("refill", move || {
                let refill = refill.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        refill.enqueue(Action::fire_and_forget("noop", || Ok(())))?;
                    }
                    Ok(())
                })
                .join()
                .unwrap()
            }))
            .unwrap();
        handle
            .enqueue(Action::fire_and_forget("second", || Ok(())))
            .unwrap();

        assert_eq!(queue.drain().executed, 2);
        assert_eq!(queue.len(), 10);
        assert_eq!(queue.drain().executed, 10);
    }

    #[test]
    fn test_high_water_alert_fires_once_and_rearms() {
        let (handle, queue, metrics) = queue();
        let noop = || Action::fire_and_forget("noop", || Ok(()));

        for _ in 0..4 {
            handle.enqueue(noop()).unwrap();
        }
        assert_eq!(metrics.snapshot().high_water_alerts, 0);
        assert!(!queue.alerted.load(Ordering::Relaxed));

        for _ in 0..6 {
            handle.enqueue(noop()).unwrap();
        }
        assert_eq!(metrics.snapshot().high_water_alerts, 1);
        assert!(queue.alerted.load(Ordering::Relaxed));

        queue.drain();
        assert!(!queue.alerted.load(Ordering::Relaxed));

        for _ in 0..5 {
            handle.enqueue(noop()).unwrap();
        }
        assert_eq!(metrics.snapshot().high_water_alerts, 2);
    }

    #[test]
    fn test_failures_are_contained() {
        let (handle, queue, metrics) = queue();
        handle
            .enqueue(Action::fire_and_forget("err", || {
                Err(HardwareError::ActionFailed("bad".to_string()))
            }))
            .unwrap();
        handle
            .enqueue(Action::fire_and_forget("panic", || panic!("boom")))
            .unwrap();
        handle
            .enqueue(Action::fire_and_forget("ok", || Ok(())))
            .unwrap();

        let report = queue.drain();
        assert_eq!(report.executed, 3);
        assert_eq!(report.failed, 2);
        assert_eq!(metrics.snapshot().actions_failed, 2);
    }

    #[test]
    fn test_close_discards_and_rejects() {
        let (handle, queue, metrics) = queue();
        let source = CancelSource::new();
        let (action, completion) = Action::awaitable("read", || Ok(1));
        handle.enqueue(action).unwrap();
        handle
            .enqueue(Action::fire_and_forget("write", || Ok(())))
            .unwrap();

        assert_eq!(queue.close(), 2);
        assert_eq!(metrics.snapshot().actions_discarded, 2);
        assert_eq!(completion.wait(&source.token()), Err(HardwareError::Cancelled));
        assert_eq!(
            handle.enqueue(Action::fire_and_forget("late", || Ok(()))),
            Err(HardwareError::Cancelled)
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// 任意位置插入一次排空，执行顺序仍等于提交顺序
        #[test]
        fn drains_preserve_submission_order(
            values in proptest::collection::vec(any::<u16>(), 0..64),
            split in 0usize..64,
        ) {
            let (handle, queue, _) = queue();
            let log = Arc::new(Mutex::new(Vec::new()));
            let split = split.min(values.len());

            for (i, &value) in values.iter().enumerate() {
                if i == split {
                    queue.drain();
                }
                let log = Arc::clone(&log);
                handle
                    .enqueue(Action::fire_and_forget("push", move || {
                        log.lock().push(value);
                        Ok(())
                    }))
                    .unwrap();
            }
            queue.drain();

            prop_assert!(queue.is_empty());
            prop_assert_eq!(&*log.lock(), &values);
        }
    }
}
