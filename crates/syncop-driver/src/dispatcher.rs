//! Worker 侧调度器
//!
//! 每个运行中的 facade 有一个 `Dispatcher`，由 worker 线程通过亲和性绑定访问。
//! 它是 worker 与 loop 线程之间唯一的通道：提交 action、等待结果、
//! 等待第一次 loop、可中断睡眠，以及读取 loop 线程发布的手柄快照。

use crate::action::Action;
use crate::cancel::CancelToken;
use crate::queue::QueueHandle;
use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, select};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};
use std::time::Duration;
use syncop_hardware::{GamepadPair, HardwareError, HwResult, TelemetryFrame, TelemetrySink};
use tracing::{debug, error, info};

/// Worker 侧调度器
pub struct Dispatcher {
    queue: QueueHandle,
    cancel: CancelToken,
    /// 第一次 loop 时发送端被 drop，接收端随即就绪
    start: Receiver<()>,
    loop_count: AtomicU64,
    tick_thread: ThreadId,
    worker_thread: OnceLock<ThreadId>,
    /// 被 `stop` 隔离后置位
    terminated: AtomicBool,
    gamepads: ArcSwap<GamepadPair>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
}

impl Dispatcher {
    pub(crate) fn new(
        queue: QueueHandle,
        cancel: CancelToken,
        start: Receiver<()>,
        tick_thread: ThreadId,
        telemetry: Option<Arc<dyn TelemetrySink>>,
    ) -> Self {
        Self {
            queue,
            cancel,
            start,
            loop_count: AtomicU64::new(0),
            tick_thread,
            worker_thread: OnceLock::new(),
            terminated: AtomicBool::new(false),
            gamepads: ArcSwap::from_pointee(GamepadPair::default()),
            telemetry,
        }
    }

    /// 提交 action 到 loop 线程，立即返回
    ///
    /// # 错误
    /// - `HardwareError::AffinityMisuse`: 调用方是 loop 线程，或不是本 op mode 的 worker 线程
    /// - `HardwareError::Cancelled`: op mode 正在停止
    pub fn execute_on_loop_thread(&self, action: Action) -> HwResult<()> {
        let me = thread::current().id();
        if me == self.tick_thread {
            error!(
                action = action.label(),
                "execute_on_loop_thread called from the loop thread"
            );
            return Err(HardwareError::AffinityMisuse(
                "execute_on_loop_thread called from the loop thread",
            ));
        }
        if let Some(worker) = self.worker_thread.get()
            && *worker != me
        {
            return Err(HardwareError::AffinityMisuse(
                "execute_on_loop_thread called from a thread other than the op mode's main thread",
            ));
        }
        self.ensure_live()?;
        self.queue.enqueue(action)
    }

    /// 提交 fire-and-forget 操作
    pub fn submit<F>(&self, label: &'static str, f: F) -> HwResult<()>
    where
        F: FnOnce() -> HwResult<()> + Send + 'static,
    {
        self.execute_on_loop_thread(Action::fire_and_forget(label, f))
    }

    /// 提交操作并阻塞等待结果（可被取消打断）
    pub fn call<T, F>(&self, label: &'static str, f: F) -> HwResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> HwResult<T> + Send + 'static,
    {
        let (action, completion) = Action::awaitable(label, f);
        self.execute_on_loop_thread(action)?;
        completion.wait(&self.cancel)
    }

    /// 阻塞直到第一次 loop 发生
    ///
    /// # 错误
    /// - `HardwareError::Cancelled`: 在此之前发生了取消
    /// - `HardwareError::AffinityMisuse`: 在 loop 线程上调用（会死锁）
    pub fn wait_for_start(&self) -> HwResult<()> {
        if thread::current().id() == self.tick_thread {
            return Err(HardwareError::AffinityMisuse(
                "wait_for_start called from the loop thread",
            ));
        }
        if self.loop_count() == 0 {
            select! {
                recv(self.start) -> _ => {},
                recv(self.cancel.receiver()) -> _ => {},
            }
        }
        self.ensure_live()?;
        if self.loop_count() > 0 {
            debug!("wait_for_start released");
            Ok(())
        } else {
            Err(HardwareError::Cancelled)
        }
    }

    /// 可中断睡眠
    pub fn sleep(&self, duration: Duration) -> HwResult<()> {
        self.ensure_live()?;
        if self.cancel.wait_timeout(duration) {
            return Err(HardwareError::Cancelled);
        }
        self.ensure_live()
    }

    /// 阻塞直到一次新的 loop 排空完成
    ///
    /// 返回时 `loop_count` 严格大于调用时的值。调用发生在某次排空进行中时，
    /// 空操作可能在同一次排空里执行，此时再等一轮。
    pub fn wait_for_next_loop(&self) -> HwResult<()> {
        let seen = self.loop_count();
        loop {
            self.call("wait_for_next_loop", || Ok(()))?;
            if self.loop_count() > seen {
                return Ok(());
            }
        }
    }

    /// op mode 是否仍处于活动状态（尚未发出停止）
    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && !self.is_terminated()
    }

    pub fn loop_count(&self) -> u64 {
        self.loop_count.load(Ordering::Acquire)
    }

    pub fn is_loop_thread(&self) -> bool {
        thread::current().id() == self.tick_thread
    }

    pub fn is_main_thread(&self) -> bool {
        self.worker_thread.get() == Some(&thread::current().id())
    }

    /// 最近一次 loop 发布的手柄快照
    pub fn gamepads(&self) -> GamepadPair {
        **self.gamepads.load()
    }

    /// 发布遥测帧（fire-and-forget，在 loop 线程上交给宿主输出）
    pub fn publish_telemetry(&self, frame: TelemetryFrame) -> HwResult<()> {
        let sink = self.telemetry.clone();
        self.submit("telemetry.update", move || {
            match sink {
                Some(sink) => sink.publish(&frame),
                None => debug!(target: "syncop::telemetry", "{}", frame),
            }
            Ok(())
        })
    }

    /// 队列生产端
    ///
    /// 用于在 action 体内（loop 线程上）重入提交新的 action。
    pub fn queue_handle(&self) -> QueueHandle {
        self.queue.clone()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    pub(crate) fn tick_thread(&self) -> ThreadId {
        self.tick_thread
    }

    pub(crate) fn mark_worker_thread(&self) {
        let _ = self.worker_thread.set(thread::current().id());
    }

    /// loop 计数加一，返回新值
    pub(crate) fn advance_loop(&self) -> u64 {
        self.loop_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn store_gamepads(&self, pair: GamepadPair) {
        self.gamepads.store(Arc::new(pair));
    }

    /// 隔离 worker：此后它的所有 facade 交互都返回 `Cancelled`
    pub(crate) fn fence(&self) {
        if !self.terminated.swap(true, Ordering::AcqRel) {
            info!("Worker fenced off from the loop thread");
        }
    }

    fn ensure_live(&self) -> HwResult<()> {
        if self.is_terminated() || self.cancel.is_cancelled() {
            Err(HardwareError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cancel::CancelSource;
    use crate::metrics::FacadeMetrics;
    use crate::queue::{ActionQueue, action_queue};
    use crossbeam_channel::{Sender, bounded};
    use std::time::Instant;

    /// 未启动 worker 的 dispatcher，当前线程作为 loop 线程
    pub(crate) struct Harness {
        pub dispatcher: Arc<Dispatcher>,
        pub queue: ActionQueue,
        pub cancel: CancelSource,
        pub start: Option<Sender<()>>,
    }

    impl Harness {
        pub fn new() -> Self {
            Self::with_tick_thread(thread::current().id())
        }

        pub fn with_tick_thread(tick: ThreadId) -> Self {
            let (handle, queue) = action_queue(1024, Arc::new(FacadeMetrics::new()));
            let cancel = CancelSource::new();
            let (start_tx, start_rx) = bounded(0);
            let dispatcher = Arc::new(Dispatcher::new(handle, cancel.token(), start_rx, tick, None));
            Self {
                dispatcher,
                queue,
                cancel,
                start: Some(start_tx),
            }
        }

        /// 模拟一次 loop
        pub fn tick(&mut self) -> usize {
            self.dispatcher.advance_loop();
            self.start.take();
            self.queue.drain().executed
        }
    }

    #[test]
    fn test_execute_on_loop_thread_rejected_on_tick_thread() {
        let harness = Harness::new();
        let result = harness.dispatcher.submit("write", || Ok(()));
        assert!(matches!(result, Err(HardwareError::AffinityMisuse(_))));
        assert!(harness.dispatcher.is_loop_thread());
    }

    #[test]
    fn test_call_round_trip() {
        let mut harness = Harness::new();
        let dispatcher = Arc::clone(&harness.dispatcher);
        let worker = thread::spawn(move || {
            dispatcher.mark_worker_thread();
            assert!(dispatcher.is_main_thread());
            dispatcher.call("read", || Ok(1120))
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        while !worker.is_finished() && Instant::now() < deadline {
            harness.tick();
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(worker.join().unwrap(), Ok(1120));
    }

    #[test]
    fn test_foreign_thread_rejected_after_worker_marked() {
        let harness = Harness::new();
        let dispatcher = Arc::clone(&harness.dispatcher);
        thread::spawn({
            let dispatcher = Arc::clone(&dispatcher);
            move || dispatcher.mark_worker_thread()
        })
        .join()
        .unwrap();

        let result = thread::spawn(move || dispatcher.submit("write", || Ok(())))
            .join()
            .unwrap();
        assert!(matches!(result, Err(HardwareError::AffinityMisuse(_))));
    }

    #[test]
    fn test_wait_for_start_released_by_first_loop() {
        let mut harness = Harness::new();
        let dispatcher = Arc::clone(&harness.dispatcher);
        let worker = thread::spawn(move || {
            let result = dispatcher.wait_for_start();
            (result, dispatcher.loop_count())
        });

        thread::sleep(Duration::from_millis(20));
        assert!(!worker.is_finished());
        harness.tick();

        let (result, count) = worker.join().unwrap();
        assert_eq!(result, Ok(()));
        assert!(count >= 1);
    }

    #[test]
    fn test_wait_for_start_cancelled() {
        let harness = Harness::new();
        let dispatcher = Arc::clone(&harness.dispatcher);
        let worker = thread::spawn(move || dispatcher.wait_for_start());

        thread::sleep(Duration::from_millis(20));
        harness.cancel.cancel();
        assert_eq!(worker.join().unwrap(), Err(HardwareError::Cancelled));
        assert!(!harness.dispatcher.is_active());
    }

    #[test]
    fn test_sleep_interrupted() {
        let harness = Harness::new();
        let dispatcher = Arc::clone(&harness.dispatcher);
        let worker = thread::spawn(move || {
            let start = Instant::now();
            (dispatcher.sleep(Duration::from_secs(30)), start.elapsed())
        });

        thread::sleep(Duration::from_millis(20));
        harness.cancel.cancel();
        let (result, elapsed) = worker.join().unwrap();
        assert_eq!(result, Err(HardwareError::Cancelled));
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_fenced_dispatcher_rejects_everything() {
        let harness = Harness::with_tick_thread(thread::spawn(|| {}).thread().id());
        harness.dispatcher.fence();
        assert!(harness.dispatcher.is_terminated());
        assert!(!harness.dispatcher.is_active());
        assert_eq!(
            harness.dispatcher.submit("write", || Ok(())),
            Err(HardwareError::Cancelled)
        );
        assert_eq!(
            harness.dispatcher.sleep(Duration::from_millis(1)),
            Err(HardwareError::Cancelled)
        );
    }

    #[test]
    fn test_gamepad_snapshot() {
        let harness = Harness::new();
        let mut pair = GamepadPair::default();
        pair.gamepad1.a = true;
        harness.dispatcher.store_gamepads(pair);
        assert!(harness.dispatcher.gamepads().gamepad1.a);
    }
}
