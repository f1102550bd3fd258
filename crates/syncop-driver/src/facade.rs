//! 同步 op mode facade
//!
//! 宿主在自己的 tick 线程上调用 `start` / `loop_tick` / `stop`；facade 启动一个 worker 线程
//! 运行用户的顺序代码，并在每次 `loop_tick` 中排空 worker 提交的 action。
//!
//! # 停止流程
//!
//! Rust 无法强制终止线程，`stop` 的做法是：
//! 1. 发出取消，所有挂起点（`wait_for_start`、阻塞读、`sleep`）立即返回 `Cancelled`
//! 2. 在宽限期内等待 worker 退出
//! 3. 超时则隔离（fence）worker：关闭队列、丢弃未执行的 action，
//!    此后它的任何 facade 交互都返回 `Cancelled`，无法再触达硬件
//! 4. 再等待至多 `join_timeout`，仍未退出则分离线程并记录错误
//!
//! `stop` 的总耗时不超过 `grace_period + join_timeout`。

use crate::action::panic_message;
use crate::affinity;
use crate::cancel::CancelSource;
use crate::config::FacadeConfig;
use crate::context::OpModeContext;
use crate::dispatcher::Dispatcher;
use crate::error::OpModeError;
use crate::hooks::HookManager;
use crate::metrics::{FacadeMetrics, MetricsSnapshot};
use crate::mirror::mirror;
use crate::queue::{ActionQueue, action_queue};
use crate::state::{AtomicFacadeState, FacadeState};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use syncop_hardware::{GamepadSource, HardwareMap, TelemetrySink};
use tracing::{debug, error, info, warn};

/// 用户的顺序 op mode
///
/// `main` 在 worker 线程上运行，返回 `Cancelled` 视为正常退出。
///
/// 闭包 `FnMut(&mut OpModeContext) -> Result<(), OpModeError>` 自动实现本 trait。
pub trait SyncOpMode: Send + 'static {
    fn name(&self) -> &str {
        "sync-op-mode"
    }

    fn main(&mut self, ctx: &mut OpModeContext) -> Result<(), OpModeError>;
}

impl<F> SyncOpMode for F
where
    F: FnMut(&mut OpModeContext) -> Result<(), OpModeError> + Send + 'static,
{
    fn main(&mut self, ctx: &mut OpModeContext) -> Result<(), OpModeError> {
        self(ctx)
    }
}

/// 宿主侧生命周期
///
/// 三个方法都在宿主的 tick 线程上调用，都不会 panic 到宿主，且都在有限时间内返回。
pub trait OpMode {
    /// 在第一次 `loop_tick` 之前调用一次
    fn start(&mut self, hardware: &HardwareMap);

    /// 以固定周期调用
    fn loop_tick(&mut self);

    /// 调用一次
    fn stop(&mut self) -> StopOutcome;
}

/// `stop` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// worker 在宽限期内退出
    Joined,
    /// worker 超出宽限期，被隔离后退出
    Fenced,
    /// worker 被隔离后仍未退出，线程已分离
    Abandoned,
    /// 从未 `start`
    NotStarted,
    /// 重复调用
    AlreadyStopped,
}

impl StopOutcome {
    /// worker 是否已确认退出（或从未运行）
    pub fn worker_exited(self) -> bool {
        !matches!(self, Self::Abandoned)
    }
}

/// worker 的退出方式
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerExit {
    /// `main` 正常返回
    Returned,
    /// `main` 因取消而返回
    Cancelled,
    /// `main` 返回错误
    Failed(OpModeError),
    /// `main` panic
    Panicked(String),
}

/// worker 线程句柄
///
/// 退出信号：worker 持有的 `Sender` 在线程函数返回时 drop，`exited` 随即断开。
/// 亲和性绑定先于该 `Sender` 释放，因此观察到退出时绑定已经清除。
struct WorkerHandle {
    handle: JoinHandle<()>,
    exited: Receiver<()>,
}

impl WorkerHandle {
    /// 等待 worker 退出，至多 `timeout`
    fn wait_exit(&self, timeout: Duration) -> bool {
        matches!(
            self.exited.recv_timeout(timeout),
            Err(RecvTimeoutError::Disconnected)
        )
    }
}

/// 一次运行期间的状态（`start` 创建，`stop` 释放）
struct Running {
    dispatcher: Arc<Dispatcher>,
    queue: ActionQueue,
    cancel: CancelSource,
    /// 第一次 loop 时 drop，释放 `wait_for_start`
    start_signal: Option<Sender<()>>,
    worker: Option<WorkerHandle>,
    mirror: HardwareMap,
}

/// 同步 op mode facade
pub struct OpModeFacade {
    config: FacadeConfig,
    op_mode: Option<Box<dyn SyncOpMode>>,
    name: String,
    state: AtomicFacadeState,
    hooks: HookManager,
    metrics: Arc<FacadeMetrics>,
    gamepads: Option<Arc<dyn GamepadSource>>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
    exit: Arc<Mutex<Option<WorkerExit>>>,
    running: Option<Running>,
}

impl OpModeFacade {
    pub(crate) fn new(
        config: FacadeConfig,
        op_mode: Box<dyn SyncOpMode>,
        hooks: HookManager,
        gamepads: Option<Arc<dyn GamepadSource>>,
        telemetry: Option<Arc<dyn TelemetrySink>>,
    ) -> Self {
        let name = op_mode.name().to_string();
        Self {
            config,
            op_mode: Some(op_mode),
            name,
            state: AtomicFacadeState::default(),
            hooks,
            metrics: Arc::new(FacadeMetrics::new()),
            gamepads,
            telemetry,
            exit: Arc::new(Mutex::new(None)),
            running: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &FacadeConfig {
        &self.config
    }

    pub fn state(&self) -> FacadeState {
        self.state.get()
    }

    pub fn loop_count(&self) -> u64 {
        self.metrics.loops.load(Ordering::Relaxed)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 镜像注册表（仅在运行期间存在）
    pub fn mirror(&self) -> Option<&HardwareMap> {
        self.running.as_ref().map(|r| &r.mirror)
    }

    /// worker 的退出方式（尚未退出时为 `None`）
    pub fn worker_exit(&self) -> Option<WorkerExit> {
        self.exit.lock().clone()
    }

    /// 队列中尚未执行的 action 数
    pub fn pending_actions(&self) -> usize {
        self.running.as_ref().map_or(0, |r| r.queue.len())
    }

    /// 状态迁移；失败说明状态机被破坏，记录后返回 `false`
    fn advance_state(&self, from: FacadeState, to: FacadeState) -> bool {
        match self.state.transition(from, to) {
            Ok(()) => true,
            Err(actual) => {
                warn!(
                    op_mode = %self.name,
                    ?from,
                    ?to,
                    ?actual,
                    "Unexpected facade state transition"
                );
                false
            },
        }
    }

    fn launch(&mut self, hardware: &HardwareMap) -> Result<Running, OpModeError> {
        let op_mode = self
            .op_mode
            .take()
            .ok_or_else(|| OpModeError::user("op mode already consumed"))?;

        let mirror = mirror(hardware);
        let (handle, queue) = action_queue(self.config.queue_high_water, Arc::clone(&self.metrics));
        let cancel = CancelSource::new();
        let (start_tx, start_rx) = bounded(0);
        let dispatcher = Arc::new(Dispatcher::new(
            handle,
            cancel.token(),
            start_rx,
            thread::current().id(),
            self.telemetry.clone(),
        ));

        let (exit_tx, exit_rx) = bounded::<()>(0);
        let worker_dispatcher = Arc::clone(&dispatcher);
        let worker_mirror = mirror.clone();
        let exit_slot = Arc::clone(&self.exit);
        let handle = thread::Builder::new()
            .name(self.config.worker_thread_name.clone())
            .spawn(move || {
                run_worker(op_mode, worker_dispatcher, worker_mirror, exit_slot, exit_tx)
            })
            .map_err(|e| OpModeError::user(format!("failed to spawn worker thread: {e}")))?;

        Ok(Running {
            dispatcher,
            queue,
            cancel,
            start_signal: Some(start_tx),
            worker: Some(WorkerHandle {
                handle,
                exited: exit_rx,
            }),
            mirror,
        })
    }

    fn shutdown(&mut self, mut running: Running) -> StopOutcome {
        let started = Instant::now();
        running.cancel.cancel();
        running.start_signal.take();

        let grace = self.config.grace_period();
        let join_timeout = self.config.join_timeout();

        let outcome = match running.worker.take() {
            None => StopOutcome::Joined,
            Some(worker) => {
                if worker.wait_exit(grace) {
                    join_worker(worker);
                    StopOutcome::Joined
                } else {
                    warn!(
                        op_mode = %self.name,
                        ?grace,
                        "Worker ignored cancellation; fencing it off"
                    );
                    running.dispatcher.fence();
                    if worker.wait_exit(join_timeout) {
                        join_worker(worker);
                        StopOutcome::Fenced
                    } else {
                        error!(
                            op_mode = %self.name,
                            budget = ?(grace + join_timeout),
                            "Worker failed to exit; detaching it (it can no longer reach hardware)"
                        );
                        drop(worker.handle);
                        StopOutcome::Abandoned
                    }
                }
            },
        };

        // 先隔离再关闭队列：worker 之后的提交全部失败
        running.dispatcher.fence();
        let discarded = running.queue.close();
        if discarded > 0 {
            debug!(discarded, "Pending actions discarded at stop");
        }
        info!(
            op_mode = %self.name,
            ?outcome,
            elapsed = ?started.elapsed(),
            "Op mode stopped"
        );
        outcome
    }
}

fn join_worker(worker: WorkerHandle) {
    if worker.handle.join().is_err() {
        error!("Worker thread panicked outside of main");
    }
}

fn run_worker(
    mut op_mode: Box<dyn SyncOpMode>,
    dispatcher: Arc<Dispatcher>,
    mirror: HardwareMap,
    exit_slot: Arc<Mutex<Option<WorkerExit>>>,
    exit_signal: Sender<()>,
) {
    // drop 顺序与声明相反：绑定先解除，退出信号后发出
    let _exit_signal = exit_signal;
    let _binding = match affinity::bind(Arc::clone(&dispatcher)) {
        Ok(guard) => guard,
        Err(e) => {
            error!(error = %e, "Failed to bind worker thread");
            *exit_slot.lock() = Some(WorkerExit::Failed(e.into()));
            return;
        },
    };
    dispatcher.mark_worker_thread();

    let name = op_mode.name().to_string();
    let mut ctx = OpModeContext::new(Arc::clone(&dispatcher), mirror);
    info!(op_mode = %name, "Worker started");

    let exit = match panic::catch_unwind(AssertUnwindSafe(|| op_mode.main(&mut ctx))) {
        Ok(Ok(())) => {
            info!(op_mode = %name, "main returned");
            WorkerExit::Returned
        },
        Ok(Err(e)) if e.is_cancelled() => {
            info!(op_mode = %name, "main exited on cancellation");
            WorkerExit::Cancelled
        },
        Ok(Err(e)) => {
            error!(op_mode = %name, error = %e, "main failed");
            WorkerExit::Failed(e)
        },
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(op_mode = %name, panic = %message, "main panicked");
            WorkerExit::Panicked(message)
        },
    };
    drop(ctx);
    drop(op_mode);
    *exit_slot.lock() = Some(exit);
}

impl OpMode for OpModeFacade {
    fn start(&mut self, hardware: &HardwareMap) {
        if self.state.get() != FacadeState::Constructed {
            warn!(state = ?self.state.get(), "start() called twice; ignoring");
            return;
        }
        match self.launch(hardware) {
            Ok(running) => {
                let devices = running.mirror.len();
                self.running = Some(running);
                self.advance_state(FacadeState::Constructed, FacadeState::Started);
                info!(op_mode = %self.name, devices, "Op mode started");
            },
            Err(e) => {
                error!(op_mode = %self.name, error = %e, "Failed to start op mode");
                self.advance_state(FacadeState::Constructed, FacadeState::Stopped);
            },
        }
    }

    fn loop_tick(&mut self) {
        if !self.state.get().is_started() {
            warn!(state = ?self.state.get(), "loop() called while not started; ignoring");
            return;
        }
        let Some(running) = self.running.as_mut() else {
            return;
        };
        if thread::current().id() != running.dispatcher.tick_thread() {
            error!("loop() called from a thread other than the one that called start(); ignoring");
            return;
        }

        let tick = running.dispatcher.advance_loop();
        self.metrics.loops.fetch_add(1, Ordering::Relaxed);
        if let Some(source) = &self.gamepads {
            running.dispatcher.store_gamepads(source.gamepads());
        }

        let pre_failures = self.hooks.run_pre(tick);
        if running.start_signal.take().is_some() {
            debug!(op_mode = %self.name, "First loop; releasing wait_for_start");
        }
        let report = running.queue.drain();
        let post_failures = self.hooks.run_post(tick, &report);

        let failures = (pre_failures + post_failures) as u64;
        if failures > 0 {
            self.metrics.hook_failures.fetch_add(failures, Ordering::Relaxed);
        }
    }

    fn stop(&mut self) -> StopOutcome {
        match self.state.get() {
            FacadeState::Constructed => {
                warn!(op_mode = %self.name, "stop() called before start()");
                self.advance_state(FacadeState::Constructed, FacadeState::Stopped);
                return StopOutcome::NotStarted;
            },
            FacadeState::Stopping | FacadeState::Stopped => {
                debug!(op_mode = %self.name, "stop() called twice");
                return StopOutcome::AlreadyStopped;
            },
            FacadeState::Started => {},
        }

        self.advance_state(FacadeState::Started, FacadeState::Stopping);
        let outcome = match self.running.take() {
            Some(running) => {
                if thread::current().id() != running.dispatcher.tick_thread() {
                    warn!("stop() called from a thread other than the one that called start()");
                }
                self.shutdown(running)
            },
            None => StopOutcome::Joined,
        };
        self.advance_state(FacadeState::Stopping, FacadeState::Stopped);
        outcome
    }
}

impl Drop for OpModeFacade {
    fn drop(&mut self) {
        if self.state.get().is_started() {
            warn!(op_mode = %self.name, "Op mode dropped without stop(); stopping now");
            let _ = self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FacadeBuilder;
    use syncop_hardware::HardwareError;

    fn run_until(facade: &mut OpModeFacade, done: impl Fn(&OpModeFacade) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done(facade) && Instant::now() < deadline {
            facade.loop_tick();
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_lifecycle_states() {
        let mut facade = FacadeBuilder::from_fn(|ctx| {
            ctx.wait_for_start()?;
            Ok(())
        })
        .build()
        .unwrap();
        assert_eq!(facade.state(), FacadeState::Constructed);

        facade.start(&HardwareMap::new());
        assert_eq!(facade.state(), FacadeState::Started);
        assert!(facade.mirror().is_some());

        run_until(&mut facade, |f| f.worker_exit().is_some());
        assert_eq!(facade.worker_exit(), Some(WorkerExit::Returned));

        assert_eq!(facade.stop(), StopOutcome::Joined);
        assert_eq!(facade.state(), FacadeState::Stopped);
        assert!(facade.mirror().is_none());
        assert_eq!(facade.stop(), StopOutcome::AlreadyStopped);
    }

    #[test]
    fn test_state_transition_from_wrong_state_is_rejected() {
        let mut facade = FacadeBuilder::from_fn(|_| Ok(())).build().unwrap();
        assert!(!facade.advance_state(FacadeState::Started, FacadeState::Stopping));
        assert_eq!(facade.state(), FacadeState::Constructed);

        assert!(facade.advance_state(FacadeState::Constructed, FacadeState::Stopped));
        assert!(!facade.advance_state(FacadeState::Constructed, FacadeState::Started));
        assert_eq!(facade.state(), FacadeState::Stopped);
        assert_eq!(facade.stop(), StopOutcome::AlreadyStopped);
    }

    #[test]
    fn test_stop_before_start() {
        let mut facade = FacadeBuilder::from_fn(|_| Ok(()))
            .build()
            .unwrap();
        assert_eq!(facade.stop(), StopOutcome::NotStarted);
        // 停止后再 start 被忽略
        facade.start(&HardwareMap::new());
        assert_eq!(facade.state(), FacadeState::Stopped);
        facade.loop_tick();
        assert_eq!(facade.loop_count(), 0);
    }

    #[test]
    fn test_loop_before_start_ignored() {
        let mut facade = FacadeBuilder::from_fn(|_| Ok(()))
            .build()
            .unwrap();
        facade.loop_tick();
        assert_eq!(facade.loop_count(), 0);
    }

    #[test]
    fn test_main_error_recorded() {
        let mut facade = FacadeBuilder::from_fn(|_| Err(OpModeError::user("no autonomous selected")))
        .build()
        .unwrap();
        facade.start(&HardwareMap::new());
        run_until(&mut facade, |f| f.worker_exit().is_some());
        assert_eq!(
            facade.worker_exit(),
            Some(WorkerExit::Failed(OpModeError::user("no autonomous selected")))
        );
        assert_eq!(facade.stop(), StopOutcome::Joined);
    }

    #[test]
    fn test_main_panic_contained() {
        let mut facade = FacadeBuilder::from_fn(|_| panic!("user bug"))
        .build()
        .unwrap();
        facade.start(&HardwareMap::new());
        run_until(&mut facade, |f| f.worker_exit().is_some());
        assert_eq!(
            facade.worker_exit(),
            Some(WorkerExit::Panicked("user bug".to_string()))
        );
        assert_eq!(facade.stop(), StopOutcome::Joined);
    }

    #[test]
    fn test_loop_from_foreign_thread_ignored() {
        let mut facade = FacadeBuilder::from_fn(|ctx| {
            ctx.wait_for_start()?;
            Ok(())
        })
        .build()
        .unwrap();
        facade.start(&HardwareMap::new());

        let facade = thread::spawn(move || {
            let mut facade = facade;
            facade.loop_tick();
            facade
        })
        .join()
        .unwrap();
        assert_eq!(facade.loop_count(), 0);

        let mut facade = facade;
        assert_eq!(facade.stop(), StopOutcome::Joined);
        assert_eq!(facade.worker_exit(), Some(WorkerExit::Cancelled));
    }

    #[test]
    fn test_drop_stops_worker() {
        let exit = {
            let mut facade = FacadeBuilder::from_fn(|ctx| {
                ctx.wait_for_start()?;
                Err(HardwareError::Device("unreachable".into()).into())
            })
            .grace_period(Duration::from_millis(200))
            .build()
            .unwrap();
            facade.start(&HardwareMap::new());
            Arc::clone(&facade.exit)
        };
        assert_eq!(*exit.lock(), Some(WorkerExit::Cancelled));
    }
}
