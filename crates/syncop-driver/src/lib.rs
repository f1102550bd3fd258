//! # SyncOp Driver
//!
//! 同步 op mode facade：让用户代码在独立的 worker 线程上顺序地编写控制逻辑，
//! 而所有硬件操作仍然在宿主的 loop 线程上执行。
//!
//! - Action 队列（MPSC FIFO，每个 tick 排空）
//! - 线程亲和性绑定（worker 线程 → dispatcher）
//! - 设备代理（thunk）与注册表镜像
//! - 钩子系统：loop 前后的回调
//! - 生命周期：`start` / `loop` / `stop`，带宽限期与隔离的停止流程
//!
//! # 示例
//!
//! ```
//! use syncop_driver::{FacadeBuilder, OpMode};
//! use syncop_hardware::HardwareMap;
//!
//! let mut facade = FacadeBuilder::from_fn(|ctx| {
//!     ctx.wait_for_start()?;
//!     ctx.telemetry.add_data("status", "running");
//!     ctx.telemetry.update()?;
//!     Ok(())
//! })
//! .build()
//! .unwrap();
//!
//! facade.start(&HardwareMap::new());
//! facade.loop_tick();
//! facade.stop();
//! ```

pub mod action;
pub mod affinity;
mod builder;
pub mod cancel;
pub mod config;
mod context;
pub mod dispatcher;
mod error;
mod facade;
pub mod hooks;
pub mod metrics;
pub mod mirror;
pub mod queue;
pub mod state;
pub mod thunk;

pub use action::{Action, ActionKind, Completion};
pub use builder::FacadeBuilder;
pub use cancel::{CancelSource, CancelToken};
pub use config::FacadeConfig;
pub use context::{OpModeContext, Telemetry};
pub use dispatcher::Dispatcher;
pub use error::OpModeError;
pub use facade::{OpMode, OpModeFacade, StopOutcome, SyncOpMode, WorkerExit};
pub use hooks::{HookManager, LoopHook};
pub use metrics::{FacadeMetrics, MetricsSnapshot};
pub use queue::{DrainReport, QueueHandle};
pub use state::{AtomicFacadeState, FacadeState};
