//! # SyncOp SDK
//!
//! 在 tick 驱动的宿主上编写顺序式 op mode。
//!
//! ## 分层架构
//!
//! - **硬件层** (`syncop-hardware`): 设备 trait、设备注册表、手柄与遥测、仿真设备
//! - **驱动层** (`syncop-driver`): action 队列、线程亲和性、设备代理、同步 facade
//! - **SDK 层** (本 crate): 统一导出与日志初始化
//!
//! ## 快速开始
//!
//! ```
//! use syncop_sdk::prelude::*;
//! use std::time::Duration;
//!
//! let mut facade = FacadeBuilder::from_fn(|ctx| {
//!     ctx.wait_for_start()?;
//!     while ctx.op_mode_is_active() {
//!         ctx.telemetry.add_data("loop", ctx.loop_count());
//!         ctx.telemetry.update()?;
//!         ctx.sleep(Duration::from_millis(5))?;
//!     }
//!     Ok(())
//! })
//! .build()
//! .unwrap();
//!
//! // 宿主侧：start → loop × N → stop，全部在同一个线程上
//! facade.start(&HardwareMap::new());
//! for _ in 0..3 {
//!     facade.loop_tick();
//! }
//! assert!(facade.stop().worker_exited());
//! ```

pub mod logging;
pub mod prelude;

// 底层 crate
pub use syncop_driver as driver;
pub use syncop_hardware as hardware;

// 同步 facade（最常用）
pub use syncop_driver::{
    FacadeBuilder, FacadeConfig, OpMode, OpModeContext, OpModeError, OpModeFacade, StopOutcome,
    SyncOpMode, Telemetry, WorkerExit,
};

// 高级 API
pub use syncop_driver::{
    Action, ActionKind, CancelToken, Completion, Dispatcher, DrainReport, FacadeState, LoopHook,
    MetricsSnapshot, QueueHandle,
};

// 设备与注册表
pub use syncop_hardware::{
    Device, DeviceKind, DeviceMapping, Gamepad, GamepadPair, GamepadSource, HardwareError,
    HardwareMap, HwResult, TelemetryFrame, TelemetrySink,
};

#[cfg(feature = "sim")]
pub use syncop_hardware::sim;
