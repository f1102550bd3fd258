//! Builder 模式实现
//!
//! 提供链式构造 [`OpModeFacade`] 的便捷方式。

use crate::config::FacadeConfig;
use crate::context::OpModeContext;
use crate::error::OpModeError;
use crate::facade::{OpModeFacade, SyncOpMode};
use crate::hooks::{HookManager, LoopHook};
use std::sync::Arc;
use std::time::Duration;
use syncop_hardware::{GamepadSource, TelemetrySink};

/// Facade Builder（链式构造）
///
/// # Example
///
/// ```
/// use syncop_driver::{FacadeBuilder, OpMode};
/// use syncop_hardware::HardwareMap;
/// use std::time::Duration;
///
/// let mut facade = FacadeBuilder::from_fn(|ctx| {
///     ctx.wait_for_start()?;
///     while ctx.op_mode_is_active() {
///         ctx.sleep(Duration::from_millis(10))?;
///     }
///     Ok(())
/// })
/// .grace_period(Duration::from_millis(50))
/// .build()
/// .unwrap();
///
/// facade.start(&HardwareMap::new());
/// facade.loop_tick();
/// facade.stop();
/// ```
pub struct FacadeBuilder {
    op_mode: Box<dyn SyncOpMode>,
    config: FacadeConfig,
    hooks: HookManager,
    gamepads: Option<Arc<dyn GamepadSource>>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
}

impl FacadeBuilder {
    pub fn new(op_mode: impl SyncOpMode) -> Self {
        Self {
            op_mode: Box::new(op_mode),
            config: FacadeConfig::default(),
            hooks: HookManager::new(),
            gamepads: None,
            telemetry: None,
        }
    }

    /// 以闭包作为 `main`
    pub fn from_fn<F>(main: F) -> Self
    where
        F: FnMut(&mut OpModeContext) -> Result<(), OpModeError> + Send + 'static,
    {
        Self::new(main)
    }

    /// 整体替换配置
    pub fn config(mut self, config: FacadeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.config.grace_period_ms = grace.as_millis() as u64;
        self
    }

    pub fn join_timeout(mut self, timeout: Duration) -> Self {
        self.config.join_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn queue_high_water(mut self, high_water: usize) -> Self {
        self.config.queue_high_water = high_water;
        self
    }

    pub fn worker_thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.worker_thread_name = name.into();
        self
    }

    /// 添加 loop 钩子（可多次调用）
    pub fn hook(mut self, hook: Arc<dyn LoopHook>) -> Self {
        self.hooks.add_hook(hook);
        self
    }

    /// 宿主手柄输入源
    pub fn gamepads(mut self, source: Arc<dyn GamepadSource>) -> Self {
        self.gamepads = Some(source);
        self
    }

    /// 宿主遥测输出
    pub fn telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    /// 构造 facade
    ///
    /// # 错误
    /// - `OpModeError::InvalidConfig`: 配置非法
    pub fn build(self) -> Result<OpModeFacade, OpModeError> {
        self.config.validate()?;
        Ok(OpModeFacade::new(
            self.config,
            self.op_mode,
            self.hooks,
            self.gamepads,
            self.telemetry,
        ))
    }
}
