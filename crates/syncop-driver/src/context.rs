//! 用户代码看到的 op mode 上下文
//!
//! worker 线程上的 `main` 通过 [`OpModeContext`] 访问镜像注册表、手柄、遥测，
//! 以及 `wait_for_start` / `op_mode_is_active` 等同步原语。

use crate::action::Action;
use crate::dispatcher::Dispatcher;
use crate::queue::QueueHandle;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use syncop_hardware::{Gamepad, HardwareMap, HwResult, TelemetryFrame, TelemetryItem};

/// 用户 `main` 的上下文
pub struct OpModeContext {
    dispatcher: Arc<Dispatcher>,
    hardware_map: HardwareMap,
    /// 手柄 1（最近一次 `update_gamepads` 的快照）
    pub gamepad1: Gamepad,
    /// 手柄 2
    pub gamepad2: Gamepad,
    pub telemetry: Telemetry,
}

impl OpModeContext {
    pub(crate) fn new(dispatcher: Arc<Dispatcher>, hardware_map: HardwareMap) -> Self {
        let telemetry = Telemetry::new(Arc::clone(&dispatcher));
        Self {
            dispatcher,
            hardware_map,
            gamepad1: Gamepad::default(),
            gamepad2: Gamepad::default(),
            telemetry,
        }
    }

    /// 镜像注册表（所有设备都是代理）
    pub fn hardware_map(&self) -> &HardwareMap {
        &self.hardware_map
    }

    /// 阻塞直到宿主第一次调用 `loop`
    pub fn wait_for_start(&self) -> HwResult<()> {
        self.dispatcher.wait_for_start()
    }

    /// 宿主是否尚未发出停止
    pub fn op_mode_is_active(&self) -> bool {
        self.dispatcher.is_active()
    }

    /// 可中断睡眠
    pub fn sleep(&self, duration: Duration) -> HwResult<()> {
        self.dispatcher.sleep(duration)
    }

    /// 阻塞直到下一次排空完成
    pub fn wait_for_next_loop(&self) -> HwResult<()> {
        self.dispatcher.wait_for_next_loop()
    }

    pub fn loop_count(&self) -> u64 {
        self.dispatcher.loop_count()
    }

    /// 从 loop 线程发布的快照刷新 `gamepad1` / `gamepad2`
    ///
    /// 返回状态是否有变化。
    pub fn update_gamepads(&mut self) -> bool {
        let pair = self.dispatcher.gamepads();
        let changed = pair.gamepad1 != self.gamepad1 || pair.gamepad2 != self.gamepad2;
        self.gamepad1 = pair.gamepad1;
        self.gamepad2 = pair.gamepad2;
        changed
    }

    pub fn is_loop_thread(&self) -> bool {
        self.dispatcher.is_loop_thread()
    }

    pub fn is_main_thread(&self) -> bool {
        self.dispatcher.is_main_thread()
    }

    /// 提交自定义 action 到 loop 线程
    pub fn execute_on_loop_thread(&self, action: Action) -> HwResult<()> {
        self.dispatcher.execute_on_loop_thread(action)
    }

    /// 在 loop 线程上执行闭包并等待结果
    pub fn call_on_loop_thread<T, F>(&self, label: &'static str, f: F) -> HwResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> HwResult<T> + Send + 'static,
    {
        self.dispatcher.call(label, f)
    }

    /// 队列生产端，供 action 体内重入提交使用
    pub fn queue_handle(&self) -> QueueHandle {
        self.dispatcher.queue_handle()
    }
}

/// 遥测缓冲
///
/// `add_data` 在 worker 上累积条目，`update` 把整帧作为 fire-and-forget action
/// 交给宿主的遥测输出，并清空缓冲。
pub struct Telemetry {
    dispatcher: Arc<Dispatcher>,
    items: Vec<TelemetryItem>,
}

impl Telemetry {
    fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            items: Vec::new(),
        }
    }

    /// 添加（或覆盖）一条数据
    pub fn add_data(&mut self, key: impl Into<String>, value: impl Display) {
        let key = key.into();
        let value = value.to_string();
        match self.items.iter_mut().find(|item| item.key == key) {
            Some(item) => item.value = value,
            None => self.items.push(TelemetryItem { key, value }),
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 发布当前帧
    pub fn update(&mut self) -> HwResult<()> {
        let frame = TelemetryFrame {
            items: std::mem::take(&mut self.items),
        };
        self.dispatcher.publish_telemetry(frame)
    }
}
