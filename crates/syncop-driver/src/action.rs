//! Action：在 loop 线程上执行的工作单元
//!
//! # 分类
//!
//! - **Fire-and-forget**：提交后立即返回，失败只记录日志
//! - **Awaitable**：提交方阻塞等待完成信号；结果（可能是 `()`）写入完成槽后才释放信号
//!
//! 完成槽是容量为 1 的 crossbeam 通道。结果先写入通道再被读取，
//! 通道本身保证 release/acquire 语义。提交方放弃等待（取消）后，
//! action 仍可能在之后的 tick 中执行，其结果被丢弃。

use crate::cancel::CancelToken;
use crossbeam_channel::{Receiver, bounded, select};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use syncop_hardware::{HardwareError, HwResult};

/// Action 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    FireAndForget,
    Awaitable,
}

type Body = Box<dyn FnOnce() -> HwResult<()> + Send>;

/// 在 loop 线程上执行的工作单元
///
/// 只能执行一次（`run` 消耗 `self`）。
pub struct Action {
    label: &'static str,
    kind: ActionKind,
    body: Body,
}

impl Action {
    /// 创建 fire-and-forget action
    pub fn fire_and_forget<F>(label: &'static str, f: F) -> Self
    where
        F: FnOnce() -> HwResult<()> + Send + 'static,
    {
        Self {
            label,
            kind: ActionKind::FireAndForget,
            body: Box::new(f),
        }
    }

    /// 创建 awaitable action 及其完成槽
    ///
    /// `f` 的返回值（包括错误以及 panic 转换得到的 `ActionFailed`）原样写入完成槽。
    pub fn awaitable<T, F>(label: &'static str, f: F) -> (Self, Completion<T>)
    where
        T: Send + 'static,
        F: FnOnce() -> HwResult<T> + Send + 'static,
    {
        let (tx, rx) = bounded(1);
        let body = move || {
            let result = catch_action(label, f);
            let outcome = match &result {
                Ok(_) => Ok(()),
                Err(e) => Err(e.clone()),
            };
            // 等待方可能已因取消而离开，结果直接丢弃
            let _ = tx.send(result);
            outcome
        };
        let action = Self {
            label,
            kind: ActionKind::Awaitable,
            body: Box::new(body),
        };
        (action, Completion { rx })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    /// 执行 action
    ///
    /// panic 被捕获并转换为 `HardwareError::ActionFailed`，不会越过调用方。
    pub fn run(self) -> HwResult<()> {
        catch_action(self.label, self.body)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("label", &self.label)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

fn catch_action<T>(label: &'static str, f: impl FnOnce() -> HwResult<T>) -> HwResult<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(HardwareError::ActionFailed(format!(
            "{label}: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

/// 从 panic payload 中提取可读信息
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Awaitable action 的完成槽
#[derive(Debug)]
pub struct Completion<T> {
    rx: Receiver<HwResult<T>>,
}

impl<T> Completion<T> {
    /// 阻塞等待结果，可被取消打断
    ///
    /// # 错误
    /// - `HardwareError::Cancelled`: 等待期间发生取消，或 action 未执行即被丢弃
    /// - 其余错误来自 action 本身
    pub fn wait(self, cancel: &CancelToken) -> HwResult<T> {
        // 结果已就绪时优先返回结果
        if let Ok(result) = self.rx.try_recv() {
            return result;
        }
        select! {
            recv(self.rx) -> msg => msg.unwrap_or(Err(HardwareError::Cancelled)),
            recv(cancel.receiver()) -> _ => Err(HardwareError::Cancelled),
        }
    }

    /// 非阻塞读取结果
    pub fn try_take(&self) -> Option<HwResult<T>> {
        self.rx.try_recv().ok()
    }
}
