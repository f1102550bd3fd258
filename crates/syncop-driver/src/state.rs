//! Facade 生命周期状态
//!
//! `Constructed → Started → Stopping → Stopped`，只能单向推进。

use std::sync::atomic::{AtomicU8, Ordering};

/// Facade 生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum FacadeState {
    /// 已构造，尚未 `start`
    #[default]
    Constructed = 0,
    /// worker 已启动，`loop` 正在排空队列
    Started = 1,
    /// `stop` 进行中
    Stopping = 2,
    /// 已停止（终态）
    Stopped = 3,
}

impl FacadeState {
    /// 从 u8 转换
    ///
    /// 无效值视为 `Stopped`。
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Constructed,
            1 => Self::Started,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_started(self) -> bool {
        self == Self::Started
    }

    /// 是否已进入（或完成）停止流程
    pub fn is_shutting_down(self) -> bool {
        matches!(self, Self::Stopping | Self::Stopped)
    }
}

/// Facade 状态（原子版本，用于线程间共享）
#[derive(Debug, Default)]
pub struct AtomicFacadeState {
    inner: AtomicU8,
}

impl AtomicFacadeState {
    pub fn new(state: FacadeState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    pub fn get(&self) -> FacadeState {
        FacadeState::from_u8(self.inner.load(Ordering::Acquire))
    }

    /// 状态迁移 `from → to`
    ///
    /// 只允许向前迁移；当前状态不是 `from` 时返回实际状态。
    pub fn transition(&self, from: FacadeState, to: FacadeState) -> Result<(), FacadeState> {
        if to.as_u8() <= from.as_u8() {
            return Err(self.get());
        }
        self.inner
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(FacadeState::from_u8)
    }
}
