//! Facade 运行指标
//!
//! 原子计数器，任何线程都可以无锁读取。

use std::sync::atomic::{AtomicU64, Ordering};

/// Facade 实时指标
///
/// # 使用示例
///
/// ```rust
/// use syncop_driver::FacadeMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = FacadeMetrics::new();
/// metrics.loops.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.loops, 1);
/// ```
#[derive(Debug, Default)]
pub struct FacadeMetrics {
    /// `loop` 调用次数
    pub loops: AtomicU64,

    /// 入队的 action 总数
    pub actions_enqueued: AtomicU64,

    /// 在 loop 线程上执行过的 action 总数（含失败）
    pub actions_executed: AtomicU64,

    /// 执行失败（返回错误或 panic）的 action 数
    pub actions_failed: AtomicU64,

    /// `stop` 时未执行即被丢弃的 action 数
    pub actions_discarded: AtomicU64,

    /// 钩子 panic 次数
    pub hook_failures: AtomicU64,

    /// 观察到的最大队列长度
    pub queue_depth_max: AtomicU64,

    /// 队列越过高水位的告警次数
    pub high_water_alerts: AtomicU64,
}

impl FacadeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次入队后的队列长度
    pub(crate) fn observe_depth(&self, depth: usize) {
        self.queue_depth_max
            .fetch_max(depth as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            loops: self.loops.load(Ordering::Relaxed),
            actions_enqueued: self.actions_enqueued.load(Ordering::Relaxed),
            actions_executed: self.actions_executed.load(Ordering::Relaxed),
            actions_failed: self.actions_failed.load(Ordering::Relaxed),
            actions_discarded: self.actions_discarded.load(Ordering::Relaxed),
            hook_failures: self.hook_failures.load(Ordering::Relaxed),
            queue_depth_max: self.queue_depth_max.load(Ordering::Relaxed),
            high_water_alerts: self.high_water_alerts.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.loops.store(0, Ordering::Relaxed);
        self.actions_enqueued.store(0, Ordering::Relaxed);
        self.actions_executed.store(0, Ordering::Relaxed);
        self.actions_failed.store(0, Ordering::Relaxed);
        self.actions_discarded.store(0, Ordering::Relaxed);
        self.hook_failures.store(0, Ordering::Relaxed);
        self.queue_depth_max.store(0, Ordering::Relaxed);
        self.high_water_alerts.store(0, Ordering::Relaxed);
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub loops: u64,
    pub actions_enqueued: u64,
    pub actions_executed: u64,
    pub actions_failed: u64,
    pub actions_discarded: u64,
    pub hook_failures: u64,
    pub queue_depth_max: u64,
    pub high_water_alerts: u64,
}

impl MetricsSnapshot {
    /// 尚在队列中的 action 数
    pub fn pending(&self) -> u64 {
        self.actions_enqueued
            .saturating_sub(self.actions_executed + self.actions_discarded)
    }

    /// 平均每次 loop 执行的 action 数
    pub fn actions_per_loop(&self) -> f64 {
        if self.loops == 0 {
            return 0.0;
        }
        self.actions_executed as f64 / self.loops as f64
    }

    /// 失败率（百分比）
    pub fn failure_rate(&self) -> f64 {
        if self.actions_executed == 0 {
            return 0.0;
        }
        (self.actions_failed as f64 / self.actions_executed as f64) * 100.0
    }
}
