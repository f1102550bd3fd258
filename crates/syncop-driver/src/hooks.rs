//! Loop 钩子
//!
//! 在 loop 线程上、每次 `loop` 的排空前后调用。钩子中的 panic 被捕获并计数，
//! 不会越过 `loop`。
//!
//! # 使用示例
//!
//! ```rust
//! use syncop_driver::{DrainReport, HookManager, LoopHook};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! #[derive(Default)]
//! struct CountExecuted(AtomicU64);
//!
//! impl LoopHook for CountExecuted {
//!     fn post_loop(&self, _tick: u64, report: &DrainReport) {
//!         self.0.fetch_add(report.executed as u64, Ordering::Relaxed);
//!     }
//! }
//!
//! let mut hooks = HookManager::new();
//! hooks.add_hook(Arc::new(CountExecuted::default()));
//! assert_eq!(hooks.len(), 1);
//! ```

use crate::action::panic_message;
use crate::queue::DrainReport;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// Loop 钩子 Trait
///
/// 两个方法默认都是空操作。
pub trait LoopHook: Send + Sync {
    /// 排空之前调用
    ///
    /// - `tick`: 本次 loop 的序号（从 1 开始）
    fn pre_loop(&self, tick: u64) {
        let _ = tick;
    }

    /// 排空之后调用
    fn post_loop(&self, tick: u64, report: &DrainReport) {
        let _ = (tick, report);
    }
}

/// 钩子管理器
#[derive(Default)]
pub struct HookManager {
    hooks: Vec<Arc<dyn LoopHook>>,
}

impl HookManager {
    #[must_use]
    pub const fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    pub fn add_hook(&mut self, hook: Arc<dyn LoopHook>) {
        self.hooks.push(hook);
    }

    pub fn clear(&mut self) {
        self.hooks.clear();
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// 调用所有 `pre_loop`，返回 panic 的钩子数
    pub fn run_pre(&self, tick: u64) -> usize {
        self.run_each("pre_loop", |hook| hook.pre_loop(tick))
    }

    /// 调用所有 `post_loop`，返回 panic 的钩子数
    pub fn run_post(&self, tick: u64, report: &DrainReport) -> usize {
        self.run_each("post_loop", |hook| hook.post_loop(tick, report))
    }

    fn run_each(&self, phase: &'static str, f: impl Fn(&dyn LoopHook)) -> usize {
        let mut failures = 0;
        for hook in &self.hooks {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| f(hook.as_ref()))) {
                failures += 1;
                warn!(
                    phase,
                    panic = %panic_message(payload.as_ref()),
                    "Loop hook panicked"
                );
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Trace(Mutex<Vec<String>>);

    impl LoopHook for Trace {
        fn pre_loop(&self, tick: u64) {
            self.0.lock().push(format!("pre {tick}"));
        }

        fn post_loop(&self, tick: u64, report: &DrainReport) {
            self.0.lock().push(format!("post {tick} {}", report.executed));
        }
    }

    struct Faulty;

    impl LoopHook for Faulty {
        fn pre_loop(&self, _tick: u64) {
            panic!("hook bug");
        }
    }

    struct Silent;

    impl LoopHook for Silent {}

    #[test]
    fn test_hooks_called_in_order() {
        let trace = Arc::new(Trace::default());
        let mut hooks = HookManager::new();
        hooks.add_hook(trace.clone());
        hooks.add_hook(Arc::new(Silent));

        assert_eq!(hooks.run_pre(1), 0);
        let report = DrainReport {
            executed: 3,
            ..Default::default()
        };
        assert_eq!(hooks.run_post(1, &report), 0);
        assert_eq!(*trace.0.lock(), vec!["pre 1", "post 1 3"]);
    }

    #[test]
    fn test_hook_panic_contained() {
        let trace = Arc::new(Trace::default());
        let mut hooks = HookManager::new();
        hooks.add_hook(Arc::new(Faulty));
        hooks.add_hook(trace.clone());

        assert_eq!(hooks.run_pre(7), 1);
        // 后面的钩子仍然被调用
        assert_eq!(*trace.0.lock(), vec!["pre 7"]);

        hooks.clear();
        assert!(hooks.is_empty());
    }
}
