//! 线程亲和性绑定
//!
//! 每个 worker 线程在进入时绑定到所属 facade 的 [`Dispatcher`]，退出时解除（包括 panic 退出）。
//! 代理的每一次操作都通过 [`current`] 查找绑定，而不是持有 facade 指针。

use crate::dispatcher::Dispatcher;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;
use syncop_hardware::{HardwareError, HwResult};

thread_local! {
    static BINDING: RefCell<Option<Arc<Dispatcher>>> = const { RefCell::new(None) };
}

/// 绑定守卫，drop 时解除绑定
///
/// 不能跨线程移动（`!Send`）。
#[derive(Debug)]
pub struct AffinityGuard {
    _not_send: PhantomData<*const ()>,
}

impl Drop for AffinityGuard {
    fn drop(&mut self) {
        BINDING.with(|b| b.borrow_mut().take());
    }
}

/// 将当前线程绑定到 `dispatcher`
///
/// # 错误
/// - `HardwareError::AffinityMisuse`: 当前线程已绑定
pub fn bind(dispatcher: Arc<Dispatcher>) -> HwResult<AffinityGuard> {
    BINDING.with(|b| {
        let mut slot = b.borrow_mut();
        if slot.is_some() {
            return Err(HardwareError::AffinityMisuse(
                "thread is already bound to an op mode",
            ));
        }
        *slot = Some(dispatcher);
        Ok(AffinityGuard {
            _not_send: PhantomData,
        })
    })
}

/// 当前线程绑定的 dispatcher
///
/// # 错误
/// - `HardwareError::NoFacadeBound`: 当前线程未绑定
pub fn current() -> HwResult<Arc<Dispatcher>> {
    BINDING.with(|b| b.borrow().clone().ok_or(HardwareError::NoFacadeBound))
}

pub fn is_bound() -> bool {
    BINDING.with(|b| b.borrow().is_some())
}
