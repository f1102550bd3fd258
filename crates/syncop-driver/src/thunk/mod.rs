//! 设备代理（thunk）
//!
//! 每种设备一个代理类型，实现与真实设备相同的 trait。每次操作都被包装成
//! [`Action`](crate::Action) 送到 loop 线程上执行：
//!
//! - 写操作（设置功率、位置、模式等）是 fire-and-forget，立即返回
//! - 读操作（读取位置、传感器值等）阻塞等待结果
//!
//! 代理在每次调用时通过 [`affinity::current`](crate::affinity::current) 查找 dispatcher，
//! 因此在未绑定的线程上调用会得到 `NoFacadeBound`。

use crate::affinity;
use syncop_hardware::HwResult;

mod controllers;
mod sensors;

pub use controllers::{DcMotorControllerProxy, LegacyModuleProxy, ServoControllerProxy};
pub use sensors::{
    AccelerationSensorProxy, CompassSensorProxy, GyroSensorProxy, IrSeekerSensorProxy,
    LightSensorProxy, UltrasonicSensorProxy, VoltageSensorProxy,
};

/// 以 fire-and-forget 方式在 loop 线程上执行
pub fn thunk_write<F>(label: &'static str, f: F) -> HwResult<()>
where
    F: FnOnce() -> HwResult<()> + Send + 'static,
{
    affinity::current()?.submit(label, f)
}

/// 在 loop 线程上执行并阻塞等待结果
pub fn thunk_read<T, F>(label: &'static str, f: F) -> HwResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> HwResult<T> + Send + 'static,
{
    affinity::current()?.call(label, f)
}

/// 转发一次设备操作
///
/// `forward!(write self.op(args..))` / `forward!(read self.op(args..))`，
/// 参数必须是 `Copy` 或已拥有的值。
macro_rules! forward {
    (write $self:ident . $op:ident ( $($arg:expr),* )) => {{
        let target = ::std::sync::Arc::clone(&$self.target);
        $crate::thunk::thunk_write(stringify!($op), move || target.$op($($arg),*))
    }};
    (read $self:ident . $op:ident ( $($arg:expr),* )) => {{
        let target = ::std::sync::Arc::clone(&$self.target);
        $crate::thunk::thunk_read(stringify!($op), move || target.$op($($arg),*))
    }};
}

/// 为代理实现 `HardwareDevice`（读操作阻塞，`close` 为 fire-and-forget）
macro_rules! impl_proxy_device {
    ($proxy:ty) => {
        impl ::syncop_hardware::HardwareDevice for $proxy {
            fn device_name(&self) -> ::syncop_hardware::HwResult<String> {
                forward!(read self.device_name())
            }

            fn connection_info(&self) -> ::syncop_hardware::HwResult<String> {
                forward!(read self.connection_info())
            }

            fn version(&self) -> ::syncop_hardware::HwResult<u32> {
                forward!(read self.version())
            }

            fn close(&self) -> ::syncop_hardware::HwResult<()> {
                forward!(write self.close())
            }
        }
    };
}

pub(crate) use {forward, impl_proxy_device};
