//! 仿真设备（feature = "sim"）
//!
//! 无硬件依赖的设备实现，用于单元测试、集成测试和 `syncop-sim`。
//! 每次设备调用都会写入 [`SimRecorder`]，记录操作、参数和执行线程，
//! 测试可以据此验证调用顺序和执行线程。

/// 为仿真设备实现 `HardwareDevice`（所有仿真设备都带 `name` 和 `recorder` 字段）
macro_rules! impl_sim_device {
    ($ty:ty, $label:expr) => {
        impl $crate::devices::HardwareDevice for $ty {
            fn device_name(&self) -> $crate::devices::HwResult<String> {
                self.recorder.record(&self.name, "device_name", "");
                Ok(format!("{} ({})", $label, self.name))
            }

            fn connection_info(&self) -> $crate::devices::HwResult<String> {
                self.recorder.record(&self.name, "connection_info", "");
                Ok(format!("sim:{}", self.name))
            }

            fn close(&self) -> $crate::devices::HwResult<()> {
                self.recorder.record(&self.name, "close", "");
                Ok(())
            }
        }
    };
}

mod controllers;
mod host;
mod recorder;
mod sensors;

pub use controllers::{SimLegacyModule, SimMotorController, SimServoController};
pub use host::{SimGamepads, SimTelemetry};
pub use recorder::{DeviceCall, SimRecorder};
pub use sensors::{
    SimAccelerationSensor, SimCompassSensor, SimGyroSensor, SimIrSeekerSensor, SimLightSensor,
    SimUltrasonicSensor, SimVoltageSensor,
};
