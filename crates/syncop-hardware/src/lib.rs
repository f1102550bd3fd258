//! # SyncOp Hardware Layer
//!
//! 硬件抽象层：设备种类、设备 trait、设备注册表以及宿主 I/O（手柄、遥测）。
//!
//! 本 crate 不涉及任何线程模型。线程亲和性（设备只能在 loop 线程上访问）
//! 由 `syncop-driver` 负责。

pub mod devices;
pub mod error;
pub mod host;
pub mod kind;
pub mod registry;

#[cfg(feature = "sim")]
pub mod sim;

pub use devices::{
    Acceleration, AccelerationSensor, CompassMode, CompassSensor, ControllerMode, DcMotor,
    DcMotorController, Direction, GyroSensor, HardwareDevice, HwResult, IrSeekerMode,
    IrSeekerSensor, LegacyModule, LightSensor, PwmStatus, RunMode, Servo, ServoController,
    UltrasonicSensor, VoltageSensor,
};
pub use error::{DeviceError, DeviceErrorKind, HardwareError};
pub use host::{Gamepad, GamepadPair, GamepadSource, TelemetryFrame, TelemetryItem, TelemetrySink};
pub use kind::DeviceKind;
pub use registry::{Device, DeviceMapping, HardwareMap};
