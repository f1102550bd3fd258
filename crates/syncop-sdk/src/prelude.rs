//! Prelude - 常用类型的便捷导入
//!
//! ```
//! use syncop_sdk::prelude::*;
//! ```

pub use crate::{
    FacadeBuilder, FacadeConfig, OpMode, OpModeContext, OpModeError, OpModeFacade, StopOutcome,
    SyncOpMode, WorkerExit,
};

pub use syncop_hardware::{
    AccelerationSensor, CompassSensor, DcMotor, DcMotorController, Direction, GyroSensor,
    HardwareDevice, HardwareError, HardwareMap, HwResult, IrSeekerSensor, LegacyModule,
    LightSensor, RunMode, Servo, ServoController, UltrasonicSensor, VoltageSensor,
};
