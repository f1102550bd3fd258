//! 设备种类
//!
//! 设备种类是一个封闭集合，镜像注册表按种类逐一构造代理。

use std::fmt;

/// 设备种类（封闭集合）
///
/// 顺序即 [`HardwareMap`](crate::HardwareMap) 遍历顺序：控制器在前，复合设备在后。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DeviceKind {
    DcMotorController,
    ServoController,
    LegacyModule,
    DcMotor,
    Servo,
    AccelerationSensor,
    CompassSensor,
    GyroSensor,
    IrSeekerSensor,
    LightSensor,
    UltrasonicSensor,
    VoltageSensor,
}

impl DeviceKind {
    /// 所有设备种类
    pub const ALL: [DeviceKind; 12] = [
        DeviceKind::DcMotorController,
        DeviceKind::ServoController,
        DeviceKind::LegacyModule,
        DeviceKind::DcMotor,
        DeviceKind::Servo,
        DeviceKind::AccelerationSensor,
        DeviceKind::CompassSensor,
        DeviceKind::GyroSensor,
        DeviceKind::IrSeekerSensor,
        DeviceKind::LightSensor,
        DeviceKind::UltrasonicSensor,
        DeviceKind::VoltageSensor,
    ];

    /// 人类可读名称
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DcMotorController => "DC motor controller",
            Self::ServoController => "servo controller",
            Self::LegacyModule => "legacy module",
            Self::DcMotor => "DC motor",
            Self::Servo => "servo",
            Self::AccelerationSensor => "acceleration sensor",
            Self::CompassSensor => "compass sensor",
            Self::GyroSensor => "gyro sensor",
            Self::IrSeekerSensor => "IR seeker sensor",
            Self::LightSensor => "light sensor",
            Self::UltrasonicSensor => "ultrasonic sensor",
            Self::VoltageSensor => "voltage sensor",
        }
    }

    /// 是否为复合设备（内部持有控制器引用）
    pub fn is_composite(self) -> bool {
        matches!(self, Self::DcMotor | Self::Servo)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
