//! 设备 trait 定义
//!
//! 每种设备一个 trait。真实设备和 worker 侧代理实现同一组 trait，
//! 用户代码因此无法（也无需）区分二者。
//!
//! # 线程模型
//!
//! 所有 trait 都要求 `Send + Sync`：代理需要把目标设备的 `Arc` 移动到 loop 线程上执行。
//! 真实设备只会在 loop 线程上被调用。

use crate::error::{DeviceError, DeviceErrorKind, HardwareError};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// 设备操作结果
pub type HwResult<T> = Result<T, HardwareError>;

/// 所有设备共有的操作
pub trait HardwareDevice: Send + Sync {
    /// 设备名称（厂商描述）
    fn device_name(&self) -> HwResult<String>;

    /// 连接信息（如 USB 序列号 + 端口）
    fn connection_info(&self) -> HwResult<String>;

    /// 固件版本
    fn version(&self) -> HwResult<u32> {
        Ok(1)
    }

    /// 关闭设备
    fn close(&self) -> HwResult<()> {
        Ok(())
    }
}

/// 控制器的读写模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ControllerMode {
    ReadOnly,
    WriteOnly,
    #[default]
    ReadWrite,
}

/// 电机通道运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RunMode {
    #[default]
    RunWithoutEncoders,
    RunUsingEncoders,
    RunToPosition,
    ResetEncoders,
}

/// 电机 / 舵机方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum Direction {
    #[default]
    Forward = 0,
    Reverse = 1,
}

impl Direction {
    /// 从 u8 转换，无效值视为 Forward
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Reverse,
            _ => Self::Forward,
        }
    }

    /// 按方向修正电机功率
    #[inline]
    pub fn apply_power(self, power: f64) -> f64 {
        match self {
            Self::Forward => power,
            Self::Reverse => -power,
        }
    }

    /// 按方向修正舵机位置（[0, 1] 区间翻转）
    #[inline]
    pub fn apply_position(self, position: f64) -> f64 {
        match self {
            Self::Forward => position,
            Self::Reverse => 1.0 - position,
        }
    }
}

/// 原子方向（复合设备内部使用）
#[derive(Debug)]
struct AtomicDirection(AtomicU8);

impl AtomicDirection {
    fn new(direction: Direction) -> Self {
        Self(AtomicU8::new(direction as u8))
    }

    fn get(&self) -> Direction {
        Direction::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, direction: Direction) {
        self.0.store(direction as u8, Ordering::Release);
    }
}

/// 舵机控制器 PWM 状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PwmStatus {
    Enabled,
    #[default]
    Disabled,
}

/// 罗盘传感器模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompassMode {
    #[default]
    Measurement,
    Calibration,
}

/// 红外搜索传感器模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IrSeekerMode {
    Mode600Hz,
    #[default]
    Mode1200Hz,
}

/// 三轴加速度（单位：g）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Acceleration {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// 直流电机控制器
pub trait DcMotorController: HardwareDevice {
    fn set_controller_mode(&self, mode: ControllerMode) -> HwResult<()>;
    fn controller_mode(&self) -> HwResult<ControllerMode>;

    fn set_channel_mode(&self, port: u8, mode: RunMode) -> HwResult<()>;
    fn channel_mode(&self, port: u8) -> HwResult<RunMode>;

    /// 设置功率，范围 [-1, 1]
    fn set_motor_power(&self, port: u8, power: f64) -> HwResult<()>;
    fn motor_power(&self, port: u8) -> HwResult<f64>;

    /// 是否仍在运动到目标位置
    fn is_busy(&self, port: u8) -> HwResult<bool>;

    /// 浮动（不制动）
    fn set_power_float(&self, port: u8) -> HwResult<()>;
    fn is_power_float(&self, port: u8) -> HwResult<bool>;

    fn set_target_position(&self, port: u8, position: i32) -> HwResult<()>;
    fn target_position(&self, port: u8) -> HwResult<i32>;

    /// 编码器当前读数
    fn current_position(&self, port: u8) -> HwResult<i32>;
}

/// 舵机控制器
pub trait ServoController: HardwareDevice {
    fn pwm_enable(&self) -> HwResult<()>;
    fn pwm_disable(&self) -> HwResult<()>;
    fn pwm_status(&self) -> HwResult<PwmStatus>;

    /// 设置舵机位置，范围 [0, 1]
    fn set_servo_position(&self, port: u8, position: f64) -> HwResult<()>;
    fn servo_position(&self, port: u8) -> HwResult<f64>;
}

/// Legacy 模块（NXT 传感器接口）
pub trait LegacyModule: HardwareDevice {
    fn enable_analog_read_mode(&self, port: u8) -> HwResult<()>;
    fn read_analog(&self, port: u8) -> HwResult<Vec<u8>>;
    fn enable_9v(&self, port: u8, enabled: bool) -> HwResult<()>;
    fn set_digital_line(&self, port: u8, line: u8, set: bool) -> HwResult<()>;
    fn is_port_ready(&self, port: u8) -> HwResult<bool>;
}

pub trait AccelerationSensor: HardwareDevice {
    fn acceleration(&self) -> HwResult<Acceleration>;
    fn status(&self) -> HwResult<String>;
}

pub trait CompassSensor: HardwareDevice {
    /// 航向角（度）
    fn direction(&self) -> HwResult<f64>;
    fn set_mode(&self, mode: CompassMode) -> HwResult<()>;
    fn calibration_failed(&self) -> HwResult<bool>;
}

pub trait GyroSensor: HardwareDevice {
    fn calibrate(&self) -> HwResult<()>;
    fn is_calibrating(&self) -> HwResult<bool>;
    /// 累计航向（度）
    fn heading(&self) -> HwResult<i32>;
    /// 角速度（度/秒）
    fn rotation(&self) -> HwResult<f64>;
}

pub trait IrSeekerSensor: HardwareDevice {
    fn set_mode(&self, mode: IrSeekerMode) -> HwResult<()>;
    fn mode(&self) -> HwResult<IrSeekerMode>;
    fn signal_detected(&self) -> HwResult<bool>;
    fn angle(&self) -> HwResult<f64>;
    fn strength(&self) -> HwResult<f64>;
}

pub trait LightSensor: HardwareDevice {
    /// 归一化亮度 [0, 1]
    fn light_detected(&self) -> HwResult<f64>;
    fn enable_led(&self, enabled: bool) -> HwResult<()>;
}

pub trait UltrasonicSensor: HardwareDevice {
    /// 距离读数（厘米）
    fn ultrasonic_level(&self) -> HwResult<f64>;
}

pub trait VoltageSensor: HardwareDevice {
    fn voltage(&self) -> HwResult<f64>;
}

/// 直流电机（复合设备）
///
/// 由控制器 + 端口 + 方向组成。方向只保存在本对象上，
/// 每次调用时修正功率后转发给控制器。
///
/// 镜像注册表会用代理控制器重新构造 `DcMotor`，
/// 因此 worker 线程上的电机永远不会直接访问真实控制器。
pub struct DcMotor {
    controller: Arc<dyn DcMotorController>,
    port: u8,
    direction: AtomicDirection,
}

impl DcMotor {
    pub fn new(controller: Arc<dyn DcMotorController>, port: u8, direction: Direction) -> Self {
        Self {
            controller,
            port,
            direction: AtomicDirection::new(direction),
        }
    }

    /// 内部控制器（镜像中为代理）
    pub fn controller(&self) -> &Arc<dyn DcMotorController> {
        &self.controller
    }

    pub fn port(&self) -> u8 {
        self.port
    }

    pub fn direction(&self) -> Direction {
        self.direction.get()
    }

    pub fn set_direction(&self, direction: Direction) {
        self.direction.set(direction);
    }

    /// 设置功率（按方向修正），范围 [-1, 1]
    pub fn set_power(&self, power: f64) -> HwResult<()> {
        if !(-1.0..=1.0).contains(&power) {
            return Err(DeviceError::new(
                DeviceErrorKind::InvalidArgument,
                format!("motor power {power} outside [-1, 1]"),
            )
            .into());
        }
        self.controller
            .set_motor_power(self.port, self.direction().apply_power(power))
    }

    pub fn power(&self) -> HwResult<f64> {
        let raw = self.controller.motor_power(self.port)?;
        Ok(self.direction().apply_power(raw))
    }

    pub fn set_mode(&self, mode: RunMode) -> HwResult<()> {
        self.controller.set_channel_mode(self.port, mode)
    }

    pub fn mode(&self) -> HwResult<RunMode> {
        self.controller.channel_mode(self.port)
    }

    pub fn set_target_position(&self, position: i32) -> HwResult<()> {
        self.controller.set_target_position(self.port, position)
    }

    pub fn target_position(&self) -> HwResult<i32> {
        self.controller.target_position(self.port)
    }

    pub fn current_position(&self) -> HwResult<i32> {
        self.controller.current_position(self.port)
    }

    pub fn is_busy(&self) -> HwResult<bool> {
        self.controller.is_busy(self.port)
    }

    pub fn set_power_float(&self) -> HwResult<()> {
        self.controller.set_power_float(self.port)
    }

    pub fn is_power_float(&self) -> HwResult<bool> {
        self.controller.is_power_float(self.port)
    }
}

/// 舵机（复合设备）
pub struct Servo {
    controller: Arc<dyn ServoController>,
    port: u8,
    direction: AtomicDirection,
}

impl Servo {
    pub const MIN_POSITION: f64 = 0.0;
    pub const MAX_POSITION: f64 = 1.0;

    pub fn new(controller: Arc<dyn ServoController>, port: u8, direction: Direction) -> Self {
        Self {
            controller,
            port,
            direction: AtomicDirection::new(direction),
        }
    }

    pub fn controller(&self) -> &Arc<dyn ServoController> {
        &self.controller
    }

    pub fn port(&self) -> u8 {
        self.port
    }

    pub fn direction(&self) -> Direction {
        self.direction.get()
    }

    pub fn set_direction(&self, direction: Direction) {
        self.direction.set(direction);
    }

    /// 设置位置（按方向修正），范围 [0, 1]
    pub fn set_position(&self, position: f64) -> HwResult<()> {
        if !(Self::MIN_POSITION..=Self::MAX_POSITION).contains(&position) {
            return Err(DeviceError::new(
                DeviceErrorKind::InvalidArgument,
                format!("servo position {position} outside [0, 1]"),
            )
            .into());
        }
        self.controller
            .set_servo_position(self.port, self.direction().apply_position(position))
    }

    pub fn position(&self) -> HwResult<f64> {
        let raw = self.controller.servo_position(self.port)?;
        Ok(self.direction().apply_position(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingController {
        power: Mutex<Vec<(u8, f64)>>,
    }

    impl HardwareDevice for RecordingController {
        fn device_name(&self) -> HwResult<String> {
            Ok("recording".to_string())
        }

        fn connection_info(&self) -> HwResult<String> {
            Ok("test".to_string())
        }
    }

    impl DcMotorController for RecordingController {
        fn set_controller_mode(&self, _mode: ControllerMode) -> HwResult<()> {
            Ok(())
        }
        fn controller_mode(&self) -> HwResult<ControllerMode> {
            Ok(ControllerMode::ReadWrite)
        }
        fn set_channel_mode(&self, _port: u8, _mode: RunMode) -> HwResult<()> {
            Ok(())
        }
        fn channel_mode(&self, _port: u8) -> HwResult<RunMode> {
            Ok(RunMode::RunWithoutEncoders)
        }
        fn set_motor_power(&self, port: u8, power: f64) -> HwResult<()> {
            self.power.lock().push((port, power));
            Ok(())
        }
        fn motor_power(&self, port: u8) -> HwResult<f64> {
            let log = self.power.lock();
            Ok(log
                .iter()
                .rev()
                .find(|(p, _)| *p == port)
                .map(|(_, v)| *v)
                .unwrap_or(0.0))
        }
        fn is_busy(&self, _port: u8) -> HwResult<bool> {
            Ok(false)
        }
        fn set_power_float(&self, _port: u8) -> HwResult<()> {
            Ok(())
        }
        fn is_power_float(&self, _port: u8) -> HwResult<bool> {
            Ok(false)
        }
        fn set_target_position(&self, _port: u8, _position: i32) -> HwResult<()> {
            Ok(())
        }
        fn target_position(&self, _port: u8) -> HwResult<i32> {
            Ok(0)
        }
        fn current_position(&self, _port: u8) -> HwResult<i32> {
            Ok(0)
        }
    }

    #[test]
    fn test_reverse_motor_negates_power() {
        let controller = Arc::new(RecordingController::default());
        let motor = DcMotor::new(controller.clone(), 2, Direction::Reverse);

        motor.set_power(0.5).unwrap();
        assert_eq!(controller.power.lock().as_slice(), &[(2, -0.5)]);
        // 读回时再次修正
        assert_eq!(motor.power().unwrap(), 0.5);

        motor.set_direction(Direction::Forward);
        motor.set_power(0.25).unwrap();
        assert_eq!(controller.motor_power(2).unwrap(), 0.25);
    }

    #[test]
    fn test_motor_power_out_of_range() {
        let controller = Arc::new(RecordingController::default());
        let motor = DcMotor::new(controller.clone(), 1, Direction::Forward);

        let err = motor.set_power(1.5).unwrap_err();
        assert!(matches!(
            err,
            HardwareError::Device(DeviceError {
                kind: DeviceErrorKind::InvalidArgument,
                ..
            })
        ));
        assert!(controller.power.lock().is_empty());
    }

    #[test]
    fn test_direction_helpers() {
        assert_eq!(Direction::from_u8(0), Direction::Forward);
        assert_eq!(Direction::from_u8(1), Direction::Reverse);
        assert_eq!(Direction::from_u8(9), Direction::Forward);
        assert_eq!(Direction::Reverse.apply_position(0.25), 0.75);
        assert_eq!(Direction::Forward.apply_position(0.25), 0.25);
    }
}
