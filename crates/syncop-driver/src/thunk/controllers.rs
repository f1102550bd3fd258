use super::{forward, impl_proxy_device};
use std::sync::Arc;
use syncop_hardware::{
    ControllerMode, DcMotorController, HardwareDevice, HwResult, LegacyModule, PwmStatus, RunMode,
    ServoController,
};

/// 电机控制器代理
pub struct DcMotorControllerProxy {
    target: Arc<dyn DcMotorController>,
}

impl DcMotorControllerProxy {
    pub fn new(target: Arc<dyn DcMotorController>) -> Self {
        Self { target }
    }
}

impl_proxy_device!(DcMotorControllerProxy);

impl DcMotorController for DcMotorControllerProxy {
    fn set_controller_mode(&self, mode: ControllerMode) -> HwResult<()> {
        forward!(write self.set_controller_mode(mode))
    }

    fn controller_mode(&self) -> HwResult<ControllerMode> {
        forward!(read self.controller_mode())
    }

    fn set_channel_mode(&self, port: u8, mode: RunMode) -> HwResult<()> {
        forward!(write self.set_channel_mode(port, mode))
    }

    fn channel_mode(&self, port: u8) -> HwResult<RunMode> {
        forward!(read self.channel_mode(port))
    }

    fn set_motor_power(&self, port: u8, power: f64) -> HwResult<()> {
        forward!(write self.set_motor_power(port, power))
    }

    fn motor_power(&self, port: u8) -> HwResult<f64> {
        forward!(read self.motor_power(port))
    }

    fn is_busy(&self, port: u8) -> HwResult<bool> {
        forward!(read self.is_busy(port))
    }

    fn set_power_float(&self, port: u8) -> HwResult<()> {
        forward!(write self.set_power_float(port))
    }

    fn is_power_float(&self, port: u8) -> HwResult<bool> {
        forward!(read self.is_power_float(port))
    }

    fn set_target_position(&self, port: u8, position: i32) -> HwResult<()> {
        forward!(write self.set_target_position(port, position))
    }

    fn target_position(&self, port: u8) -> HwResult<i32> {
        forward!(read self.target_position(port))
    }

    fn current_position(&self, port: u8) -> HwResult<i32> {
        forward!(read self.current_position(port))
    }
}

/// 舵机控制器代理
pub struct ServoControllerProxy {
    target: Arc<dyn ServoController>,
}

impl ServoControllerProxy {
    pub fn new(target: Arc<dyn ServoController>) -> Self {
        Self { target }
    }
}

impl_proxy_device!(ServoControllerProxy);

impl ServoController for ServoControllerProxy {
    fn pwm_enable(&self) -> HwResult<()> {
        forward!(write self.pwm_enable())
    }

    fn pwm_disable(&self) -> HwResult<()> {
        forward!(write self.pwm_disable())
    }

    fn pwm_status(&self) -> HwResult<PwmStatus> {
        forward!(read self.pwm_status())
    }

    fn set_servo_position(&self, port: u8, position: f64) -> HwResult<()> {
        forward!(write self.set_servo_position(port, position))
    }

    fn servo_position(&self, port: u8) -> HwResult<f64> {
        forward!(read self.servo_position(port))
    }
}

/// Legacy module 代理
pub struct LegacyModuleProxy {
    target: Arc<dyn LegacyModule>,
}

impl LegacyModuleProxy {
    pub fn new(target: Arc<dyn LegacyModule>) -> Self {
        Self { target }
    }
}

impl_proxy_device!(LegacyModuleProxy);

impl LegacyModule for LegacyModuleProxy {
    fn enable_analog_read_mode(&self, port: u8) -> HwResult<()> {
        forward!(write self.enable_analog_read_mode(port))
    }

    fn read_analog(&self, port: u8) -> HwResult<Vec<u8>> {
        forward!(read self.read_analog(port))
    }

    fn enable_9v(&self, port: u8, enabled: bool) -> HwResult<()> {
        forward!(write self.enable_9v(port, enabled))
    }

    fn set_digital_line(&self, port: u8, line: u8, set: bool) -> HwResult<()> {
        forward!(write self.set_digital_line(port, line, set))
    }

    fn is_port_ready(&self, port: u8) -> HwResult<bool> {
        forward!(read self.is_port_ready(port))
    }
}
