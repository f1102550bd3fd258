use super::recorder::SimRecorder;
use crate::devices::*;
use crate::error::{DeviceError, DeviceErrorKind};
use parking_lot::Mutex;

const MOTOR_PORTS: usize = 2;
const SERVO_PORTS: usize = 6;

/// 单个电机通道的仿真状态
#[derive(Debug, Clone, Copy, Default)]
struct MotorChannel {
    power: f64,
    mode: RunMode,
    float: bool,
    target: i32,
    /// 编码器读数（保留小数部分以便积分）
    position: f64,
}

/// 仿真直流电机控制器
///
/// 端口编号 1..=[`Self::PORTS`]。调用 [`advance`](Self::advance) 按功率积分编码器读数。
pub struct SimMotorController {
    name: String,
    recorder: SimRecorder,
    mode: Mutex<ControllerMode>,
    channels: Mutex<[MotorChannel; MOTOR_PORTS]>,
}

impl SimMotorController {
    pub const PORTS: u8 = MOTOR_PORTS as u8;
    /// 编码器每转计数
    pub const COUNTS_PER_REV: f64 = 1120.0;
    /// 满功率转速（转/秒）
    pub const FULL_POWER_RPS: f64 = 2.5;
    /// RUN_TO_POSITION 到位容差（计数）
    pub const POSITION_TOLERANCE: f64 = 10.0;

    pub fn new(name: impl Into<String>, recorder: SimRecorder) -> Self {
        Self {
            name: name.into(),
            recorder,
            mode: Mutex::new(ControllerMode::ReadWrite),
            channels: Mutex::new([MotorChannel::default(); MOTOR_PORTS]),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn index(port: u8) -> Result<usize, DeviceError> {
        if (1..=Self::PORTS).contains(&port) {
            Ok((port - 1) as usize)
        } else {
            Err(DeviceError::invalid_port(port))
        }
    }

    /// 直接设置编码器读数（测试用，不记录）
    pub fn set_encoder(&self, port: u8, position: i32) {
        if let Ok(i) = Self::index(port) {
            self.channels.lock()[i].position = position as f64;
        }
    }

    /// 直接读取当前功率（测试用，不记录）
    pub fn peek_power(&self, port: u8) -> Option<f64> {
        Self::index(port).ok().map(|i| self.channels.lock()[i].power)
    }

    /// 推进仿真时间 `dt_secs`
    ///
    /// - RUN_TO_POSITION：以 |power| 向目标位置移动，到位后停止
    /// - RESET_ENCODERS：编码器清零
    /// - 其他模式：按功率积分
    pub fn advance(&self, dt_secs: f64) {
        let rate = Self::COUNTS_PER_REV * Self::FULL_POWER_RPS * dt_secs;
        for ch in self.channels.lock().iter_mut() {
            if ch.float && ch.power == 0.0 {
                continue;
            }
            match ch.mode {
                RunMode::ResetEncoders => ch.position = 0.0,
                RunMode::RunToPosition => {
                    let error = ch.target as f64 - ch.position;
                    let step = ch.power.abs() * rate;
                    if error.abs() <= step {
                        ch.position = ch.target as f64;
                    } else {
                        ch.position += step.copysign(error);
                    }
                },
                RunMode::RunWithoutEncoders | RunMode::RunUsingEncoders => {
                    ch.position += ch.power * rate;
                },
            }
        }
    }
}

impl_sim_device!(SimMotorController, "Sim DC motor controller");

impl DcMotorController for SimMotorController {
    fn set_controller_mode(&self, mode: ControllerMode) -> HwResult<()> {
        self.recorder.record(&self.name, "set_controller_mode", format!("{mode:?}"));
        *self.mode.lock() = mode;
        Ok(())
    }

    fn controller_mode(&self) -> HwResult<ControllerMode> {
        self.recorder.record(&self.name, "controller_mode", "");
        Ok(*self.mode.lock())
    }

    fn set_channel_mode(&self, port: u8, mode: RunMode) -> HwResult<()> {
        self.recorder
            .record(&self.name, "set_channel_mode", format!("{port} {mode:?}"));
        let i = Self::index(port)?;
        let mut channels = self.channels.lock();
        channels[i].mode = mode;
        if mode == RunMode::ResetEncoders {
            channels[i].position = 0.0;
        }
        Ok(())
    }

    fn channel_mode(&self, port: u8) -> HwResult<RunMode> {
        self.recorder.record(&self.name, "channel_mode", port.to_string());
        let i = Self::index(port)?;
        Ok(self.channels.lock()[i].mode)
    }

    fn set_motor_power(&self, port: u8, power: f64) -> HwResult<()> {
        self.recorder
            .record(&self.name, "set_motor_power", format!("{port} {power}"));
        let i = Self::index(port)?;
        if !(-1.0..=1.0).contains(&power) {
            return Err(DeviceError::new(
                DeviceErrorKind::InvalidArgument,
                format!("motor power {power} outside [-1, 1]"),
            )
            .into());
        }
        let mut channels = self.channels.lock();
        channels[i].power = power;
        channels[i].float = false;
        Ok(())
    }

    fn motor_power(&self, port: u8) -> HwResult<f64> {
        self.recorder.record(&self.name, "motor_power", port.to_string());
        let i = Self::index(port)?;
        Ok(self.channels.lock()[i].power)
    }

    fn is_busy(&self, port: u8) -> HwResult<bool> {
        self.recorder.record(&self.name, "is_busy", port.to_string());
        let i = Self::index(port)?;
        let ch = self.channels.lock()[i];
        Ok(ch.mode == RunMode::RunToPosition
            && ch.power != 0.0
            && (ch.target as f64 - ch.position).abs() > Self::POSITION_TOLERANCE)
    }

    fn set_power_float(&self, port: u8) -> HwResult<()> {
        self.recorder.record(&self.name, "set_power_float", port.to_string());
        let i = Self::index(port)?;
        let mut channels = self.channels.lock();
        channels[i].power = 0.0;
        channels[i].float = true;
        Ok(())
    }

    fn is_power_float(&self, port: u8) -> HwResult<bool> {
        self.recorder.record(&self.name, "is_power_float", port.to_string());
        let i = Self::index(port)?;
        Ok(self.channels.lock()[i].float)
    }

    fn set_target_position(&self, port: u8, position: i32) -> HwResult<()> {
        self.recorder
            .record(&self.name, "set_target_position", format!("{port} {position}"));
        let i = Self::index(port)?;
        self.channels.lock()[i].target = position;
        Ok(())
    }

    fn target_position(&self, port: u8) -> HwResult<i32> {
        self.recorder.record(&self.name, "target_position", port.to_string());
        let i = Self::index(port)?;
        Ok(self.channels.lock()[i].target)
    }

    fn current_position(&self, port: u8) -> HwResult<i32> {
        self.recorder.record(&self.name, "current_position", port.to_string());
        let i = Self::index(port)?;
        Ok(self.channels.lock()[i].position.round() as i32)
    }
}

/// 仿真舵机控制器（端口 1..=6）
pub struct SimServoController {
    name: String,
    recorder: SimRecorder,
    pwm: Mutex<PwmStatus>,
    positions: Mutex<[f64; SERVO_PORTS]>,
}

impl SimServoController {
    pub const PORTS: u8 = SERVO_PORTS as u8;

    pub fn new(name: impl Into<String>, recorder: SimRecorder) -> Self {
        Self {
            name: name.into(),
            recorder,
            pwm: Mutex::new(PwmStatus::Disabled),
            positions: Mutex::new([0.0; SERVO_PORTS]),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn index(port: u8) -> Result<usize, DeviceError> {
        if (1..=Self::PORTS).contains(&port) {
            Ok((port - 1) as usize)
        } else {
            Err(DeviceError::invalid_port(port))
        }
    }
}

impl_sim_device!(SimServoController, "Sim servo controller");

impl ServoController for SimServoController {
    fn pwm_enable(&self) -> HwResult<()> {
        self.recorder.record(&self.name, "pwm_enable", "");
        *self.pwm.lock() = PwmStatus::Enabled;
        Ok(())
    }

    fn pwm_disable(&self) -> HwResult<()> {
        self.recorder.record(&self.name, "pwm_disable", "");
        *self.pwm.lock() = PwmStatus::Disabled;
        Ok(())
    }

    fn pwm_status(&self) -> HwResult<PwmStatus> {
        self.recorder.record(&self.name, "pwm_status", "");
        Ok(*self.pwm.lock())
    }

    fn set_servo_position(&self, port: u8, position: f64) -> HwResult<()> {
        self.recorder
            .record(&self.name, "set_servo_position", format!("{port} {position}"));
        let i = Self::index(port)?;
        if !(0.0..=1.0).contains(&position) {
            return Err(DeviceError::new(
                DeviceErrorKind::InvalidArgument,
                format!("servo position {position} outside [0, 1]"),
            )
            .into());
        }
        // 写位置会隐式使能 PWM
        *self.pwm.lock() = PwmStatus::Enabled;
        self.positions.lock()[i] = position;
        Ok(())
    }

    fn servo_position(&self, port: u8) -> HwResult<f64> {
        self.recorder.record(&self.name, "servo_position", port.to_string());
        let i = Self::index(port)?;
        Ok(self.positions.lock()[i])
    }
}

#[derive(Debug, Clone, Default)]
struct LegacyPort {
    analog_mode: bool,
    nine_volt: bool,
    digital: [bool; 2],
    analog: Vec<u8>,
}

/// 仿真 Legacy 模块（端口 0..=5）
pub struct SimLegacyModule {
    name: String,
    recorder: SimRecorder,
    ports: Mutex<Vec<LegacyPort>>,
}

impl SimLegacyModule {
    pub const PORTS: u8 = 6;

    pub fn new(name: impl Into<String>, recorder: SimRecorder) -> Self {
        Self {
            name: name.into(),
            recorder,
            ports: Mutex::new(vec![LegacyPort::default(); Self::PORTS as usize]),
        }
    }

    fn index(port: u8) -> Result<usize, DeviceError> {
        if port < Self::PORTS {
            Ok(port as usize)
        } else {
            Err(DeviceError::invalid_port(port))
        }
    }

    /// 设置模拟量读数（测试用）
    pub fn set_analog(&self, port: u8, value: Vec<u8>) {
        if let Ok(i) = Self::index(port) {
            self.ports.lock()[i].analog = value;
        }
    }

    /// 查询 9V 输出状态（测试用）
    pub fn nine_volt_enabled(&self, port: u8) -> bool {
        Self::index(port)
            .map(|i| self.ports.lock()[i].nine_volt)
            .unwrap_or(false)
    }
}

impl_sim_device!(SimLegacyModule, "Sim legacy module");

impl LegacyModule for SimLegacyModule {
    fn enable_analog_read_mode(&self, port: u8) -> HwResult<()> {
        self.recorder
            .record(&self.name, "enable_analog_read_mode", port.to_string());
        let i = Self::index(port)?;
        self.ports.lock()[i].analog_mode = true;
        Ok(())
    }

    fn read_analog(&self, port: u8) -> HwResult<Vec<u8>> {
        self.recorder.record(&self.name, "read_analog", port.to_string());
        let i = Self::index(port)?;
        let ports = self.ports.lock();
        if !ports[i].analog_mode {
            return Err(DeviceError::new(
                DeviceErrorKind::Unsupported,
                format!("port {port} is not in analog read mode"),
            )
            .into());
        }
        Ok(ports[i].analog.clone())
    }

    fn enable_9v(&self, port: u8, enabled: bool) -> HwResult<()> {
        self.recorder
            .record(&self.name, "enable_9v", format!("{port} {enabled}"));
        let i = Self::index(port)?;
        self.ports.lock()[i].nine_volt = enabled;
        Ok(())
    }

    fn set_digital_line(&self, port: u8, line: u8, set: bool) -> HwResult<()> {
        self.recorder
            .record(&self.name, "set_digital_line", format!("{port} {line} {set}"));
        let i = Self::index(port)?;
        let line = line as usize;
        if line >= 2 {
            return Err(DeviceError::new(
                DeviceErrorKind::InvalidArgument,
                format!("digital line {line} out of range"),
            )
            .into());
        }
        self.ports.lock()[i].digital[line] = set;
        Ok(())
    }

    fn is_port_ready(&self, port: u8) -> HwResult<bool> {
        self.recorder.record(&self.name, "is_port_ready", port.to_string());
        Self::index(port)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motor_integrates_power() {
        let recorder = SimRecorder::new();
        let mc = SimMotorController::new("mc", recorder.clone());

        mc.set_motor_power(1, 0.5).unwrap();
        mc.advance(1.0);
        // 0.5 * 1120 * 2.5 = 1400
        assert_eq!(mc.current_position(1).unwrap(), 1400);
        assert_eq!(mc.current_position(2).unwrap(), 0);

        assert_eq!(recorder.ops("set_motor_power"), vec![("mc".to_string(), "1 0.5".to_string())]);
    }

    #[test]
    fn test_motor_run_to_position() {
        let mc = SimMotorController::new("mc", SimRecorder::new());
        mc.set_channel_mode(1, RunMode::RunToPosition).unwrap();
        mc.set_target_position(1, 500).unwrap();
        mc.set_motor_power(1, 1.0).unwrap();
        assert!(mc.is_busy(1).unwrap());

        mc.advance(1.0);
        assert_eq!(mc.current_position(1).unwrap(), 500);
        assert!(!mc.is_busy(1).unwrap());
    }

    #[test]
    fn test_motor_invalid_port_and_power() {
        let mc = SimMotorController::new("mc", SimRecorder::new());
        assert!(mc.set_motor_power(3, 0.1).is_err());
        assert!(mc.set_motor_power(1, -1.5).is_err());
        assert_eq!(mc.peek_power(1), Some(0.0));
        assert_eq!(mc.peek_power(9), None);
    }

    #[test]
    fn test_motor_reset_encoders() {
        let mc = SimMotorController::new("mc", SimRecorder::new());
        mc.set_encoder(2, 1120);
        assert_eq!(mc.current_position(2).unwrap(), 1120);
        mc.set_channel_mode(2, RunMode::ResetEncoders).unwrap();
        assert_eq!(mc.current_position(2).unwrap(), 0);
    }

    #[test]
    fn test_servo_enables_pwm() {
        let sc = SimServoController::new("sc", SimRecorder::new());
        assert_eq!(sc.pwm_status().unwrap(), PwmStatus::Disabled);
        sc.set_servo_position(3, 0.75).unwrap();
        assert_eq!(sc.pwm_status().unwrap(), PwmStatus::Enabled);
        assert_eq!(sc.servo_position(3).unwrap(), 0.75);
        assert!(sc.set_servo_position(0, 0.5).is_err());
    }

    #[test]
    fn test_legacy_analog_requires_mode() {
        let lm = SimLegacyModule::new("legacy", SimRecorder::new());
        lm.set_analog(4, vec![1, 2]);
        assert!(lm.read_analog(4).is_err());
        lm.enable_analog_read_mode(4).unwrap();
        assert_eq!(lm.read_analog(4).unwrap(), vec![1, 2]);
        lm.enable_9v(4, true).unwrap();
        assert!(lm.nine_volt_enabled(4));
        assert!(lm.set_digital_line(4, 2, true).is_err());
    }
}
