use super::recorder::SimRecorder;
use crate::devices::*;
use parking_lot::Mutex;

/// 仿真加速度传感器
pub struct SimAccelerationSensor {
    name: String,
    recorder: SimRecorder,
    value: Mutex<Acceleration>,
}

impl SimAccelerationSensor {
    pub fn new(name: impl Into<String>, recorder: SimRecorder) -> Self {
        Self {
            name: name.into(),
            recorder,
            value: Mutex::new(Acceleration {
                x: 0.0,
                y: 0.0,
                z: 1.0,
            }),
        }
    }

    pub fn set(&self, value: Acceleration) {
        *self.value.lock() = value;
    }
}

impl_sim_device!(SimAccelerationSensor, "Sim acceleration sensor");

impl AccelerationSensor for SimAccelerationSensor {
    fn acceleration(&self) -> HwResult<Acceleration> {
        self.recorder.record(&self.name, "acceleration", "");
        Ok(*self.value.lock())
    }

    fn status(&self) -> HwResult<String> {
        self.recorder.record(&self.name, "status", "");
        Ok("ok".to_string())
    }
}

#[derive(Debug, Default)]
struct CompassState {
    direction: f64,
    mode: CompassMode,
    calibration_failed: bool,
}

/// 仿真罗盘传感器
pub struct SimCompassSensor {
    name: String,
    recorder: SimRecorder,
    state: Mutex<CompassState>,
}

impl SimCompassSensor {
    pub fn new(name: impl Into<String>, recorder: SimRecorder) -> Self {
        Self {
            name: name.into(),
            recorder,
            state: Mutex::new(CompassState::default()),
        }
    }

    pub fn set_direction(&self, degrees: f64) {
        self.state.lock().direction = degrees.rem_euclid(360.0);
    }

    pub fn fail_calibration(&self, failed: bool) {
        self.state.lock().calibration_failed = failed;
    }

    pub fn current_mode(&self) -> CompassMode {
        self.state.lock().mode
    }
}

impl_sim_device!(SimCompassSensor, "Sim compass sensor");

impl CompassSensor for SimCompassSensor {
    fn direction(&self) -> HwResult<f64> {
        self.recorder.record(&self.name, "direction", "");
        Ok(self.state.lock().direction)
    }

    fn set_mode(&self, mode: CompassMode) -> HwResult<()> {
        self.recorder.record(&self.name, "set_mode", format!("{mode:?}"));
        self.state.lock().mode = mode;
        Ok(())
    }

    fn calibration_failed(&self) -> HwResult<bool> {
        self.recorder.record(&self.name, "calibration_failed", "");
        Ok(self.state.lock().calibration_failed)
    }
}

#[derive(Debug, Default)]
struct GyroState {
    heading: f64,
    rotation: f64,
    calibrating: bool,
}

/// 仿真陀螺仪
///
/// `calibrate()` 进入校准状态，下一次 [`advance`](Self::advance) 结束校准并清零航向。
pub struct SimGyroSensor {
    name: String,
    recorder: SimRecorder,
    state: Mutex<GyroState>,
}

impl SimGyroSensor {
    pub fn new(name: impl Into<String>, recorder: SimRecorder) -> Self {
        Self {
            name: name.into(),
            recorder,
            state: Mutex::new(GyroState::default()),
        }
    }

    /// 设置角速度（度/秒）
    pub fn set_rotation(&self, degrees_per_sec: f64) {
        self.state.lock().rotation = degrees_per_sec;
    }

    pub fn advance(&self, dt_secs: f64) {
        let mut state = self.state.lock();
        if state.calibrating {
            state.calibrating = false;
            state.heading = 0.0;
            return;
        }
        state.heading = (state.heading + state.rotation * dt_secs).rem_euclid(360.0);
    }
}

impl_sim_device!(SimGyroSensor, "Sim gyro sensor");

impl GyroSensor for SimGyroSensor {
    fn calibrate(&self) -> HwResult<()> {
        self.recorder.record(&self.name, "calibrate", "");
        self.state.lock().calibrating = true;
        Ok(())
    }

    fn is_calibrating(&self) -> HwResult<bool> {
        self.recorder.record(&self.name, "is_calibrating", "");
        Ok(self.state.lock().calibrating)
    }

    fn heading(&self) -> HwResult<i32> {
        self.recorder.record(&self.name, "heading", "");
        Ok(self.state.lock().heading.round() as i32 % 360)
    }

    fn rotation(&self) -> HwResult<f64> {
        self.recorder.record(&self.name, "rotation", "");
        Ok(self.state.lock().rotation)
    }
}

#[derive(Debug, Default)]
struct IrState {
    mode: IrSeekerMode,
    angle: f64,
    strength: f64,
}

/// 仿真红外搜索传感器
pub struct SimIrSeekerSensor {
    name: String,
    recorder: SimRecorder,
    state: Mutex<IrState>,
}

impl SimIrSeekerSensor {
    /// 低于该强度视为未检测到信号
    pub const DETECTION_THRESHOLD: f64 = 0.01;

    pub fn new(name: impl Into<String>, recorder: SimRecorder) -> Self {
        Self {
            name: name.into(),
            recorder,
            state: Mutex::new(IrState::default()),
        }
    }

    pub fn set_signal(&self, angle: f64, strength: f64) {
        let mut state = self.state.lock();
        state.angle = angle;
        state.strength = strength;
    }
}

impl_sim_device!(SimIrSeekerSensor, "Sim IR seeker sensor");

impl IrSeekerSensor for SimIrSeekerSensor {
    fn set_mode(&self, mode: IrSeekerMode) -> HwResult<()> {
        self.recorder.record(&self.name, "set_mode", format!("{mode:?}"));
        self.state.lock().mode = mode;
        Ok(())
    }

    fn mode(&self) -> HwResult<IrSeekerMode> {
        self.recorder.record(&self.name, "mode", "");
        Ok(self.state.lock().mode)
    }

    fn signal_detected(&self) -> HwResult<bool> {
        self.recorder.record(&self.name, "signal_detected", "");
        Ok(self.state.lock().strength > Self::DETECTION_THRESHOLD)
    }

    fn angle(&self) -> HwResult<f64> {
        self.recorder.record(&self.name, "angle", "");
        Ok(self.state.lock().angle)
    }

    fn strength(&self) -> HwResult<f64> {
        self.recorder.record(&self.name, "strength", "");
        Ok(self.state.lock().strength)
    }
}

/// 仿真光线传感器
pub struct SimLightSensor {
    name: String,
    recorder: SimRecorder,
    state: Mutex<(f64, bool)>,
}

impl SimLightSensor {
    pub fn new(name: impl Into<String>, recorder: SimRecorder) -> Self {
        Self {
            name: name.into(),
            recorder,
            state: Mutex::new((0.0, false)),
        }
    }

    pub fn set_light(&self, level: f64) {
        self.state.lock().0 = level.clamp(0.0, 1.0);
    }

    pub fn led_enabled(&self) -> bool {
        self.state.lock().1
    }
}

impl_sim_device!(SimLightSensor, "Sim light sensor");

impl LightSensor for SimLightSensor {
    fn light_detected(&self) -> HwResult<f64> {
        self.recorder.record(&self.name, "light_detected", "");
        Ok(self.state.lock().0)
    }

    fn enable_led(&self, enabled: bool) -> HwResult<()> {
        self.recorder.record(&self.name, "enable_led", enabled.to_string());
        self.state.lock().1 = enabled;
        Ok(())
    }
}

/// 仿真超声波传感器
pub struct SimUltrasonicSensor {
    name: String,
    recorder: SimRecorder,
    level: Mutex<f64>,
}

impl SimUltrasonicSensor {
    pub fn new(name: impl Into<String>, recorder: SimRecorder) -> Self {
        Self {
            name: name.into(),
            recorder,
            level: Mutex::new(255.0),
        }
    }

    pub fn set_level(&self, centimeters: f64) {
        *self.level.lock() = centimeters;
    }
}

impl_sim_device!(SimUltrasonicSensor, "Sim ultrasonic sensor");

impl UltrasonicSensor for SimUltrasonicSensor {
    fn ultrasonic_level(&self) -> HwResult<f64> {
        self.recorder.record(&self.name, "ultrasonic_level", "");
        Ok(*self.level.lock())
    }
}

/// 仿真电压传感器
pub struct SimVoltageSensor {
    name: String,
    recorder: SimRecorder,
    volts: Mutex<f64>,
}

impl SimVoltageSensor {
    pub fn new(name: impl Into<String>, recorder: SimRecorder) -> Self {
        Self {
            name: name.into(),
            recorder,
            volts: Mutex::new(13.2),
        }
    }

    pub fn set_voltage(&self, volts: f64) {
        *self.volts.lock() = volts;
    }
}

impl_sim_device!(SimVoltageSensor, "Sim voltage sensor");

impl VoltageSensor for SimVoltageSensor {
    fn voltage(&self) -> HwResult<f64> {
        self.recorder.record(&self.name, "voltage", "");
        Ok(*self.volts.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gyro_calibration_resets_heading() {
        let gyro = SimGyroSensor::new("gyro", SimRecorder::new());
        gyro.set_rotation(90.0);
        gyro.advance(1.0);
        assert_eq!(gyro.heading().unwrap(), 90);

        gyro.calibrate().unwrap();
        assert!(gyro.is_calibrating().unwrap());
        gyro.advance(0.02);
        assert!(!gyro.is_calibrating().unwrap());
        assert_eq!(gyro.heading().unwrap(), 0);
    }

    #[test]
    fn test_ir_seeker_threshold() {
        let ir = SimIrSeekerSensor::new("ir", SimRecorder::new());
        assert!(!ir.signal_detected().unwrap());
        ir.set_signal(-30.0, 0.4);
        assert!(ir.signal_detected().unwrap());
        assert_eq!(ir.angle().unwrap(), -30.0);
    }

    #[test]
    fn test_sensor_reads_are_recorded() {
        let recorder = SimRecorder::new();
        let sonar = SimUltrasonicSensor::new("sonar", recorder.clone());
        let battery = SimVoltageSensor::new("battery", recorder.clone());

        sonar.set_level(42.0);
        assert_eq!(sonar.ultrasonic_level().unwrap(), 42.0);
        assert_eq!(battery.voltage().unwrap(), 13.2);
        assert_eq!(recorder.len(), 2);
        assert_eq!(
            recorder.ops("voltage"),
            vec![("battery".to_string(), String::new())]
        );
    }

    #[test]
    fn test_compass_wraps_direction() {
        let compass = SimCompassSensor::new("compass", SimRecorder::new());
        compass.set_direction(370.0);
        assert_eq!(compass.direction().unwrap(), 10.0);
        compass.set_mode(CompassMode::Calibration).unwrap();
        assert_eq!(compass.current_mode(), CompassMode::Calibration);
    }
}
