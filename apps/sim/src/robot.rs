//! 按配置装配仿真机器人

use crate::config::DeviceSpec;
use anyhow::{Context, Result, anyhow, bail};
use std::collections::HashMap;
use std::sync::Arc;
use syncop_sdk::hardware::{DcMotor, DeviceKind, Servo};
use syncop_sdk::sim::{
    SimAccelerationSensor, SimCompassSensor, SimGyroSensor, SimIrSeekerSensor, SimLegacyModule,
    SimLightSensor, SimMotorController, SimRecorder, SimServoController, SimUltrasonicSensor,
    SimVoltageSensor,
};
use syncop_sdk::{Device, HardwareMap};

/// 仿真机器人：宿主注册表 + 需要随时间推进的设备
pub struct SimRobot {
    pub map: HardwareMap,
    pub recorder: SimRecorder,
    motor_controllers: Vec<Arc<SimMotorController>>,
    gyros: Vec<Arc<SimGyroSensor>>,
}

impl SimRobot {
    /// 满功率原地转向的角速度（度/秒）
    pub const TURN_RATE_DEG: f64 = 90.0;

    /// 两遍装配：先建控制器和传感器，再把电机 / 舵机挂到控制器上
    pub fn build(specs: &[DeviceSpec]) -> Result<Self> {
        let recorder = SimRecorder::new();
        let mut map = HardwareMap::new();
        let mut motor_controllers: HashMap<&str, Arc<SimMotorController>> = HashMap::new();
        let mut servo_controllers: HashMap<&str, Arc<SimServoController>> = HashMap::new();
        let mut drives = Vec::new();
        let mut gyros = Vec::new();

        for spec in specs.iter().filter(|s| !s.kind.is_composite()) {
            let name = spec.name.as_str();
            let device = match spec.kind {
                DeviceKind::DcMotorController => {
                    let controller = Arc::new(SimMotorController::new(name, recorder.clone()));
                    motor_controllers.insert(name, Arc::clone(&controller));
                    drives.push(Arc::clone(&controller));
                    Device::DcMotorController(controller)
                },
                DeviceKind::ServoController => {
                    let controller = Arc::new(SimServoController::new(name, recorder.clone()));
                    servo_controllers.insert(name, Arc::clone(&controller));
                    Device::ServoController(controller)
                },
                DeviceKind::LegacyModule => {
                    Device::LegacyModule(Arc::new(SimLegacyModule::new(name, recorder.clone())))
                },
                DeviceKind::AccelerationSensor => Device::AccelerationSensor(Arc::new(
                    SimAccelerationSensor::new(name, recorder.clone()),
                )),
                DeviceKind::CompassSensor => {
                    Device::CompassSensor(Arc::new(SimCompassSensor::new(name, recorder.clone())))
                },
                DeviceKind::GyroSensor => {
                    let gyro = Arc::new(SimGyroSensor::new(name, recorder.clone()));
                    gyros.push(Arc::clone(&gyro));
                    Device::GyroSensor(gyro)
                },
                DeviceKind::IrSeekerSensor => Device::IrSeekerSensor(Arc::new(
                    SimIrSeekerSensor::new(name, recorder.clone()),
                )),
                DeviceKind::LightSensor => {
                    Device::LightSensor(Arc::new(SimLightSensor::new(name, recorder.clone())))
                },
                DeviceKind::UltrasonicSensor => Device::UltrasonicSensor(Arc::new(
                    SimUltrasonicSensor::new(name, recorder.clone()),
                )),
                DeviceKind::VoltageSensor => {
                    Device::VoltageSensor(Arc::new(SimVoltageSensor::new(name, recorder.clone())))
                },
                DeviceKind::DcMotor | DeviceKind::Servo => continue,
            };
            if map.insert(name, device).is_some() {
                bail!("duplicate {} named '{name}'", spec.kind);
            }
        }

        for spec in specs.iter().filter(|s| s.kind.is_composite()) {
            let name = spec.name.as_str();
            let controller = spec
                .controller
                .as_deref()
                .ok_or_else(|| anyhow!("{} '{name}' needs a controller", spec.kind))?;
            let port = spec
                .port
                .ok_or_else(|| anyhow!("{} '{name}' needs a port", spec.kind))?;

            let device = match spec.kind {
                DeviceKind::DcMotor => {
                    let controller = motor_controllers
                        .get(controller)
                        .with_context(|| format!("motor '{name}': no motor controller '{controller}'"))?;
                    if !(1..=SimMotorController::PORTS).contains(&port) {
                        bail!("motor '{name}': port {port} out of range");
                    }
                    Device::DcMotor(Arc::new(DcMotor::new(
                        controller.clone(),
                        port,
                        spec.direction,
                    )))
                },
                DeviceKind::Servo => {
                    let controller = servo_controllers
                        .get(controller)
                        .with_context(|| format!("servo '{name}': no servo controller '{controller}'"))?;
                    if !(1..=SimServoController::PORTS).contains(&port) {
                        bail!("servo '{name}': port {port} out of range");
                    }
                    Device::Servo(Arc::new(Servo::new(
                        controller.clone(),
                        port,
                        spec.direction,
                    )))
                },
                _ => continue,
            };
            if map.insert(name, device).is_some() {
                bail!("duplicate {} named '{name}'", spec.kind);
            }
        }

        Ok(Self {
            map,
            recorder,
            motor_controllers: drives,
            gyros,
        })
    }

    /// 推进物理仿真（在 tick 线程上、`loop_tick` 之前调用）
    ///
    /// 陀螺仪角速度按差速底盘近似：第一个电机控制器两个端口的原始功率之和
    /// （反向安装的右电机直行时与左电机相互抵消）。
    pub fn advance(&self, dt_secs: f64) {
        for controller in &self.motor_controllers {
            controller.advance(dt_secs);
        }
        let turn = self.motor_controllers.first().map_or(0.0, |drive| {
            (1..=SimMotorController::PORTS)
                .filter_map(|port| drive.peek_power(port))
                .sum::<f64>()
        });
        for gyro in &self.gyros {
            gyro.set_rotation(turn * Self::TURN_RATE_DEG);
            gyro.advance(dt_secs);
        }
    }

    /// 取走本 tick 的设备调用计数
    pub fn take_call_count(&self) -> usize {
        let count = self.recorder.len();
        self.recorder.clear();
        count
    }
}
