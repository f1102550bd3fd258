//! 设备注册表镜像
//!
//! 按设备种类构造：每个种类有自己的代理工厂。复合设备（电机 → 电机控制器，
//! 舵机 → 舵机控制器）会被重建，内部的控制器引用也替换为代理。
//! 同一个控制器只包装一次，镜像中的控制器条目和所有引用它的复合设备共享同一个代理。

use crate::thunk::*;
use std::collections::HashMap;
use std::sync::Arc;
use syncop_hardware::{
    DcMotor, DcMotorController, Device, HardwareMap, Servo, ServoController,
};
use tracing::debug;

/// 为宿主注册表构造镜像
///
/// 镜像与宿主注册表的 `(kind, name)` 键集合完全相同；每个条目都是代理，
/// 代理的操作转发到同一个真实设备。
pub fn mirror(host: &HardwareMap) -> HardwareMap {
    let mut factory = ProxyFactory::default();
    let mut out = HardwareMap::new();
    for (kind, name, device) in host.devices() {
        let proxy = factory.proxy(device);
        debug!(%kind, name = %name, "Mirrored device");
        out.insert(name, proxy);
    }
    out
}

fn addr<T: ?Sized>(arc: &Arc<T>) -> usize {
    Arc::as_ptr(arc) as *const () as usize
}

/// 代理工厂（按真实控制器地址缓存控制器代理）
#[derive(Default)]
struct ProxyFactory {
    motor_controllers: HashMap<usize, Arc<dyn DcMotorController>>,
    servo_controllers: HashMap<usize, Arc<dyn ServoController>>,
}

impl ProxyFactory {
    fn proxy(&mut self, device: Device) -> Device {
        match device {
            Device::DcMotorController(d) => Device::DcMotorController(self.motor_controller(&d)),
            Device::ServoController(d) => Device::ServoController(self.servo_controller(&d)),
            Device::LegacyModule(d) => Device::LegacyModule(Arc::new(LegacyModuleProxy::new(d))),
            Device::DcMotor(motor) => {
                let controller = self.motor_controller(motor.controller());
                Device::DcMotor(Arc::new(DcMotor::new(
                    controller,
                    motor.port(),
                    motor.direction(),
                )))
            },
            Device::Servo(servo) => {
                let controller = self.servo_controller(servo.controller());
                Device::Servo(Arc::new(Servo::new(
                    controller,
                    servo.port(),
                    servo.direction(),
                )))
            },
            Device::AccelerationSensor(d) => {
                Device::AccelerationSensor(Arc::new(AccelerationSensorProxy::new(d)))
            },
            Device::CompassSensor(d) => Device::CompassSensor(Arc::new(CompassSensorProxy::new(d))),
            Device::GyroSensor(d) => Device::GyroSensor(Arc::new(GyroSensorProxy::new(d))),
            Device::IrSeekerSensor(d) => {
                Device::IrSeekerSensor(Arc::new(IrSeekerSensorProxy::new(d)))
            },
            Device::LightSensor(d) => Device::LightSensor(Arc::new(LightSensorProxy::new(d))),
            Device::UltrasonicSensor(d) => {
                Device::UltrasonicSensor(Arc::new(UltrasonicSensorProxy::new(d)))
            },
            Device::VoltageSensor(d) => Device::VoltageSensor(Arc::new(VoltageSensorProxy::new(d))),
        }
    }

    fn motor_controller(&mut self, real: &Arc<dyn DcMotorController>) -> Arc<dyn DcMotorController> {
        Arc::clone(
            self.motor_controllers
                .entry(addr(real))
                .or_insert_with(|| Arc::new(DcMotorControllerProxy::new(Arc::clone(real)))),
        )
    }

    fn servo_controller(&mut self, real: &Arc<dyn ServoController>) -> Arc<dyn ServoController> {
        Arc::clone(
            self.servo_controllers
                .entry(addr(real))
                .or_insert_with(|| Arc::new(ServoControllerProxy::new(Arc::clone(real)))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncop_hardware::sim::{SimMotorController, SimRecorder, SimServoController, SimVoltageSensor};
    use syncop_hardware::{DeviceKind, Direction, HardwareError, VoltageSensor};

    fn host_map(recorder: &SimRecorder) -> HardwareMap {
        let mut map = HardwareMap::new();
        let drive: Arc<dyn DcMotorController> =
            Arc::new(SimMotorController::new("drive", recorder.clone()));
        let arm: Arc<dyn ServoController> =
            Arc::new(SimServoController::new("arm", recorder.clone()));

        map.insert("drive", Device::DcMotorController(drive.clone()));
        map.insert("arm", Device::ServoController(arm.clone()));
        map.insert(
            "left",
            Device::DcMotor(Arc::new(DcMotor::new(drive.clone(), 1, Direction::Forward))),
        );
        map.insert(
            "right",
            Device::DcMotor(Arc::new(DcMotor::new(drive.clone(), 2, Direction::Reverse))),
        );
        map.insert(
            "claw",
            Device::Servo(Arc::new(Servo::new(arm, 1, Direction::Forward))),
        );
        map.insert(
            "battery",
            Device::VoltageSensor(Arc::new(SimVoltageSensor::new("battery", recorder.clone()))),
        );
        map
    }

    #[test]
    fn test_mirror_keys_match_host() {
        let recorder = SimRecorder::new();
        let host = host_map(&recorder);
        let mirrored = mirror(&host);

        assert_eq!(mirrored.keys(), host.keys());
        assert_eq!(mirrored.len(), 6);
        for (kind, name, device) in host.devices() {
            let proxy = mirrored.get(kind, &name).unwrap();
            assert_eq!(proxy.kind(), kind);
            assert_ne!(proxy.addr(), device.addr(), "{kind} '{name}' was not wrapped");
        }
    }

    #[test]
    fn test_composites_share_controller_proxy() {
        let recorder = SimRecorder::new();
        let host = host_map(&recorder);
        let mirrored = mirror(&host);

        let controller = mirrored.dc_motor_controller.get("drive").unwrap();
        let left = mirrored.dc_motor.get("left").unwrap();
        let right = mirrored.dc_motor.get("right").unwrap();
        let host_controller = host.dc_motor_controller.get("drive").unwrap();

        assert_eq!(addr(left.controller()), addr(&controller));
        assert_eq!(addr(right.controller()), addr(&controller));
        assert_ne!(addr(&controller), addr(&host_controller));

        // 端口和方向保持不变
        assert_eq!(left.port(), 1);
        assert_eq!(right.port(), 2);
        assert_eq!(right.direction(), Direction::Reverse);

        let claw = mirrored.servo.get("claw").unwrap();
        let arm = mirrored.servo_controller.get("arm").unwrap();
        assert_eq!(addr(claw.controller()), addr(&arm));
    }

    #[test]
    fn test_proxy_on_unbound_thread() {
        let recorder = SimRecorder::new();
        let mirrored = mirror(&host_map(&recorder));

        let left = mirrored.dc_motor.get("left").unwrap();
        assert_eq!(left.set_power(0.5), Err(HardwareError::NoFacadeBound));
        let battery = mirrored.voltage_sensor.get("battery").unwrap();
        assert_eq!(battery.voltage(), Err(HardwareError::NoFacadeBound));

        // 代理调用从未到达真实设备
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_missing_device_lookup() {
        let mirrored = mirror(&HardwareMap::new());
        assert!(mirrored.is_empty());
        assert_eq!(
            mirrored.dc_motor.get("left").err(),
            Some(HardwareError::NotFound {
                kind: DeviceKind::DcMotor,
                name: "left".to_string(),
            })
        );
    }
}
