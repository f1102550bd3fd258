//! 集成测试共用的仿真机器人与宿主驱动辅助函数

#![allow(dead_code)]

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use syncop_sdk::prelude::*;
use syncop_sdk::hardware::sim::{
    SimGyroSensor, SimMotorController, SimRecorder, SimServoController, SimVoltageSensor,
};
use syncop_sdk::{Device, OpModeFacade};

/// 两电机 + 一舵机 + 陀螺仪 + 电压传感器
pub struct Robot {
    pub recorder: SimRecorder,
    pub drive: Arc<SimMotorController>,
    pub arm: Arc<SimServoController>,
    pub gyro: Arc<SimGyroSensor>,
    pub battery: Arc<SimVoltageSensor>,
    pub map: HardwareMap,
}

impl Robot {
    pub fn new() -> Self {
        let recorder = SimRecorder::new();
        let drive = Arc::new(SimMotorController::new("drive", recorder.clone()));
        let arm = Arc::new(SimServoController::new("arm", recorder.clone()));
        let gyro = Arc::new(SimGyroSensor::new("gyro", recorder.clone()));
        let battery = Arc::new(SimVoltageSensor::new("battery", recorder.clone()));

        let mut map = HardwareMap::new();
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
            Device::Servo(Arc::new(Servo::new(arm.clone(), 1, Direction::Forward))),
        );
        map.insert("gyro", Device::GyroSensor(gyro.clone()));
        map.insert("battery", Device::VoltageSensor(battery.clone()));

        Self {
            recorder,
            drive,
            arm,
            gyro,
            battery,
            map,
        }
    }
}

/// 以约 1ms 周期驱动 `loop_tick`，直到条件满足或超时
pub fn tick_until(
    facade: &mut OpModeFacade,
    timeout: Duration,
    mut done: impl FnMut(&OpModeFacade) -> bool,
) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if done(facade) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        facade.loop_tick();
        thread::sleep(Duration::from_millis(1));
    }
}

/// 等待条件在另一个线程上成立（不驱动 tick）
pub fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    done()
}
