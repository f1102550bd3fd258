//! 设备注册表（Hardware Map）
//!
//! 按设备种类分组的 `名称 → 设备` 映射。宿主在 `start` 时把注册表交给 op mode，
//! 镜像注册表与之结构完全相同，只是每个设备都被替换为代理。

use crate::devices::*;
use crate::error::HardwareError;
use crate::kind::DeviceKind;
use std::collections::BTreeMap;
use std::sync::Arc;

/// 任意种类设备的带标签引用
///
/// 种类集合是封闭的，每个变体对应一个 [`DeviceKind`]。
#[derive(Clone)]
pub enum Device {
    DcMotorController(Arc<dyn DcMotorController>),
    ServoController(Arc<dyn ServoController>),
    LegacyModule(Arc<dyn LegacyModule>),
    DcMotor(Arc<DcMotor>),
    Servo(Arc<Servo>),
    AccelerationSensor(Arc<dyn AccelerationSensor>),
    CompassSensor(Arc<dyn CompassSensor>),
    GyroSensor(Arc<dyn GyroSensor>),
    IrSeekerSensor(Arc<dyn IrSeekerSensor>),
    LightSensor(Arc<dyn LightSensor>),
    UltrasonicSensor(Arc<dyn UltrasonicSensor>),
    VoltageSensor(Arc<dyn VoltageSensor>),
}

impl Device {
    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::DcMotorController(_) => DeviceKind::DcMotorController,
            Self::ServoController(_) => DeviceKind::ServoController,
            Self::LegacyModule(_) => DeviceKind::LegacyModule,
            Self::DcMotor(_) => DeviceKind::DcMotor,
            Self::Servo(_) => DeviceKind::Servo,
            Self::AccelerationSensor(_) => DeviceKind::AccelerationSensor,
            Self::CompassSensor(_) => DeviceKind::CompassSensor,
            Self::GyroSensor(_) => DeviceKind::GyroSensor,
            Self::IrSeekerSensor(_) => DeviceKind::IrSeekerSensor,
            Self::LightSensor(_) => DeviceKind::LightSensor,
            Self::UltrasonicSensor(_) => DeviceKind::UltrasonicSensor,
            Self::VoltageSensor(_) => DeviceKind::VoltageSensor,
        }
    }

    /// 设备对象地址（忽略 vtable），用于判断两个引用是否指向同一对象
    pub fn addr(&self) -> usize {
        match self {
            Self::DcMotorController(d) => Arc::as_ptr(d) as *const () as usize,
            Self::ServoController(d) => Arc::as_ptr(d) as *const () as usize,
            Self::LegacyModule(d) => Arc::as_ptr(d) as *const () as usize,
            Self::DcMotor(d) => Arc::as_ptr(d) as *const () as usize,
            Self::Servo(d) => Arc::as_ptr(d) as *const () as usize,
            Self::AccelerationSensor(d) => Arc::as_ptr(d) as *const () as usize,
            Self::CompassSensor(d) => Arc::as_ptr(d) as *const () as usize,
            Self::GyroSensor(d) => Arc::as_ptr(d) as *const () as usize,
            Self::IrSeekerSensor(d) => Arc::as_ptr(d) as *const () as usize,
            Self::LightSensor(d) => Arc::as_ptr(d) as *const () as usize,
            Self::UltrasonicSensor(d) => Arc::as_ptr(d) as *const () as usize,
            Self::VoltageSensor(d) => Arc::as_ptr(d) as *const () as usize,
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Device({}@{:#x})", self.kind(), self.addr())
    }
}

/// 单一种类的 `名称 → 设备` 映射
#[derive(Clone)]
pub struct DeviceMapping<T> {
    kind: DeviceKind,
    entries: BTreeMap<String, T>,
}

impl<T: Clone> DeviceMapping<T> {
    pub fn new(kind: DeviceKind) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// 按名称查找设备
    ///
    /// # 错误
    /// - `HardwareError::NotFound`: 名称不存在
    pub fn get(&self, name: &str) -> Result<T, HardwareError> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| HardwareError::NotFound {
                kind: self.kind,
                name: name.to_string(),
            })
    }

    pub fn insert(&mut self, name: impl Into<String>, device: T) -> Option<T> {
        self.entries.insert(name.into(), device)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// 设备注册表
///
/// 字段按种类分组，与宿主注册表一一对应。
#[derive(Clone)]
pub struct HardwareMap {
    pub dc_motor_controller: DeviceMapping<Arc<dyn DcMotorController>>,
    pub servo_controller: DeviceMapping<Arc<dyn ServoController>>,
    pub legacy_module: DeviceMapping<Arc<dyn LegacyModule>>,
    pub dc_motor: DeviceMapping<Arc<DcMotor>>,
    pub servo: DeviceMapping<Arc<Servo>>,
    pub acceleration_sensor: DeviceMapping<Arc<dyn AccelerationSensor>>,
    pub compass_sensor: DeviceMapping<Arc<dyn CompassSensor>>,
    pub gyro_sensor: DeviceMapping<Arc<dyn GyroSensor>>,
    pub ir_seeker_sensor: DeviceMapping<Arc<dyn IrSeekerSensor>>,
    pub light_sensor: DeviceMapping<Arc<dyn LightSensor>>,
    pub ultrasonic_sensor: DeviceMapping<Arc<dyn UltrasonicSensor>>,
    pub voltage_sensor: DeviceMapping<Arc<dyn VoltageSensor>>,
}

impl Default for HardwareMap {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareMap {
    pub fn new() -> Self {
        Self {
            dc_motor_controller: DeviceMapping::new(DeviceKind::DcMotorController),
            servo_controller: DeviceMapping::new(DeviceKind::ServoController),
            legacy_module: DeviceMapping::new(DeviceKind::LegacyModule),
            dc_motor: DeviceMapping::new(DeviceKind::DcMotor),
            servo: DeviceMapping::new(DeviceKind::Servo),
            acceleration_sensor: DeviceMapping::new(DeviceKind::AccelerationSensor),
            compass_sensor: DeviceMapping::new(DeviceKind::CompassSensor),
            gyro_sensor: DeviceMapping::new(DeviceKind::GyroSensor),
            ir_seeker_sensor: DeviceMapping::new(DeviceKind::IrSeekerSensor),
            light_sensor: DeviceMapping::new(DeviceKind::LightSensor),
            ultrasonic_sensor: DeviceMapping::new(DeviceKind::UltrasonicSensor),
            voltage_sensor: DeviceMapping::new(DeviceKind::VoltageSensor),
        }
    }

    /// 插入设备，按变体路由到对应种类
    ///
    /// 返回同种类同名的旧设备（如有）。
    pub fn insert(&mut self, name: impl Into<String>, device: Device) -> Option<Device> {
        let name = name.into();
        match device {
            Device::DcMotorController(d) => self
                .dc_motor_controller
                .insert(name, d)
                .map(Device::DcMotorController),
            Device::ServoController(d) => self
                .servo_controller
                .insert(name, d)
                .map(Device::ServoController),
            Device::LegacyModule(d) => self.legacy_module.insert(name, d).map(Device::LegacyModule),
            Device::DcMotor(d) => self.dc_motor.insert(name, d).map(Device::DcMotor),
            Device::Servo(d) => self.servo.insert(name, d).map(Device::Servo),
            Device::AccelerationSensor(d) => self
                .acceleration_sensor
                .insert(name, d)
                .map(Device::AccelerationSensor),
            Device::CompassSensor(d) => self
                .compass_sensor
                .insert(name, d)
                .map(Device::CompassSensor),
            Device::GyroSensor(d) => self.gyro_sensor.insert(name, d).map(Device::GyroSensor),
            Device::IrSeekerSensor(d) => self
                .ir_seeker_sensor
                .insert(name, d)
                .map(Device::IrSeekerSensor),
            Device::LightSensor(d) => self.light_sensor.insert(name, d).map(Device::LightSensor),
            Device::UltrasonicSensor(d) => self
                .ultrasonic_sensor
                .insert(name, d)
                .map(Device::UltrasonicSensor),
            Device::VoltageSensor(d) => self
                .voltage_sensor
                .insert(name, d)
                .map(Device::VoltageSensor),
        }
    }

    /// 按 `(kind, name)` 查找
    pub fn get(&self, kind: DeviceKind, name: &str) -> Option<Device> {
        match kind {
            DeviceKind::DcMotorController => {
                self.dc_motor_controller.get(name).ok().map(Device::DcMotorController)
            },
            DeviceKind::ServoController => {
                self.servo_controller.get(name).ok().map(Device::ServoController)
            },
            DeviceKind::LegacyModule => self.legacy_module.get(name).ok().map(Device::LegacyModule),
            DeviceKind::DcMotor => self.dc_motor.get(name).ok().map(Device::DcMotor),
            DeviceKind::Servo => self.servo.get(name).ok().map(Device::Servo),
            DeviceKind::AccelerationSensor => self
                .acceleration_sensor
                .get(name)
                .ok()
                .map(Device::AccelerationSensor),
            DeviceKind::CompassSensor => {
                self.compass_sensor.get(name).ok().map(Device::CompassSensor)
            },
            DeviceKind::GyroSensor => self.gyro_sensor.get(name).ok().map(Device::GyroSensor),
            DeviceKind::IrSeekerSensor => {
                self.ir_seeker_sensor.get(name).ok().map(Device::IrSeekerSensor)
            },
            DeviceKind::LightSensor => self.light_sensor.get(name).ok().map(Device::LightSensor),
            DeviceKind::UltrasonicSensor => self
                .ultrasonic_sensor
                .get(name)
                .ok()
                .map(Device::UltrasonicSensor),
            DeviceKind::VoltageSensor => {
                self.voltage_sensor.get(name).ok().map(Device::VoltageSensor)
            },
        }
    }

    /// 指定种类下的全部名称（有序）
    pub fn names(&self, kind: DeviceKind) -> Vec<String> {
        fn collect<T: Clone>(m: &DeviceMapping<T>) -> Vec<String> {
            m.names().map(str::to_string).collect()
        }
        match kind {
            DeviceKind::DcMotorController => collect(&self.dc_motor_controller),
            DeviceKind::ServoController => collect(&self.servo_controller),
            DeviceKind::LegacyModule => collect(&self.legacy_module),
            DeviceKind::DcMotor => collect(&self.dc_motor),
            DeviceKind::Servo => collect(&self.servo),
            DeviceKind::AccelerationSensor => collect(&self.acceleration_sensor),
            DeviceKind::CompassSensor => collect(&self.compass_sensor),
            DeviceKind::GyroSensor => collect(&self.gyro_sensor),
            DeviceKind::IrSeekerSensor => collect(&self.ir_seeker_sensor),
            DeviceKind::LightSensor => collect(&self.light_sensor),
            DeviceKind::UltrasonicSensor => collect(&self.ultrasonic_sensor),
            DeviceKind::VoltageSensor => collect(&self.voltage_sensor),
        }
    }

    /// 全部条目，按种类再按名称排序
    pub fn devices(&self) -> Vec<(DeviceKind, String, Device)> {
        let mut out = Vec::with_capacity(self.len());
        for kind in DeviceKind::ALL {
            for name in self.names(kind) {
                if let Some(device) = self.get(kind, &name) {
                    out.push((kind, name, device));
                }
            }
        }
        out
    }

    /// 全部 `(kind, name)` 键
    pub fn keys(&self) -> Vec<(DeviceKind, String)> {
        DeviceKind::ALL
            .iter()
            .flat_map(|&kind| self.names(kind).into_iter().map(move |name| (kind, name)))
            .collect()
    }

    pub fn len(&self) -> usize {
        DeviceKind::ALL.iter().map(|&k| self.names(k).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
