use super::{forward, impl_proxy_device};
use std::sync::Arc;
use syncop_hardware::{
    Acceleration, AccelerationSensor, CompassMode, CompassSensor, GyroSensor, HardwareDevice,
    HwResult, IrSeekerMode, IrSeekerSensor, LightSensor, UltrasonicSensor, VoltageSensor,
};

/// 定义一个只包装目标设备的代理类型
macro_rules! proxy_type {
    ($(#[$doc:meta])* $name:ident, $target:ident) => {
        $(#[$doc])*
        pub struct $name {
            target: Arc<dyn $target>,
        }

        impl $name {
            pub fn new(target: Arc<dyn $target>) -> Self {
                Self { target }
            }
        }

        impl_proxy_device!($name);
    };
}

proxy_type!(
    /// 加速度传感器代理
    AccelerationSensorProxy,
    AccelerationSensor
);

impl AccelerationSensor for AccelerationSensorProxy {
    fn acceleration(&self) -> HwResult<Acceleration> {
        forward!(read self.acceleration())
    }

    fn status(&self) -> HwResult<String> {
        forward!(read self.status())
    }
}

proxy_type!(
    /// 罗盘传感器代理
    CompassSensorProxy,
    CompassSensor
);

impl CompassSensor for CompassSensorProxy {
    fn direction(&self) -> HwResult<f64> {
        forward!(read self.direction())
    }

    fn set_mode(&self, mode: CompassMode) -> HwResult<()> {
        forward!(write self.set_mode(mode))
    }

    fn calibration_failed(&self) -> HwResult<bool> {
        forward!(read self.calibration_failed())
    }
}

proxy_type!(
    /// 陀螺仪代理
    GyroSensorProxy,
    GyroSensor
);

impl GyroSensor for GyroSensorProxy {
    fn calibrate(&self) -> HwResult<()> {
        forward!(write self.calibrate())
    }

    fn is_calibrating(&self) -> HwResult<bool> {
        forward!(read self.is_calibrating())
    }

    fn heading(&self) -> HwResult<i32> {
        forward!(read self.heading())
    }

    fn rotation(&self) -> HwResult<f64> {
        forward!(read self.rotation())
    }
}

proxy_type!(
    /// 红外搜索传感器代理
    IrSeekerSensorProxy,
    IrSeekerSensor
);

impl IrSeekerSensor for IrSeekerSensorProxy {
    fn set_mode(&self, mode: IrSeekerMode) -> HwResult<()> {
        forward!(write self.set_mode(mode))
    }

    fn mode(&self) -> HwResult<IrSeekerMode> {
        forward!(read self.mode())
    }

    fn signal_detected(&self) -> HwResult<bool> {
        forward!(read self.signal_detected())
    }

    fn angle(&self) -> HwResult<f64> {
        forward!(read self.angle())
    }

    fn strength(&self) -> HwResult<f64> {
        forward!(read self.strength())
    }
}

proxy_type!(
    /// 光线传感器代理
    LightSensorProxy,
    LightSensor
);

impl LightSensor for LightSensorProxy {
    fn light_detected(&self) -> HwResult<f64> {
        forward!(read self.light_detected())
    }

    fn enable_led(&self, enabled: bool) -> HwResult<()> {
        forward!(write self.enable_led(enabled))
    }
}

proxy_type!(
    /// 超声波传感器代理
    UltrasonicSensorProxy,
    UltrasonicSensor
);

impl UltrasonicSensor for UltrasonicSensorProxy {
    fn ultrasonic_level(&self) -> HwResult<f64> {
        forward!(read self.ultrasonic_level())
    }
}

proxy_type!(
    /// 电压传感器代理
    VoltageSensorProxy,
    VoltageSensor
);

impl VoltageSensor for VoltageSensorProxy {
    fn voltage(&self) -> HwResult<f64> {
        forward!(read self.voltage())
    }
}
