//! 仿真宿主配置（TOML）
//!
//! ```toml
//! [host]
//! tick_hz = 50.0
//! run_seconds = 10.0
//!
//! [facade]
//! grace_period_ms = 100
//!
//! [[device]]
//! kind = "dc_motor_controller"
//! name = "drive"
//!
//! [[device]]
//! kind = "dc_motor"
//! name = "left"
//! controller = "drive"
//! port = 1
//!
//! [opmode]
//! name = "drive-straight"
//! ```

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use syncop_sdk::FacadeConfig;
use syncop_sdk::hardware::{DeviceKind, Direction};

/// 仿真宿主完整配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub host: HostConfig,
    pub facade: FacadeConfig,
    #[serde(rename = "device")]
    pub devices: Vec<DeviceSpec>,
    pub opmode: OpModeConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            host: HostConfig::default(),
            facade: FacadeConfig::default(),
            devices: default_robot(),
            opmode: OpModeConfig::default(),
        }
    }
}

impl SimConfig {
    /// 从 TOML 文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("解析配置文件失败: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.host.tick_hz > 0.0 && self.host.tick_hz <= 10_000.0) {
            bail!("tick_hz must be in (0, 10000], got {}", self.host.tick_hz);
        }
        if let Some(seconds) = self.host.run_seconds
            && seconds <= 0.0
        {
            bail!("run_seconds must be positive, got {seconds}");
        }
        self.facade.validate()?;
        Ok(())
    }
}

/// `[host]`：tick 节奏与运行时长
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// loop 频率（Hz）
    pub tick_hz: f64,
    /// 最多 tick 次数
    pub max_ticks: Option<u64>,
    /// 最长运行时间（秒）
    pub run_seconds: Option<f64>,
    /// 按时间脚本生成手柄输入（teleop 演示用）
    pub scripted_gamepads: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            tick_hz: 50.0,
            max_ticks: None,
            run_seconds: Some(30.0),
            scripted_gamepads: true,
        }
    }
}

/// `[[device]]`：一个仿真设备
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub kind: DeviceKind,
    pub name: String,
    /// 复合设备所在的控制器端口
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u8>,
    /// 复合设备所属控制器名称
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    #[serde(default)]
    pub direction: Direction,
}

impl DeviceSpec {
    fn standalone(kind: DeviceKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            port: None,
            controller: None,
            direction: Direction::Forward,
        }
    }

    fn attached(kind: DeviceKind, name: &str, controller: &str, port: u8, direction: Direction) -> Self {
        Self {
            kind,
            name: name.to_string(),
            port: Some(port),
            controller: Some(controller.to_string()),
            direction,
        }
    }
}

/// 默认机器人：双电机底盘 + 一个舵机 + 陀螺仪 + 电池电压
fn default_robot() -> Vec<DeviceSpec> {
    vec![
        DeviceSpec::standalone(DeviceKind::DcMotorController, "drive"),
        DeviceSpec::standalone(DeviceKind::ServoController, "arm"),
        DeviceSpec::attached(DeviceKind::DcMotor, "left", "drive", 1, Direction::Forward),
        DeviceSpec::attached(DeviceKind::DcMotor, "right", "drive", 2, Direction::Reverse),
        DeviceSpec::attached(DeviceKind::Servo, "claw", "arm", 1, Direction::Forward),
        DeviceSpec::standalone(DeviceKind::GyroSensor, "gyro"),
        DeviceSpec::standalone(DeviceKind::VoltageSensor, "battery"),
    ]
}

/// 演示 op mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OpModeKind {
    /// 编码器平衡的直线行驶
    #[default]
    DriveStraight,
    /// 手柄遥控 + 遥测
    Teleop,
    /// 定时走正方形
    Square,
}

/// `[opmode]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpModeConfig {
    pub name: OpModeKind,
    /// 行驶功率 [0, 1]
    pub power: f64,
    /// drive-straight 的目标圈数
    pub target_revs: f64,
    /// square 每条边的行驶时间（毫秒）
    pub leg_ms: u64,
    /// square 每次转向的时间（毫秒）
    pub turn_ms: u64,
}

impl Default for OpModeConfig {
    fn default() -> Self {
        Self {
            name: OpModeKind::DriveStraight,
            power: 0.5,
            target_revs: 3.0,
            leg_ms: 1000,
            turn_ms: 400,
        }
    }
}
