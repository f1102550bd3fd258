//! 演示 op mode
//!
//! 全部按顺序风格编写：等待开始、读传感器、写电机、睡眠，与普通单线程程序无异。

use crate::config::{OpModeConfig, OpModeKind};
use std::time::Duration;
use syncop_sdk::prelude::*;

/// 编码器每转计数
const COUNTS_PER_REV: f64 = 1120.0;
/// 左右编码器差的比例增益（每转差值对应的功率修正）
const BALANCE_GAIN: f64 = 0.5;
const MAX_CORRECTION: f64 = 0.2;

/// 按配置构造 facade builder
pub fn builder(config: &OpModeConfig) -> FacadeBuilder {
    match config.name {
        OpModeKind::DriveStraight => FacadeBuilder::new(DriveStraight {
            power: config.power,
            target_revs: config.target_revs,
        }),
        OpModeKind::Teleop => FacadeBuilder::new(Teleop),
        OpModeKind::Square => FacadeBuilder::new(Square {
            power: config.power,
            leg: Duration::from_millis(config.leg_ms),
            turn: Duration::from_millis(config.turn_ms),
        }),
    }
}

fn clamp_power(power: f64) -> f64 {
    power.clamp(-1.0, 1.0)
}

/// 编码器平衡的直线行驶：跑满目标圈数后停车
pub struct DriveStraight {
    pub power: f64,
    pub target_revs: f64,
}

impl SyncOpMode for DriveStraight {
    fn name(&self) -> &str {
        "drive-straight"
    }

    fn main(&mut self, ctx: &mut OpModeContext) -> Result<(), OpModeError> {
        let left = ctx.hardware_map().dc_motor.get("left")?;
        let right = ctx.hardware_map().dc_motor.get("right")?;

        left.set_mode(RunMode::ResetEncoders)?;
        right.set_mode(RunMode::ResetEncoders)?;
        ctx.telemetry.add_data("status", "waiting for start");
        ctx.telemetry.update()?;

        ctx.wait_for_start()?;
        ctx.wait_for_next_loop()?;
        left.set_mode(RunMode::RunUsingEncoders)?;
        right.set_mode(RunMode::RunUsingEncoders)?;

        let target = (self.target_revs * COUNTS_PER_REV) as i32;
        while ctx.op_mode_is_active() {
            let l = left.current_position()?.abs();
            let r = right.current_position()?.abs();
            if l.min(r) >= target {
                break;
            }

            // 领先的一侧减速
            let error = f64::from(l - r) / COUNTS_PER_REV;
            let correction = (error * BALANCE_GAIN).clamp(-MAX_CORRECTION, MAX_CORRECTION);
            left.set_power(clamp_power(self.power - correction))?;
            right.set_power(clamp_power(self.power + correction))?;

            ctx.telemetry.add_data("left", l);
            ctx.telemetry.add_data("right", r);
            ctx.telemetry.add_data("target", target);
            ctx.telemetry.update()?;
            ctx.wait_for_next_loop()?;
        }

        left.set_power(0.0)?;
        right.set_power(0.0)?;
        ctx.telemetry.add_data("status", "arrived");
        ctx.telemetry.update()?;
        Ok(())
    }
}

/// 手柄遥控：左摇杆前后、右摇杆转向，A/B 开合爪子
pub struct Teleop;

impl SyncOpMode for Teleop {
    fn name(&self) -> &str {
        "teleop"
    }

    fn main(&mut self, ctx: &mut OpModeContext) -> Result<(), OpModeError> {
        let left = ctx.hardware_map().dc_motor.get("left")?;
        let right = ctx.hardware_map().dc_motor.get("right")?;
        let claw = ctx.hardware_map().servo.get("claw").ok();
        let battery = ctx.hardware_map().voltage_sensor.get("battery").ok();
        let gyro = ctx.hardware_map().gyro_sensor.get("gyro").ok();

        if let Some(gyro) = &gyro {
            gyro.calibrate()?;
        }
        ctx.wait_for_start()?;

        while ctx.op_mode_is_active() {
            ctx.update_gamepads();
            let pad = ctx.gamepad1;
            let drive = -f64::from(pad.left_stick_y);
            let turn = f64::from(pad.right_stick_x);
            left.set_power(clamp_power(drive + turn))?;
            right.set_power(clamp_power(drive - turn))?;

            if let Some(claw) = &claw {
                if pad.a {
                    claw.set_position(1.0)?;
                } else if pad.b {
                    claw.set_position(0.0)?;
                }
            }

            ctx.telemetry.add_data("drive", format!("{drive:+.2}"));
            ctx.telemetry.add_data("turn", format!("{turn:+.2}"));
            if let Some(gyro) = &gyro {
                ctx.telemetry.add_data("heading", gyro.heading()?);
            }
            if let Some(battery) = &battery {
                ctx.telemetry.add_data("battery", format!("{:.2}V", battery.voltage()?));
            }
            ctx.telemetry.update()?;
            ctx.wait_for_next_loop()?;
        }
        Ok(())
    }
}

/// 定时走正方形：四次“直行 + 原地转向”
pub struct Square {
    pub power: f64,
    pub leg: Duration,
    pub turn: Duration,
}

impl SyncOpMode for Square {
    fn name(&self) -> &str {
        "square"
    }

    fn main(&mut self, ctx: &mut OpModeContext) -> Result<(), OpModeError> {
        let left = ctx.hardware_map().dc_motor.get("left")?;
        let right = ctx.hardware_map().dc_motor.get("right")?;
        let power = clamp_power(self.power);

        ctx.wait_for_start()?;
        for side in 1..=4 {
            ctx.telemetry.add_data("side", side);
            ctx.telemetry.add_data("phase", "forward");
            ctx.telemetry.update()?;
            left.set_power(power)?;
            right.set_power(power)?;
            ctx.sleep(self.leg)?;

            ctx.telemetry.add_data("side", side);
            ctx.telemetry.add_data("phase", "turn");
            ctx.telemetry.update()?;
            left.set_power(power)?;
            right.set_power(-power)?;
            ctx.sleep(self.turn)?;
        }

        left.set_power(0.0)?;
        right.set_power(0.0)?;
        Ok(())
    }
}
