//! # SyncOp Sim
//!
//! 仿真宿主：以固定频率驱动 `loop`，在仿真硬件上运行顺序式 op mode。
//!
//! ```bash
//! # 默认机器人 + drive-straight
//! syncop-sim
//!
//! # 指定配置文件和 op mode
//! syncop-sim --config apps/sim/sim.toml --opmode teleop --seconds 10
//!
//! # 打印生效的配置
//! syncop-sim --print-config
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use syncop_sdk::sim::{SimGamepads, SimTelemetry};
use tracing::info;

mod config;
mod host;
mod opmodes;
mod robot;

use config::{OpModeKind, SimConfig};
use host::{SimHost, SlowDrainHook};
use robot::SimRobot;

/// SyncOp 仿真宿主
#[derive(Parser, Debug)]
#[command(name = "syncop-sim")]
#[command(about = "Run a synchronous op mode against simulated hardware", long_about = None)]
#[command(version)]
struct Args {
    /// TOML 配置文件（缺省使用内置的双电机机器人）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 要运行的 op mode
    #[arg(short, long, value_enum)]
    opmode: Option<OpModeKind>,

    /// loop 频率（Hz）
    #[arg(long)]
    tick_hz: Option<f64>,

    /// 最长运行时间（秒）
    #[arg(long)]
    seconds: Option<f64>,

    /// 最多 tick 次数
    #[arg(long)]
    max_ticks: Option<u64>,

    /// stop 宽限期（毫秒）
    #[arg(long)]
    grace_ms: Option<u64>,

    /// 不把遥测写入日志
    #[arg(long)]
    quiet_telemetry: bool,

    /// 打印生效的配置后退出
    #[arg(long)]
    print_config: bool,
}

impl Args {
    /// 载入配置文件并应用命令行覆盖
    fn resolve(&self) -> Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => SimConfig::load(path)?,
            None => SimConfig::default(),
        };
        if let Some(opmode) = self.opmode {
            config.opmode.name = opmode;
        }
        if let Some(hz) = self.tick_hz {
            config.host.tick_hz = hz;
        }
        if let Some(seconds) = self.seconds {
            config.host.run_seconds = Some(seconds);
        }
        if let Some(max) = self.max_ticks {
            config.host.max_ticks = Some(max);
        }
        if let Some(grace) = self.grace_ms {
            config.facade.grace_period_ms = grace;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("syncop=info".parse()?),
        )
        .with_thread_names(true)
        .init();

    let args = Args::parse();
    let config = args.resolve()?;
    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let robot = SimRobot::build(&config.devices).context("装配仿真机器人失败")?;
    let gamepads = SimGamepads::new();
    let telemetry = if args.quiet_telemetry {
        SimTelemetry::quiet()
    } else {
        SimTelemetry::new()
    };

    // Ctrl+C：停止 tick 循环，走正常的 stop 流程
    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        eprintln!("\nReceived interrupt signal. Stopping op mode...");
        handler_flag.store(false, Ordering::Release);
    })
    .context("Failed to set signal handler")?;

    let host = SimHost::new(&config.host, &robot, &gamepads, &running);
    let slow_drains = Arc::new(SlowDrainHook::new(host.period()));
    let mut facade = opmodes::builder(&config.opmode)
        .config(config.facade.clone())
        .gamepads(Arc::new(gamepads.clone()))
        .telemetry(Arc::new(telemetry.clone()))
        .hook(slow_drains.clone())
        .build()?;

    info!(
        opmode = facade.name(),
        tick_hz = config.host.tick_hz,
        devices = robot.map.len(),
        "Starting simulation"
    );
    let summary = host.run(&mut facade);

    let metrics = summary.metrics;
    println!();
    println!("op mode:        {}", facade.name());
    println!("worker exit:    {:?}", summary.exit);
    println!("stop outcome:   {:?}", summary.outcome);
    println!(
        "ticks:          {} in {:.2?} ({} overruns, {} slow drains)",
        summary.ticks,
        summary.elapsed,
        summary.overruns,
        slow_drains.slow_ticks()
    );
    println!("device calls:   {}", summary.device_calls);
    println!("telemetry:      {} frames", telemetry.len());
    println!(
        "actions:        {} enqueued, {} executed, {} failed, {} discarded (max depth {})",
        metrics.actions_enqueued,
        metrics.actions_executed,
        metrics.actions_failed,
        metrics.actions_discarded,
        metrics.queue_depth_max
    );
    println!("per loop:       {:.2} actions", metrics.actions_per_loop());
    if let Some(last) = telemetry.last() {
        println!("last frame:     {last}");
    }
    Ok(())
}
