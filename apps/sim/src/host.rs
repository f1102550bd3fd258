//! 仿真宿主的 tick 循环
//!
//! 当前线程即 tick 线程：`start` → 固定周期的 `loop_tick` → `stop`。
//! 每个 tick 先推进物理仿真，再刷新手柄输入，最后交给 facade 排空 action。

use crate::config::HostConfig;
use crate::robot::SimRobot;
use spin_sleep::SpinSleeper;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use syncop_sdk::sim::SimGamepads;
use syncop_sdk::{
    DrainReport, GamepadPair, LoopHook, MetricsSnapshot, OpMode, OpModeFacade, StopOutcome,
    WorkerExit,
};
use tracing::{debug, info, warn};

/// 排空耗时超过 tick 周期一半时告警
pub struct SlowDrainHook {
    budget: Duration,
    slow: AtomicU64,
}

impl SlowDrainHook {
    pub fn new(period: Duration) -> Self {
        Self {
            budget: period / 2,
            slow: AtomicU64::new(0),
        }
    }

    pub fn slow_ticks(&self) -> u64 {
        self.slow.load(Ordering::Relaxed)
    }
}

impl LoopHook for SlowDrainHook {
    fn post_loop(&self, tick: u64, report: &DrainReport) {
        if report.elapsed > self.budget {
            self.slow.fetch_add(1, Ordering::Relaxed);
            warn!(
                tick,
                executed = report.executed,
                elapsed = ?report.elapsed,
                budget = ?self.budget,
                "Slow drain"
            );
        }
    }
}

/// 按时间生成的手柄输入：缓慢的前后摆动 + 周期性转向，每 4 秒交替按 A / B
pub fn scripted_gamepads(t: Duration) -> GamepadPair {
    let secs = t.as_secs_f32();
    let mut pair = GamepadPair::default();
    let pad = &mut pair.gamepad1;
    pad.left_stick_y = -(secs * 0.5).sin() * 0.8;
    pad.right_stick_x = if (secs as u32) % 5 == 4 { 0.6 } else { 0.0 };
    pad.a = (secs as u32 / 4) % 2 == 0;
    pad.b = !pad.a;
    pair
}

/// 一次运行的汇总
#[derive(Debug)]
pub struct RunSummary {
    pub ticks: u64,
    pub elapsed: Duration,
    pub overruns: u64,
    pub device_calls: usize,
    pub outcome: StopOutcome,
    pub exit: Option<WorkerExit>,
    pub metrics: MetricsSnapshot,
}

/// 宿主循环
pub struct SimHost<'a> {
    config: &'a HostConfig,
    robot: &'a SimRobot,
    gamepads: &'a SimGamepads,
    running: &'a AtomicBool,
}

impl<'a> SimHost<'a> {
    pub fn new(
        config: &'a HostConfig,
        robot: &'a SimRobot,
        gamepads: &'a SimGamepads,
        running: &'a AtomicBool,
    ) -> Self {
        Self {
            config,
            robot,
            gamepads,
            running,
        }
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.config.tick_hz)
    }

    fn time_is_up(&self, ticks: u64, elapsed: Duration) -> bool {
        if let Some(max) = self.config.max_ticks
            && ticks >= max
        {
            return true;
        }
        self.config
            .run_seconds
            .is_some_and(|secs| elapsed.as_secs_f64() >= secs)
    }

    fn tick(&self, facade: &mut OpModeFacade, dt: Duration, since_start: Duration) -> usize {
        self.robot.advance(dt.as_secs_f64());
        if self.config.scripted_gamepads {
            self.gamepads.set(scripted_gamepads(since_start));
        }
        facade.loop_tick();
        self.robot.take_call_count()
    }

    /// 运行到 Ctrl-C、时间用尽或 `main` 结束
    pub fn run(&self, facade: &mut OpModeFacade) -> RunSummary {
        let period = self.period();
        let sleeper = SpinSleeper::default();

        facade.start(&self.robot.map);
        let started = Instant::now();
        let mut last = started;
        let mut next = started;
        let mut ticks = 0u64;
        let mut overruns = 0u64;
        let mut device_calls = 0usize;

        while self.running.load(Ordering::Acquire) {
            if self.time_is_up(ticks, started.elapsed()) {
                info!(ticks, "Run limit reached");
                break;
            }
            if let Some(exit) = facade.worker_exit() {
                info!(?exit, ticks, "main finished");
                // 把 main 结束前提交的 action 冲刷到设备
                if facade.pending_actions() > 0 {
                    device_calls += self.tick(facade, last.elapsed(), started.elapsed());
                    ticks += 1;
                }
                break;
            }

            let now = Instant::now();
            let dt = now - last;
            last = now;
            device_calls += self.tick(facade, dt, now - started);
            ticks += 1;

            next += period;
            let now = Instant::now();
            if next > now {
                sleeper.sleep(next - now);
            } else {
                overruns += 1;
                debug!(tick = ticks, behind = ?(now - next), "Tick overran its period");
                next = now;
            }
        }

        let outcome = facade.stop();
        RunSummary {
            ticks,
            elapsed: started.elapsed(),
            overruns,
            device_calls,
            outcome,
            exit: facade.worker_exit(),
            metrics: facade.metrics(),
        }
    }
}
