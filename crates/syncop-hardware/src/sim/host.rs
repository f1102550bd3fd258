use crate::host::{GamepadPair, GamepadSource, TelemetryFrame, TelemetrySink};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// 可由测试或仿真宿主设置的手柄输入源
#[derive(Debug, Clone, Default)]
pub struct SimGamepads {
    state: Arc<Mutex<GamepadPair>>,
}

impl SimGamepads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, pair: GamepadPair) {
        *self.state.lock() = pair;
    }

    /// 原地修改当前状态
    pub fn update(&self, f: impl FnOnce(&mut GamepadPair)) {
        f(&mut self.state.lock());
    }
}

impl GamepadSource for SimGamepads {
    fn gamepads(&self) -> GamepadPair {
        *self.state.lock()
    }
}

/// 收集遥测帧的输出端
///
/// 每帧同时以 `info` 级别写入日志（target = `syncop::telemetry`）。
#[derive(Debug, Clone, Default)]
pub struct SimTelemetry {
    frames: Arc<Mutex<Vec<TelemetryFrame>>>,
    quiet: bool,
}

impl SimTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 不写日志，只收集
    pub fn quiet() -> Self {
        Self {
            frames: Arc::default(),
            quiet: true,
        }
    }

    pub fn frames(&self) -> Vec<TelemetryFrame> {
        self.frames.lock().clone()
    }

    pub fn last(&self) -> Option<TelemetryFrame> {
        self.frames.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }
}

impl TelemetrySink for SimTelemetry {
    fn publish(&self, frame: &TelemetryFrame) {
        if !self.quiet {
            info!(target: "syncop::telemetry", "{}", frame);
        }
        self.frames.lock().push(frame.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::TelemetryItem;

    #[test]
    fn test_gamepads_update_in_place() {
        let pads = SimGamepads::new();
        pads.update(|p| p.gamepad1.left_stick_y = -1.0);
        assert_eq!(pads.gamepads().gamepad1.left_stick_y, -1.0);
        assert!(pads.gamepads().gamepad2.at_rest());
    }

    #[test]
    fn test_telemetry_collects_frames() {
        let sink = SimTelemetry::quiet();
        let shared = sink.clone();
        sink.publish(&TelemetryFrame {
            items: vec![TelemetryItem {
                key: "heading".to_string(),
                value: "90".to_string(),
            }],
        });
        assert_eq!(shared.len(), 1);
        assert_eq!(shared.last().unwrap().get("heading"), Some("90"));
    }
}
