//! 宿主提供的非设备 I/O：手柄状态和遥测输出
//!
//! 与设备相同，这些对象只在 loop 线程上被访问。

use std::fmt;

/// 手柄状态快照
///
/// 摇杆范围 [-1, 1]，扳机范围 [0, 1]。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Gamepad {
    pub left_stick_x: f32,
    pub left_stick_y: f32,
    pub right_stick_x: f32,
    pub right_stick_y: f32,
    pub left_trigger: f32,
    pub right_trigger: f32,
    pub left_bumper: bool,
    pub right_bumper: bool,
    pub dpad_up: bool,
    pub dpad_down: bool,
    pub dpad_left: bool,
    pub dpad_right: bool,
    pub a: bool,
    pub b: bool,
    pub x: bool,
    pub y: bool,
    pub start: bool,
    pub back: bool,
}

impl Gamepad {
    /// 摇杆死区
    pub const DEADZONE: f32 = 0.05;

    /// 是否处于静止状态（所有输入都在死区内、无按键）
    pub fn at_rest(&self) -> bool {
        let axes = [
            self.left_stick_x,
            self.left_stick_y,
            self.right_stick_x,
            self.right_stick_y,
            self.left_trigger,
            self.right_trigger,
        ];
        axes.iter().all(|v| v.abs() < Self::DEADZONE)
            && !(self.left_bumper
                || self.right_bumper
                || self.dpad_up
                || self.dpad_down
                || self.dpad_left
                || self.dpad_right
                || self.a
                || self.b
                || self.x
                || self.y
                || self.start
                || self.back)
    }
}

/// 一对手柄（gamepad1 / gamepad2）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GamepadPair {
    pub gamepad1: Gamepad,
    pub gamepad2: Gamepad,
}

/// 宿主手柄输入源
pub trait GamepadSource: Send + Sync {
    /// 读取当前手柄状态（在 loop 线程上调用）
    fn gamepads(&self) -> GamepadPair;
}

/// 遥测条目
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryItem {
    pub key: String,
    pub value: String,
}

/// 一帧遥测数据
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TelemetryFrame {
    pub items: Vec<TelemetryItem>,
}

impl TelemetryFrame {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.items
            .iter()
            .rev()
            .find(|item| item.key == key)
            .map(|item| item.value.as_str())
    }
}

impl fmt::Display for TelemetryFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}: {}", item.key, item.value)?;
        }
        Ok(())
    }
}

/// 宿主遥测输出
pub trait TelemetrySink: Send + Sync {
    /// 发布一帧遥测（在 loop 线程上调用）
    fn publish(&self, frame: &TelemetryFrame);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gamepad_at_rest() {
        let mut pad = Gamepad::default();
        assert!(pad.at_rest());

        pad.left_stick_y = 0.01;
        assert!(pad.at_rest());

        pad.left_stick_y = -0.5;
        assert!(!pad.at_rest());

        let pad = Gamepad {
            a: true,
            ..Default::default()
        };
        assert!(!pad.at_rest());
    }

    #[test]
    fn test_frame_display_and_lookup() {
        let frame = TelemetryFrame {
            items: vec![
                TelemetryItem {
                    key: "left".to_string(),
                    value: "0.5".to_string(),
                },
                TelemetryItem {
                    key: "right".to_string(),
                    value: "0.25".to_string(),
                },
            ],
        };
        assert_eq!(frame.to_string(), "left: 0.5 | right: 0.25");
        assert_eq!(frame.get("right"), Some("0.25"));
        assert_eq!(frame.get("missing"), None);
    }
}
