//! 硬件层错误类型定义
//!
//! 所有设备操作（无论是真实设备还是经过 thunk 的代理）都返回 [`HardwareError`]。
//! 代理相关的错误（`Cancelled`、`NoFacadeBound` 等）也定义在这里，
//! 因为代理和真实设备实现的是同一组 trait。

use crate::kind::DeviceKind;
use thiserror::Error;

/// 硬件层统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HardwareError {
    /// 设备本身报告的错误
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// 注册表中找不到指定设备
    #[error("No {kind} named '{name}' in the hardware map")]
    NotFound { kind: DeviceKind, name: String },

    /// 操作被取消（op mode 正在停止）
    #[error("Operation cancelled: op mode is shutting down")]
    Cancelled,

    /// 当前线程没有绑定任何 op mode（只能在 worker 线程上使用代理）
    #[error("No synchronous op mode is bound to the current thread")]
    NoFacadeBound,

    /// 在 loop 线程上执行的 action 失败（panic）
    #[error("Loop-thread action failed: {0}")]
    ActionFailed(String),

    /// 线程亲和性误用（例如在 loop 线程上调用 `execute_on_loop_thread`）
    #[error("Thread affinity misuse: {0}")]
    AffinityMisuse(&'static str),
}

impl HardwareError {
    /// 是否为取消错误
    ///
    /// `Cancelled` 在 `main` 边界被视为正常退出。
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// 设备错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceErrorKind {
    Unknown,
    /// 端口号超出范围
    InvalidPort,
    /// 参数非法（如功率超出 [-1, 1]）
    InvalidArgument,
    /// 设备断开
    Disconnected,
    /// 设备已关闭
    Closed,
    /// 当前模式不支持该操作
    Unsupported,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind:?}: {message}")]
pub struct DeviceError {
    pub kind: DeviceErrorKind,
    pub message: String,
}

impl DeviceError {
    pub fn new(kind: DeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_port(port: u8) -> Self {
        Self::new(DeviceErrorKind::InvalidPort, format!("port {port} out of range"))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            DeviceErrorKind::Disconnected | DeviceErrorKind::Closed
        )
    }
}

impl From<String> for DeviceError {
    fn from(message: String) -> Self {
        Self::new(DeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for DeviceError {
    fn from(message: &str) -> Self {
        Self::new(DeviceErrorKind::Unknown, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardware_error_display() {
        let err = HardwareError::NotFound {
            kind: DeviceKind::DcMotor,
            name: "left".to_string(),
        };
        assert_eq!(err.to_string(), "No DC motor named 'left' in the hardware map");

        let err = HardwareError::Cancelled;
        assert!(err.to_string().contains("cancelled"));
        assert!(err.is_cancelled());

        let err = HardwareError::NoFacadeBound;
        assert!(!err.is_cancelled());
        assert!(err.to_string().contains("No synchronous op mode"));

        let err = HardwareError::ActionFailed("boom".to_string());
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_from_device_error() {
        let err: HardwareError = DeviceError::invalid_port(7).into();
        match err {
            HardwareError::Device(e) => {
                assert_eq!(e.kind, DeviceErrorKind::InvalidPort);
                assert!(e.message.contains('7'));
                assert!(!e.is_fatal());
            },
            _ => panic!("Expected Device variant"),
        }
    }

    #[test]
    fn test_device_error_from_str() {
        let e = DeviceError::from("cable pulled");
        assert_eq!(e.kind, DeviceErrorKind::Unknown);
        assert_eq!(e.to_string(), "Unknown: cable pulled");
        assert!(DeviceError::new(DeviceErrorKind::Closed, "x").is_fatal());
    }
}
