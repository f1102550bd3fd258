//! Op mode 错误类型定义

use syncop_hardware::HardwareError;
use thiserror::Error;

/// 用户 `main` 以及 facade 构造的错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OpModeError {
    /// 硬件层错误（设备错误、取消、亲和性错误等）
    #[error(transparent)]
    Hardware(#[from] HardwareError),

    /// 用户代码报告的错误
    #[error("Op mode error: {0}")]
    User(String),

    /// 配置非法
    #[error("Invalid facade config: {0}")]
    InvalidConfig(String),
}

impl OpModeError {
    /// 构造用户错误
    pub fn user(message: impl Into<String>) -> Self {
        Self::User(message.into())
    }

    /// 是否为取消（在 `main` 边界视为正常退出）
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Hardware(e) if e.is_cancelled())
    }
}
