//! Facade 配置

use crate::error::OpModeError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Facade 配置
///
/// 纯数据（POD），可嵌入宿主的 TOML 配置文件。运行时组件（钩子、手柄源、遥测输出）
/// 不在这里，由 [`FacadeBuilder`](crate::FacadeBuilder) 单独注入。
///
/// # Example
///
/// ```
/// use syncop_driver::FacadeConfig;
///
/// // 默认配置（100ms 宽限期，500ms join 超时）
/// let config = FacadeConfig::default();
///
/// let config = FacadeConfig {
///     grace_period_ms: 50,
///     ..FacadeConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacadeConfig {
    /// `stop` 发出取消后等待 worker 自行退出的时间（毫秒）
    pub grace_period_ms: u64,
    /// 隔离（fence）worker 后继续等待其退出的时间（毫秒）
    pub join_timeout_ms: u64,
    /// 队列长度超过该值时告警
    pub queue_high_water: usize,
    /// worker 线程名
    pub worker_thread_name: String,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: 100,
            join_timeout_ms: 500,
            queue_high_water: 1024,
            worker_thread_name: "syncop-main".to_string(),
        }
    }
}

impl FacadeConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    /// `stop` 的总耗时上限
    pub fn shutdown_budget(&self) -> Duration {
        self.grace_period() + self.join_timeout()
    }

    pub fn validate(&self) -> Result<(), OpModeError> {
        if self.queue_high_water == 0 {
            return Err(OpModeError::InvalidConfig(
                "queue_high_water must be greater than 0".to_string(),
            ));
        }
        if self.worker_thread_name.is_empty() {
            return Err(OpModeError::InvalidConfig(
                "worker_thread_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
