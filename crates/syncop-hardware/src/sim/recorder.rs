use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::Instant;

/// 一次设备调用记录
#[derive(Debug, Clone)]
pub struct DeviceCall {
    /// 设备名称
    pub device: String,
    /// 操作名称
    pub op: &'static str,
    /// 参数（格式化后的字符串）
    pub args: String,
    /// 执行线程
    pub thread: ThreadId,
    /// 执行时间
    pub at: Instant,
}

/// 设备调用记录器
///
/// 多个仿真设备共享同一个记录器，因此跨设备的调用顺序也可以被验证。
#[derive(Debug, Clone, Default)]
pub struct SimRecorder {
    calls: Arc<Mutex<Vec<DeviceCall>>>,
}

impl SimRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, device: &str, op: &'static str, args: impl Into<String>) {
        self.calls.lock().push(DeviceCall {
            device: device.to_string(),
            op,
            args: args.into(),
            thread: std::thread::current().id(),
            at: Instant::now(),
        });
    }

    /// 全部调用记录（副本）
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().clone()
    }

    /// 指定操作的调用记录，格式为 `(device, args)`
    pub fn ops(&self, op: &str) -> Vec<(String, String)> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.op == op)
            .map(|c| (c.device.clone(), c.args.clone()))
            .collect()
    }

    /// 执行过设备调用的线程集合
    pub fn threads(&self) -> HashSet<ThreadId> {
        self.calls.lock().iter().map(|c| c.thread).collect()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_shared_between_clones() {
        let recorder = SimRecorder::new();
        let other = recorder.clone();

        recorder.record("left", "set_motor_power", "1 0.5");
        other.record("right", "set_motor_power", "2 0.25");

        assert_eq!(recorder.len(), 2);
        assert_eq!(
            recorder.ops("set_motor_power"),
            vec![
                ("left".to_string(), "1 0.5".to_string()),
                ("right".to_string(), "2 0.25".to_string())
            ]
        );
        assert_eq!(recorder.threads().len(), 1);

        other.clear();
        assert!(recorder.is_empty());
    }
}
