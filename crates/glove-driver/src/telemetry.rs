//! 遥测回调
//!
//! 接收循环每读到一行遥测数据就调用一次 [`TelemetrySink::on_telemetry`]。
//! 中继服务把它接到设备注册表的 `route` 上；测试里常用 [`ChannelSink`]。
//!
//! ```rust
//! use glove_driver::telemetry::{ChannelSink, TelemetrySink};
//!
//! let (sink, rx) = ChannelSink::new();
//! sink.on_telemetry("GloveA", "512");
//!
//! let line = rx.try_recv().unwrap();
//! assert_eq!(line.device, "GloveA");
//! assert_eq!(line.payload, "512");
//! ```

use crossbeam_channel::{Receiver, Sender};

/// 遥测回调 Trait
///
/// 在接收线程上调用，实现不应长时间阻塞，否则会拖慢该设备的接收。
pub trait TelemetrySink: Send + Sync {
    /// # 参数
    ///
    /// - `device`: 设备名
    /// - `line`: 一行遥测数据（已去掉行尾）
    fn on_telemetry(&self, device: &str, line: &str);
}

impl<F> TelemetrySink for F
where
    F: Fn(&str, &str) + Send + Sync,
{
    fn on_telemetry(&self, device: &str, line: &str) {
        self(device, line)
    }
}

/// 一行遥测
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryLine {
    pub device: String,
    pub payload: String,
}

/// 把遥测转发到 channel 的回调
pub struct ChannelSink {
    sender: Sender<TelemetryLine>,
}

impl ChannelSink {
    /// 创建无界 channel 回调
    pub fn new() -> (Self, Receiver<TelemetryLine>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self { sender }, receiver)
    }
}

impl TelemetrySink for ChannelSink {
    fn on_telemetry(&self, device: &str, line: &str) {
        // 接收端已关闭时丢弃
        let _ = self.sender.send(TelemetryLine {
            device: device.to_string(),
            payload: line.to_string(),
        });
    }
}
