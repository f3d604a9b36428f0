//! 手套链路指标
//!
//! 原子计数器，可在任意线程读取，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 单个手套的链路指标
///
/// ```rust
/// use glove_driver::GloveMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = GloveMetrics::new();
/// metrics.rx_lines.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(metrics.snapshot().rx_lines, 1);
/// ```
#[derive(Debug, Default)]
pub struct GloveMetrics {
    /// 成功写入的线协议消息数
    pub tx_messages: AtomicU64,

    /// 写入失败次数
    pub tx_errors: AtomicU64,

    /// 收到的遥测行数（含空行）
    pub rx_lines: AtomicU64,

    /// RX 超时次数（正常现象，无数据时会超时）
    pub rx_timeouts: AtomicU64,

    /// 被丢弃的行数（非法 UTF-8 或超长）
    pub rx_invalid: AtomicU64,

    /// 导致接收循环退出的设备错误次数
    pub device_errors: AtomicU64,
}

impl GloveMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tx_messages: self.tx_messages.load(Ordering::Relaxed),
            tx_errors: self.tx_errors.load(Ordering::Relaxed),
            rx_lines: self.rx_lines.load(Ordering::Relaxed),
            rx_timeouts: self.rx_timeouts.load(Ordering::Relaxed),
            rx_invalid: self.rx_invalid.load(Ordering::Relaxed),
            device_errors: self.device_errors.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub tx_messages: u64,
    pub tx_errors: u64,
    pub rx_lines: u64,
    pub rx_timeouts: u64,
    pub rx_invalid: u64,
    pub device_errors: u64,
}
