//! 遥测接收管道
//!
//! 每个设备一个接收线程：阻塞读取一行，转发给 [`TelemetrySink`]。
//! 超时是正常情况（设备未上报），只计数不退出；读端关闭或 IO 错误时退出。

use crate::error::DriverError;
use crate::metrics::GloveMetrics;
use crate::telemetry::TelemetrySink;
use glove_transport::{LineReader, TransportError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, trace, warn};

/// 接收管道配置
///
/// ```rust
/// use glove_driver::PipelineConfig;
///
/// let config = PipelineConfig::default();
/// assert_eq!(config.receive_timeout_ms, 50);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// 单次读取超时（毫秒），决定停止信号的响应延迟
    pub receive_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            receive_timeout_ms: 50,
        }
    }
}

/// 接收循环主体
///
/// 返回条件：`is_running` 被置为 `false`，或读端返回致命错误。
/// 因致命错误退出时会把 `is_running` 置为 `false`。
pub fn rx_loop(
    device: &str,
    mut reader: impl LineReader,
    sink: Arc<dyn TelemetrySink>,
    config: PipelineConfig,
    is_running: Arc<AtomicBool>,
    metrics: Arc<GloveMetrics>,
) {
    reader.set_read_timeout(Duration::from_millis(config.receive_timeout_ms));

    loop {
        // Acquire: 看到 false 时也能看到停止方之前的写入
        if !is_running.load(Ordering::Acquire) {
            trace!("{}: RX loop stopping", device);
            break;
        }

        match reader.read_line() {
            Ok(line) => {
                metrics.rx_lines.fetch_add(1, Ordering::Relaxed);
                if line.trim().is_empty() {
                    continue;
                }
                trace!("{}: telemetry {:?}", device, line);
                sink.on_telemetry(device, &line);
            },
            Err(TransportError::Timeout) => {
                metrics.rx_timeouts.fetch_add(1, Ordering::Relaxed);
            },
            Err(TransportError::InvalidUtf8) => {
                metrics.rx_invalid.fetch_add(1, Ordering::Relaxed);
                warn!("{}: dropped telemetry line with invalid UTF-8", device);
            },
            Err(TransportError::LineTooLong { len }) => {
                metrics.rx_invalid.fetch_add(1, Ordering::Relaxed);
                warn!("{}: dropped oversized telemetry line ({} bytes)", device, len);
            },
            Err(TransportError::Closed) => {
                info!("{}: transport closed, RX loop exiting", device);
                is_running.store(false, Ordering::Release);
                break;
            },
            Err(e) => {
                metrics.device_errors.fetch_add(1, Ordering::Relaxed);
                error!("{}: RX error, loop exiting: {}", device, e);
                is_running.store(false, Ordering::Release);
                break;
            },
        }
    }
}

/// 接收线程句柄
///
/// Drop 时通知线程退出并等待其结束。
pub struct RxLoop {
    is_running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RxLoop {
    /// 在独立线程上启动 [`rx_loop`]
    pub fn spawn<R>(
        device: impl Into<String>,
        reader: R,
        sink: Arc<dyn TelemetrySink>,
        config: PipelineConfig,
        metrics: Arc<GloveMetrics>,
    ) -> Result<Self, DriverError>
    where
        R: LineReader + Send + 'static,
    {
        let device = device.into();
        let is_running = Arc::new(AtomicBool::new(true));
        let running = is_running.clone();

        let handle = thread::Builder::new()
            .name(format!("glove-rx-{}", device))
            .spawn(move || rx_loop(&device, reader, sink, config, running, metrics))
            .map_err(DriverError::ThreadSpawn)?;

        Ok(Self {
            is_running,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// 线程是否仍在运行
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// 停止并等待线程退出（可重复调用）
    pub fn stop(&self) {
        self.is_running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.lock().take()
            && handle.join().is_err()
        {
            error!("RX thread panicked");
        }
    }
}

impl Drop for RxLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
