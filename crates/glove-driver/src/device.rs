//! 已连接的手套设备
//!
//! 把可拆分传输拆成读写两端：写端交给 [`Glove`] 发送命令，
//! 读端交给 [`RxLoop`] 转发遥测。两端共享同一组指标。

use crate::error::DriverError;
use crate::glove::Glove;
use crate::metrics::GloveMetrics;
use crate::pipeline::{PipelineConfig, RxLoop};
use crate::telemetry::TelemetrySink;
use glove_transport::SplittableTransport;
use std::ops::Deref;
use std::sync::Arc;
use tracing::info;

/// 已连接的手套：命令句柄 + 接收线程
///
/// 通过 `Deref` 直接调用 [`Glove`] 的命令方法。Drop 时停止接收线程。
///
/// ```rust
/// use glove_driver::{GloveDevice, PipelineConfig};
/// use glove_driver::telemetry::ChannelSink;
/// use glove_transport::MockTransport;
/// use std::sync::Arc;
///
/// let transport = MockTransport::new();
/// let (sink, _rx) = ChannelSink::new();
/// let device = GloveDevice::connect(
///     "GloveA",
///     transport.clone(),
///     Arc::new(sink),
///     PipelineConfig::default(),
/// )
/// .unwrap();
///
/// device.start_imu().unwrap();
/// assert_eq!(transport.written(), vec!["20s".to_string()]);
/// ```
pub struct GloveDevice<T: SplittableTransport> {
    glove: Glove<T::Writer>,
    rx_loop: RxLoop,
}

impl<T: SplittableTransport> GloveDevice<T> {
    pub fn connect(
        name: impl Into<String>,
        transport: T,
        sink: Arc<dyn TelemetrySink>,
        config: PipelineConfig,
    ) -> Result<Self, DriverError> {
        let name = name.into();
        let (reader, writer) = transport.split()?;
        let metrics = Arc::new(GloveMetrics::new());

        let rx_loop = RxLoop::spawn(name.clone(), reader, sink, config, metrics.clone())?;
        info!("{}: device connected", name);

        Ok(Self {
            glove: Glove::with_metrics(name, writer, metrics),
            rx_loop,
        })
    }

    /// 接收线程是否仍在运行（读端关闭或出错后为 `false`）
    pub fn is_alive(&self) -> bool {
        self.rx_loop.is_running()
    }

    /// 停止接收线程，命令句柄仍可使用
    pub fn shutdown(&self) {
        self.rx_loop.stop();
        info!("{}: device disconnected", self.glove.name());
    }
}

impl<T: SplittableTransport> Deref for GloveDevice<T> {
    type Target = Glove<T::Writer>;

    fn deref(&self) -> &Self::Target {
        &self.glove
    }
}
