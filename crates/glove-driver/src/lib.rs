//! # Glove Driver
//!
//! 手套设备驱动层：
//!
//! - [`Glove`]：命令句柄，每个操作编码为一条线协议消息并写出
//! - [`RxLoop`] / [`rx_loop`]：遥测接收线程，逐行转发给 [`TelemetrySink`]
//! - [`GloveDevice`]：拆分传输后把两者组合在一起
//! - [`GloveMetrics`]：链路计数器

pub mod device;
pub mod error;
pub mod glove;
pub mod metrics;
pub mod pipeline;
pub mod telemetry;

pub use device::GloveDevice;
pub use error::DriverError;
pub use glove::Glove;
pub use metrics::{GloveMetrics, MetricsSnapshot};
pub use pipeline::{PipelineConfig, RxLoop, rx_loop};
pub use telemetry::{ChannelSink, TelemetryLine, TelemetrySink};
