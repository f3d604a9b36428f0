//! # Glove Transport Layer
//!
//! 设备传输层抽象。手套固件通过字节流通道通信：
//!
//! - 下行：写入线协议字符串（固件按结束符 `s` 分帧，不追加换行）
//! - 上行：按行读取遥测数据（`\n` 结尾，可能带 `\r`）
//!
//! 传输层不负责发现、配对与重连，假定底层按序可靠交付。

use std::time::Duration;
use thiserror::Error;

mod line;
pub use line::{LineBuffer, MAX_LINE_LEN};

#[cfg(feature = "serial")]
pub mod serial;

#[cfg(feature = "serial")]
pub use serial::{SerialReader, SerialTransport, SerialWriter};

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockTransport;

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "serial")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Read timeout")]
    Timeout,

    #[error("Transport closed")]
    Closed,

    #[error("Invalid UTF-8 in received line")]
    InvalidUtf8,

    #[error("Received line too long ({len} bytes), dropped")]
    LineTooLong { len: usize },
}

impl TransportError {
    /// 是否为致命错误（接收循环应退出）
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            TransportError::Timeout | TransportError::InvalidUtf8 | TransportError::LineTooLong { .. }
        )
    }
}

/// 下行写入
pub trait LineWriter {
    /// 写入一条完整消息（即发即忘）
    fn write(&mut self, message: &str) -> Result<(), TransportError>;
}

/// 上行按行读取
pub trait LineReader {
    /// 阻塞读取一行，不含行尾 `\r\n`
    ///
    /// 超时返回 [`TransportError::Timeout`]，已读到的部分行保留到下一次调用。
    fn read_line(&mut self) -> Result<String, TransportError>;

    /// 设置读取超时
    fn set_read_timeout(&mut self, _timeout: Duration) {}
}

/// 同时支持读写的传输
pub trait LineTransport: LineWriter + LineReader {}

impl<T: LineWriter + LineReader> LineTransport for T {}

/// 可拆分为独立读写端的传输
///
/// 接收循环持有读端，命令发送方持有写端，二者互不阻塞。
pub trait SplittableTransport: LineTransport {
    type Reader: LineReader + Send + 'static;
    type Writer: LineWriter + Send + 'static;

    fn split(self) -> Result<(Self::Reader, Self::Writer), TransportError>;
}

impl<W: LineWriter + ?Sized> LineWriter for Box<W> {
    fn write(&mut self, message: &str) -> Result<(), TransportError> {
        (**self).write(message)
    }
}

impl<R: LineReader + ?Sized> LineReader for Box<R> {
    fn read_line(&mut self) -> Result<String, TransportError> {
        (**self).read_line()
    }

    fn set_read_timeout(&mut self, timeout: Duration) {
        (**self).set_read_timeout(timeout)
    }
}
