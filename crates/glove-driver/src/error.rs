//! 驱动层错误类型定义

use glove_protocol::EncodingError;
use glove_transport::TransportError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 传输层错误
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 命令参数非法（未写入任何数据）
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// 接收线程创建失败
    #[error("Failed to spawn RX thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),
}
