//! 中继层错误类型定义

use crate::connection::ConnectionId;
use glove_protocol::ParseError;
use thiserror::Error;

/// 中继层错误类型
///
/// 所有错误只影响产生它的那一条消息，连接保持打开。
#[derive(Error, Debug)]
pub enum RelayError {
    /// 消息格式错误（已丢弃）
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// 设备侧执行失败
    #[error("Device {device}: {message}")]
    Device { device: String, message: String },

    /// 向连接发送失败
    #[error("Send to {id} failed: {message}")]
    Send { id: ConnectionId, message: String },

    /// 连接未打开或已关闭
    #[error("Connection {id} is not open")]
    NotOpen { id: ConnectionId },
}
