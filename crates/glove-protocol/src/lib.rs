//! # Glove Protocol
//!
//! OpenGlove 手套协议定义（无硬件依赖、无 I/O）
//!
//! ## 模块
//!
//! - `ids`: 线协议操作码与中继动作码
//! - `constants`: 分隔符、结束符等协议常量
//! - `command`: 类型化设备命令（构造时校验）
//! - `encoder`: 设备命令 → 线协议字符串
//! - `relay`: 网络客户端中继消息解析
//!
//! ## 线协议格式
//!
//! ```text
//! <opcode>,<count>(,<field>,<field>)*s
//! ```
//!
//! 所有整数以十进制、无填充输出。`ConfirmCalibration` 是唯一的例外，
//! 固定为单字符 `"e"`。

pub mod command;
pub mod constants;
pub mod encoder;
pub mod ids;
pub mod relay;

// 重新导出常用类型
pub use command::*;
pub use constants::*;
pub use encoder::WireMessage;
pub use ids::*;
pub use relay::{RelayCommand, RelayMessage, parse_relay_command, parse_relay_message};

use thiserror::Error;

/// 命令编码错误
///
/// 调用方提供了非法的命令参数。同步返回给命令发起者，不重试。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("List {field} must have at least one element")]
    EmptyList { field: &'static str },

    #[error("Lists length must be equal: {pins} pins, {values} values")]
    LengthMismatch { pins: usize, values: usize },

    #[error("Invalid value {value}")]
    InvalidMotorValue { value: String },

    #[error("Value {value} must be between 0 and 255")]
    MotorValueOutOfRange { value: String },

    #[error("{mode} is not a valid mode")]
    InvalidPinMode { mode: String },

    #[error("{value} is not a valid value")]
    InvalidDigitalLevel { value: String },
}

/// 中继消息解析错误
///
/// 消息被丢弃并记录日志，连接保持打开。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid field count: expected 2..=4, got {count}")]
    FieldCount { count: usize },

    #[error("Invalid action code: {value:?}")]
    InvalidAction { value: String },

    #[error("Invalid integer for field {field}: {value:?}")]
    InvalidInteger { field: &'static str, value: String },

    #[error("Missing field {field} for action {action:?}")]
    MissingField {
        action: RelayAction,
        field: &'static str,
    },

    #[error("List length mismatch: {regions} regions, {values} values")]
    ListLengthMismatch { regions: usize, values: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_error_display() {
        let err = EncodingError::EmptyList { field: "pins" };
        assert_eq!(err.to_string(), "List pins must have at least one element");

        let err = EncodingError::InvalidMotorValue {
            value: "abc".to_string(),
        };
        assert!(err.to_string().contains("abc"));

        let err = EncodingError::MotorValueOutOfRange {
            value: "300".to_string(),
        };
        assert!(err.to_string().contains("300"));

        let err = EncodingError::InvalidPinMode {
            mode: "SIDEWAYS".to_string(),
        };
        assert_eq!(err.to_string(), "SIDEWAYS is not a valid mode");
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::FieldCount { count: 6 };
        assert!(err.to_string().contains("got 6"));

        let err = ParseError::MissingField {
            action: RelayAction::AddFlexor,
            field: "pin",
        };
        assert!(err.to_string().contains("AddFlexor"));
        assert!(err.to_string().contains("pin"));
    }
}
