//! 线协议编码
//!
//! 把 [`Command`] 编码为设备固件可解析的 ASCII 字符串。
//! 除 [`Command::encode`] 外，还提供与固件功能一一对应的自由函数，
//! 参数为原始标记（`"HIGH"`、`"INPUT"`…），先构造命令再编码。
//!
//! ```rust
//! use glove_protocol::encoder;
//!
//! let msg = encoder::init_motors(&[11, 12]).unwrap();
//! assert_eq!(msg.as_str(), "1,2,11,12s");
//!
//! let msg = encoder::pin_mode(3, "INPUT").unwrap();
//! assert_eq!(msg.as_str(), "6,1,3,1s");
//! ```

use crate::command::*;
use crate::constants::{CONFIRM_CALIBRATION, SEPARATOR, TERMINAL};
use crate::EncodingError;
use std::fmt::{self, Write as _};

/// 线协议消息
///
/// 构建后不可变，不携带设备标识（寻址在传输层完成）。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WireMessage(String);

impl WireMessage {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for WireMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for WireMessage {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// 逐字段拼接消息：`<opcode>(,<field>)*s`
struct WireBuilder {
    buf: String,
}

impl WireBuilder {
    fn new(opcode: i32) -> Self {
        Self {
            buf: opcode.to_string(),
        }
    }

    fn field(mut self, value: impl fmt::Display) -> Self {
        // 写入 String 不会失败
        let _ = write!(self.buf, "{}{}", SEPARATOR, value);
        self
    }

    /// `<count>(,<pin>,<value>)*`
    fn pairs<V>(mut self, pairs: &PinMap<V>, encode: impl Fn(&V) -> i32) -> Self {
        self = self.field(pairs.len());
        for (pin, value) in pairs.iter() {
            self = self.field(pin).field(encode(value));
        }
        self
    }

    fn finish(mut self) -> WireMessage {
        self.buf.push(TERMINAL);
        WireMessage(self.buf)
    }
}

impl Command {
    /// 编码为线协议消息
    pub fn encode(&self) -> WireMessage {
        let Some(opcode) = self.opcode() else {
            return WireMessage(CONFIRM_CALIBRATION.to_string());
        };
        let b = WireBuilder::new(opcode);

        match self {
            Command::InitMotors { pins } => pins
                .as_slice()
                .iter()
                .fold(b.field(pins.len()), |b, pin| b.field(pin))
                .finish(),
            Command::ActivateMotors { motors } => b.pairs(motors, |v| v.wire_value()).finish(),
            Command::AnalogRead { pin } | Command::DigitalRead { pin } => b.field(pin).finish(),
            Command::PinMode { pins } => b.pairs(pins, |m| *m as i32).finish(),
            Command::DigitalWrite { pins } => b.pairs(pins, |l| *l as i32).finish(),
            Command::AnalogWrite { pins } => b.pairs(pins, |v| *v).finish(),
            Command::AddFlexor { pin, mapping } => b.field(pin).field(mapping).finish(),
            Command::RemoveFlexor { mapping } => b.field(mapping).finish(),
            Command::SetThreshold { value }
            | Command::SetLoopDelay { value }
            | Command::SetChoosingData { value } => b.field(value).finish(),
            Command::SetImuStatus { status } | Command::SetRawData { status } => {
                b.field(status).finish()
            },
            Command::CalibrateFlexors | Command::ResetFlexors | Command::StartImu => b.finish(),
            Command::ConfirmCalibration => WireMessage(CONFIRM_CALIBRATION.to_string()),
        }
    }
}

// ============================================================================
// 自由函数
// ============================================================================

/// `1,<n>[,<pin>]*s`
pub fn init_motors(pins: &[Pin]) -> Result<WireMessage, EncodingError> {
    Ok(Command::init_motors(pins)?.encode())
}

/// `2,<n>[,<pin>,<value>]*s`，`HIGH` → -1，`LOW` → -2
pub fn activate_motors<S: AsRef<str>>(
    pins: &[Pin],
    values: &[S],
) -> Result<WireMessage, EncodingError> {
    Ok(Command::activate_motors(pins, values)?.encode())
}

/// `3,<pin>s`
pub fn analog_read(pin: Pin) -> WireMessage {
    Command::AnalogRead { pin }.encode()
}

/// `4,<pin>s`
pub fn digital_read(pin: Pin) -> WireMessage {
    Command::DigitalRead { pin }.encode()
}

/// `6,1,<pin>,<mode>s`
pub fn pin_mode(pin: Pin, mode: &str) -> Result<WireMessage, EncodingError> {
    Ok(Command::pin_mode(pin, mode)?.encode())
}

/// `6,<n>[,<pin>,<mode>]*s`
pub fn pin_modes<S: AsRef<str>>(pins: &[Pin], modes: &[S]) -> Result<WireMessage, EncodingError> {
    Ok(Command::pin_modes(pins, modes)?.encode())
}

/// `7,1,<pin>,<level>s`
pub fn digital_write(pin: Pin, value: &str) -> Result<WireMessage, EncodingError> {
    Ok(Command::digital_write(pin, value)?.encode())
}

/// `7,<n>[,<pin>,<level>]*s`
pub fn digital_writes<S: AsRef<str>>(
    pins: &[Pin],
    values: &[S],
) -> Result<WireMessage, EncodingError> {
    Ok(Command::digital_writes(pins, values)?.encode())
}

/// `8,1,<pin>,<value>s`
pub fn analog_write(pin: Pin, value: i32) -> WireMessage {
    Command::analog_write(pin, value).encode()
}

/// `8,<n>[,<pin>,<value>]*s`
pub fn analog_writes(pins: &[Pin], values: &[i32]) -> Result<WireMessage, EncodingError> {
    Ok(Command::analog_writes(pins, values)?.encode())
}

/// `10,<pin>,<mapping>s`
pub fn add_flexor(pin: Pin, mapping: i32) -> WireMessage {
    Command::AddFlexor { pin, mapping }.encode()
}

/// `11,<mapping>s`
pub fn remove_flexor(mapping: i32) -> WireMessage {
    Command::RemoveFlexor { mapping }.encode()
}

/// `12s`
pub fn calibrate_flexors() -> WireMessage {
    Command::CalibrateFlexors.encode()
}

/// `e`
pub fn confirm_calibration() -> WireMessage {
    Command::ConfirmCalibration.encode()
}

/// `13,<value>s`
pub fn set_threshold(value: i32) -> WireMessage {
    Command::SetThreshold { value }.encode()
}

/// `14s`
pub fn reset_flexors() -> WireMessage {
    Command::ResetFlexors.encode()
}

/// `20s`
pub fn start_imu() -> WireMessage {
    Command::StartImu.encode()
}

/// `21,<status>s`
pub fn set_imu_status(status: i32) -> WireMessage {
    Command::SetImuStatus { status }.encode()
}

/// `22,<status>s`
pub fn set_raw_data(status: i32) -> WireMessage {
    Command::SetRawData { status }.encode()
}

/// `0,<value>s`
pub fn set_loop_delay(value: i32) -> WireMessage {
    Command::SetLoopDelay { value }.encode()
}

/// `23,<value>s`
pub fn set_choosing_data(value: i32) -> WireMessage {
    Command::SetChoosingData { value }.encode()
}
