//! 类型化设备命令
//!
//! 所有值标记（`"HIGH"`、`"INPUT"` 等）在构造 [`Command`] 时解析为封闭枚举，
//! 并行列表在构造时按下标配对。因此一个已存在的 `Command` 总是可以编码，
//! [`Command::encode`](crate::encoder) 本身不会失败。

use crate::constants::{MOTOR_HIGH, MOTOR_INTENSITY_MAX, MOTOR_LOW};
use crate::ids::*;
use crate::EncodingError;
use std::str::FromStr;

/// 引脚编号
pub type Pin = i32;

// ============================================================================
// 值类型
// ============================================================================

/// 马达激活值
///
/// 数字模式下为 `HIGH`/`LOW`，模拟模式下为 0~255 的强度。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MotorValue {
    High,
    Low,
    Intensity(u8),
}

impl MotorValue {
    /// 线协议中的编码值（`HIGH` → -1，`LOW` → -2，强度原样）
    pub fn wire_value(self) -> i32 {
        match self {
            MotorValue::High => MOTOR_HIGH,
            MotorValue::Low => MOTOR_LOW,
            MotorValue::Intensity(v) => v as i32,
        }
    }
}

impl FromStr for MotorValue {
    type Err = EncodingError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "HIGH" => Ok(MotorValue::High),
            "LOW" => Ok(MotorValue::Low),
            _ => {
                let value: i64 = token.trim().parse().map_err(|_| EncodingError::InvalidMotorValue {
                    value: token.to_string(),
                })?;
                if (0..=MOTOR_INTENSITY_MAX as i64).contains(&value) {
                    Ok(MotorValue::Intensity(value as u8))
                } else {
                    Err(EncodingError::MotorValueOutOfRange {
                        value: token.to_string(),
                    })
                }
            },
        }
    }
}

impl From<u8> for MotorValue {
    fn from(intensity: u8) -> Self {
        MotorValue::Intensity(intensity)
    }
}

/// 引脚模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PinModeKind {
    Input = 1,
    Output = 2,
}

impl FromStr for PinModeKind {
    type Err = EncodingError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "INPUT" => Ok(PinModeKind::Input),
            "OUTPUT" => Ok(PinModeKind::Output),
            _ => Err(EncodingError::InvalidPinMode {
                mode: token.to_string(),
            }),
        }
    }
}

/// 数字电平
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DigitalLevel {
    Low = 0,
    High = 1,
}

impl FromStr for DigitalLevel {
    type Err = EncodingError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "LOW" => Ok(DigitalLevel::Low),
            "HIGH" => Ok(DigitalLevel::High),
            _ => Err(EncodingError::InvalidDigitalLevel {
                value: token.to_string(),
            }),
        }
    }
}

// ============================================================================
// 引脚集合
// ============================================================================

/// 非空引脚列表（`InitMotors` 使用）
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PinList(Vec<Pin>);

impl PinList {
    pub fn new(pins: &[Pin]) -> Result<Self, EncodingError> {
        if pins.is_empty() {
            return Err(EncodingError::EmptyList { field: "pins" });
        }
        Ok(Self(pins.to_vec()))
    }

    pub fn as_slice(&self) -> &[Pin] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 按下标配对的 `(引脚, 值)` 列表
///
/// 只能通过 [`PinMap::zip`] 构造，长度不一致时返回 `LengthMismatch`，
/// 不会截断。
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PinMap<V>(Vec<(Pin, V)>);

impl<V> PinMap<V> {
    /// 配对两个等长列表
    pub fn zip(pins: &[Pin], values: Vec<V>) -> Result<Self, EncodingError> {
        if pins.len() != values.len() {
            return Err(EncodingError::LengthMismatch {
                pins: pins.len(),
                values: values.len(),
            });
        }
        Ok(Self(pins.iter().copied().zip(values).collect()))
    }

    /// 单个引脚
    pub fn single(pin: Pin, value: V) -> Self {
        Self(vec![(pin, value)])
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Pin, V)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V: FromStr<Err = EncodingError>> PinMap<V> {
    /// 先检查长度，再逐个解析值标记
    fn parse<S: AsRef<str>>(pins: &[Pin], tokens: &[S]) -> Result<Self, EncodingError> {
        if pins.len() != tokens.len() {
            return Err(EncodingError::LengthMismatch {
                pins: pins.len(),
                values: tokens.len(),
            });
        }
        let values = tokens
            .iter()
            .map(|t| t.as_ref().parse::<V>())
            .collect::<Result<Vec<_>, _>>()?;
        Self::zip(pins, values)
    }
}

// ============================================================================
// 命令
// ============================================================================

/// 设备命令
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Command {
    InitMotors { pins: PinList },
    ActivateMotors { motors: PinMap<MotorValue> },
    AnalogRead { pin: Pin },
    DigitalRead { pin: Pin },
    PinMode { pins: PinMap<PinModeKind> },
    DigitalWrite { pins: PinMap<DigitalLevel> },
    AnalogWrite { pins: PinMap<i32> },
    AddFlexor { pin: Pin, mapping: i32 },
    RemoveFlexor { mapping: i32 },
    CalibrateFlexors,
    ConfirmCalibration,
    SetThreshold { value: i32 },
    ResetFlexors,
    StartImu,
    SetImuStatus { status: i32 },
    SetRawData { status: i32 },
    SetLoopDelay { value: i32 },
    SetChoosingData { value: i32 },
}

impl Command {
    /// 初始化马达引脚，空列表返回 `EmptyList`
    pub fn init_motors(pins: &[Pin]) -> Result<Self, EncodingError> {
        Ok(Command::InitMotors {
            pins: PinList::new(pins)?,
        })
    }

    /// 激活马达，值可以是 `"HIGH"`、`"LOW"` 或 `"0"`~`"255"`
    pub fn activate_motors<S: AsRef<str>>(
        pins: &[Pin],
        values: &[S],
    ) -> Result<Self, EncodingError> {
        Ok(Command::ActivateMotors {
            motors: PinMap::parse(pins, values)?,
        })
    }

    /// 单引脚模式设置（`"INPUT"` / `"OUTPUT"`）
    pub fn pin_mode(pin: Pin, mode: &str) -> Result<Self, EncodingError> {
        Ok(Command::PinMode {
            pins: PinMap::single(pin, mode.parse()?),
        })
    }

    /// 多引脚模式设置
    pub fn pin_modes<S: AsRef<str>>(pins: &[Pin], modes: &[S]) -> Result<Self, EncodingError> {
        Ok(Command::PinMode {
            pins: PinMap::parse(pins, modes)?,
        })
    }

    /// 单引脚数字写（`"HIGH"` / `"LOW"`）
    pub fn digital_write(pin: Pin, value: &str) -> Result<Self, EncodingError> {
        Ok(Command::DigitalWrite {
            pins: PinMap::single(pin, value.parse()?),
        })
    }

    /// 多引脚数字写
    pub fn digital_writes<S: AsRef<str>>(
        pins: &[Pin],
        values: &[S],
    ) -> Result<Self, EncodingError> {
        Ok(Command::DigitalWrite {
            pins: PinMap::parse(pins, values)?,
        })
    }

    /// 单引脚 PWM 写
    ///
    /// 本层不检查 0~255 范围，由调用方负责。
    pub fn analog_write(pin: Pin, value: i32) -> Self {
        Command::AnalogWrite {
            pins: PinMap::single(pin, value),
        }
    }

    /// 多引脚 PWM 写
    pub fn analog_writes(pins: &[Pin], values: &[i32]) -> Result<Self, EncodingError> {
        Ok(Command::AnalogWrite {
            pins: PinMap::zip(pins, values.to_vec())?,
        })
    }

    /// 操作码；`ConfirmCalibration` 没有操作码
    pub fn opcode(&self) -> Option<i32> {
        let op = match self {
            Command::InitMotors { .. } => OP_INIT_MOTORS,
            Command::ActivateMotors { .. } => OP_ACTIVATE_MOTORS,
            Command::AnalogRead { .. } => OP_ANALOG_READ,
            Command::DigitalRead { .. } => OP_DIGITAL_READ,
            Command::PinMode { .. } => OP_PIN_MODE,
            Command::DigitalWrite { .. } => OP_DIGITAL_WRITE,
            Command::AnalogWrite { .. } => OP_ANALOG_WRITE,
            Command::AddFlexor { .. } => OP_ADD_FLEXOR,
            Command::RemoveFlexor { .. } => OP_REMOVE_FLEXOR,
            Command::CalibrateFlexors => OP_CALIBRATE_FLEXORS,
            Command::ConfirmCalibration => return None,
            Command::SetThreshold { .. } => OP_SET_THRESHOLD,
            Command::ResetFlexors => OP_RESET_FLEXORS,
            Command::StartImu => OP_START_IMU,
            Command::SetImuStatus { .. } => OP_SET_IMU_STATUS,
            Command::SetRawData { .. } => OP_SET_RAW_DATA,
            Command::SetLoopDelay { .. } => OP_SET_LOOP_DELAY,
            Command::SetChoosingData { .. } => OP_SET_CHOOSING_DATA,
        };
        Some(op)
    }

    /// 命令名称（用于日志）
    pub fn name(&self) -> &'static str {
        match self {
            Command::InitMotors { .. } => "InitMotors",
            Command::ActivateMotors { .. } => "ActivateMotors",
            Command::AnalogRead { .. } => "AnalogRead",
            Command::DigitalRead { .. } => "DigitalRead",
            Command::PinMode { .. } => "PinMode",
            Command::DigitalWrite { .. } => "DigitalWrite",
            Command::AnalogWrite { .. } => "AnalogWrite",
            Command::AddFlexor { .. } => "AddFlexor",
            Command::RemoveFlexor { .. } => "RemoveFlexor",
            Command::CalibrateFlexors => "CalibrateFlexors",
            Command::ConfirmCalibration => "ConfirmCalibration",
            Command::SetThreshold { .. } => "SetThreshold",
            Command::ResetFlexors => "ResetFlexors",
            Command::StartImu => "StartIMU",
            Command::SetImuStatus { .. } => "SetIMUStatus",
            Command::SetRawData { .. } => "SetRawData",
            Command::SetLoopDelay { .. } => "SetLoopDelay",
            Command::SetChoosingData { .. } => "SetChoosingData",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motor_value_from_str() {
        assert_eq!("HIGH".parse::<MotorValue>().unwrap(), MotorValue::High);
        assert_eq!("LOW".parse::<MotorValue>().unwrap(), MotorValue::Low);
        assert_eq!("0".parse::<MotorValue>().unwrap(), MotorValue::Intensity(0));
        assert_eq!(
            "255".parse::<MotorValue>().unwrap(),
            MotorValue::Intensity(255)
        );
        // 数值两侧允许空白
        assert_eq!(
            " 128 ".parse::<MotorValue>().unwrap(),
            MotorValue::Intensity(128)
        );
    }

    #[test]
    fn test_motor_value_rejects_bad_tokens() {
        assert_eq!(
            "300".parse::<MotorValue>(),
            Err(EncodingError::MotorValueOutOfRange {
                value: "300".to_string()
            })
        );
        assert_eq!(
            "-1".parse::<MotorValue>(),
            Err(EncodingError::MotorValueOutOfRange {
                value: "-1".to_string()
            })
        );
        assert_eq!(
            "high".parse::<MotorValue>(),
            Err(EncodingError::InvalidMotorValue {
                value: "high".to_string()
            })
        );
        assert!("".parse::<MotorValue>().is_err());
    }

    #[test]
    fn test_motor_value_wire_value() {
        assert_eq!(MotorValue::High.wire_value(), -1);
        assert_eq!(MotorValue::Low.wire_value(), -2);
        assert_eq!(MotorValue::Intensity(42).wire_value(), 42);
    }

    #[test]
    fn test_pin_mode_and_level_from_str() {
        assert_eq!("INPUT".parse::<PinModeKind>().unwrap(), PinModeKind::Input);
        assert_eq!("OUTPUT".parse::<PinModeKind>().unwrap(), PinModeKind::Output);
        assert!("SIDEWAYS".parse::<PinModeKind>().is_err());
        assert!("input".parse::<PinModeKind>().is_err());

        assert_eq!("LOW".parse::<DigitalLevel>().unwrap(), DigitalLevel::Low);
        assert_eq!("HIGH".parse::<DigitalLevel>().unwrap(), DigitalLevel::High);
        assert!("1".parse::<DigitalLevel>().is_err());
    }

    #[test]
    fn test_pin_map_length_mismatch() {
        let err = PinMap::zip(&[1, 2], vec![10]).unwrap_err();
        assert_eq!(err, EncodingError::LengthMismatch { pins: 2, values: 1 });
    }

    #[test]
    fn test_length_checked_before_tokens() {
        // 长度不一致优先于值非法
        let err = Command::activate_motors(&[1, 2], &["bogus"]).unwrap_err();
        assert_eq!(err, EncodingError::LengthMismatch { pins: 2, values: 1 });
    }

    #[test]
    fn test_init_motors_empty() {
        assert_eq!(
            Command::init_motors(&[]),
            Err(EncodingError::EmptyList { field: "pins" })
        );
    }

    #[test]
    fn test_opcode() {
        assert_eq!(Command::CalibrateFlexors.opcode(), Some(12));
        assert_eq!(Command::SetLoopDelay { value: 5 }.opcode(), Some(0));
        assert_eq!(Command::ConfirmCalibration.opcode(), None);
        assert_eq!(Command::analog_write(3, 10).opcode(), Some(8));
    }
}
