//! 中继消息解析
//!
//! 网络客户端发送 `;` 分隔的文本帧：
//!
//! ```text
//! Action;DeviceName[;Regions][;Values]
//! ```
//!
//! - `Action`：十进制动作码（见 [`RelayAction`]）
//! - `DeviceName`：不透明的设备名
//! - `Regions` / `Values`：多值时为 `,` 分隔的整数列表
//!
//! 解析分两步：[`parse_relay_message`] 只校验字段数和动作码，得到原始形状
//! [`RelayMessage`]；[`RelayCommand::try_from`] 再按动作要求解析各字段。

use crate::constants::*;
use crate::ids::RelayAction;
use crate::ParseError;
use std::fmt;

/// 中继消息的原始形状（2~4 个字段）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayMessage {
    pub action: i32,
    pub device: String,
    pub regions: Option<String>,
    pub values: Option<String>,
}

/// 按字段数切分并解析动作码
pub fn parse_relay_message(text: &str) -> Result<RelayMessage, ParseError> {
    let fields: Vec<&str> = text.split(RELAY_FIELD_SEPARATOR).collect();
    let count = fields.len();
    if !(RELAY_MIN_FIELDS..=RELAY_MAX_FIELDS).contains(&count) {
        return Err(ParseError::FieldCount { count });
    }

    let action = fields[0]
        .trim()
        .parse::<i32>()
        .map_err(|_| ParseError::InvalidAction {
            value: fields[0].to_string(),
        })?;

    Ok(RelayMessage {
        action,
        device: fields[1].to_string(),
        regions: fields.get(2).map(|s| s.to_string()),
        values: fields.get(3).map(|s| s.to_string()),
    })
}

/// 类型化中继命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayCommand {
    StartCaptureData {
        device: String,
    },
    StopCaptureData {
        device: String,
    },
    AddFlexor {
        device: String,
        region: i32,
        pin: i32,
    },
    /// `(region, pin)` 按下标配对
    AddFlexors {
        device: String,
        flexors: Vec<(i32, i32)>,
    },
    RemoveFlexor {
        device: String,
        region: i32,
    },
    RemoveFlexors {
        device: String,
        regions: Vec<i32>,
    },
    /// 只解析，路由器不执行任何动作
    ActivateActuators {
        device: String,
        regions: Vec<i32>,
        intensities: Vec<String>,
    },
    /// 未知动作码，路由器回显原始消息
    Unknown {
        action: i32,
        device: String,
    },
}

impl RelayCommand {
    /// 目标设备名
    pub fn device(&self) -> &str {
        match self {
            RelayCommand::StartCaptureData { device }
            | RelayCommand::StopCaptureData { device }
            | RelayCommand::AddFlexor { device, .. }
            | RelayCommand::AddFlexors { device, .. }
            | RelayCommand::RemoveFlexor { device, .. }
            | RelayCommand::RemoveFlexors { device, .. }
            | RelayCommand::ActivateActuators { device, .. }
            | RelayCommand::Unknown { device, .. } => device,
        }
    }

    /// 已知动作；`Unknown` 返回 `None`
    pub fn action(&self) -> Option<RelayAction> {
        match self {
            RelayCommand::StartCaptureData { .. } => Some(RelayAction::StartCaptureData),
            RelayCommand::StopCaptureData { .. } => Some(RelayAction::StopCaptureData),
            RelayCommand::AddFlexor { .. } => Some(RelayAction::AddFlexor),
            RelayCommand::AddFlexors { .. } => Some(RelayAction::AddFlexors),
            RelayCommand::RemoveFlexor { .. } => Some(RelayAction::RemoveFlexor),
            RelayCommand::RemoveFlexors { .. } => Some(RelayAction::RemoveFlexors),
            RelayCommand::ActivateActuators { .. } => Some(RelayAction::ActivateActuators),
            RelayCommand::Unknown { .. } => None,
        }
    }

    /// 线上的动作码（`Unknown` 保留原始值）
    pub fn action_code(&self) -> i32 {
        match self {
            RelayCommand::Unknown { action, .. } => *action,
            RelayCommand::StartCaptureData { .. } => RelayAction::StartCaptureData.code(),
            RelayCommand::StopCaptureData { .. } => RelayAction::StopCaptureData.code(),
            RelayCommand::AddFlexor { .. } => RelayAction::AddFlexor.code(),
            RelayCommand::AddFlexors { .. } => RelayAction::AddFlexors.code(),
            RelayCommand::RemoveFlexor { .. } => RelayAction::RemoveFlexor.code(),
            RelayCommand::RemoveFlexors { .. } => RelayAction::RemoveFlexors.code(),
            RelayCommand::ActivateActuators { .. } => RelayAction::ActivateActuators.code(),
        }
    }

    /// 是否需要转发给设备侧
    pub fn is_flexor_command(&self) -> bool {
        matches!(
            self,
            RelayCommand::AddFlexor { .. }
                | RelayCommand::AddFlexors { .. }
                | RelayCommand::RemoveFlexor { .. }
                | RelayCommand::RemoveFlexors { .. }
        )
    }
}

impl TryFrom<RelayMessage> for RelayCommand {
    type Error = ParseError;

    fn try_from(msg: RelayMessage) -> Result<Self, Self::Error> {
        let RelayMessage {
            action: code,
            device,
            regions,
            values,
        } = msg;

        let Some(action) = RelayAction::from_code(code) else {
            return Ok(RelayCommand::Unknown {
                action: code,
                device,
            });
        };

        let require = |field: Option<String>, name: &'static str| {
            field.ok_or(ParseError::MissingField {
                action,
                field: name,
            })
        };

        let command = match action {
            RelayAction::StartCaptureData => RelayCommand::StartCaptureData { device },
            RelayAction::StopCaptureData => RelayCommand::StopCaptureData { device },
            RelayAction::AddFlexor => {
                let region = parse_int(&require(regions, "region")?, "region")?;
                let pin = parse_int(&require(values, "pin")?, "pin")?;
                RelayCommand::AddFlexor {
                    device,
                    region,
                    pin,
                }
            },
            RelayAction::AddFlexors => {
                let regions = parse_int_list(&require(regions, "regions")?, "regions")?;
                let pins = parse_int_list(&require(values, "pins")?, "pins")?;
                if regions.len() != pins.len() {
                    return Err(ParseError::ListLengthMismatch {
                        regions: regions.len(),
                        values: pins.len(),
                    });
                }
                RelayCommand::AddFlexors {
                    device,
                    flexors: regions.into_iter().zip(pins).collect(),
                }
            },
            RelayAction::RemoveFlexor => {
                let region = parse_int(&require(regions, "region")?, "region")?;
                RelayCommand::RemoveFlexor { device, region }
            },
            RelayAction::RemoveFlexors => {
                let regions = parse_int_list(&require(regions, "regions")?, "regions")?;
                RelayCommand::RemoveFlexors { device, regions }
            },
            RelayAction::ActivateActuators => {
                let regions = parse_int_list(&require(regions, "regions")?, "regions")?;
                let intensities: Vec<String> = require(values, "intensities")?
                    .split(RELAY_LIST_SEPARATOR)
                    .map(|s| s.trim().to_string())
                    .collect();
                if regions.len() != intensities.len() {
                    return Err(ParseError::ListLengthMismatch {
                        regions: regions.len(),
                        values: intensities.len(),
                    });
                }
                RelayCommand::ActivateActuators {
                    device,
                    regions,
                    intensities,
                }
            },
        };

        Ok(command)
    }
}

/// 生成客户端发往中继服务的文本帧：`Action;Device[;Regions][;Values]`
///
/// ```rust
/// use glove_protocol::RelayCommand;
///
/// let cmd = RelayCommand::AddFlexors {
///     device: "GloveA".to_string(),
///     flexors: vec![(0, 17), (2, 18)],
/// };
/// assert_eq!(cmd.to_string(), "11;GloveA;0,2;17,18");
/// ```
impl fmt::Display for RelayCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.action_code(), RELAY_FIELD_SEPARATOR, self.device())?;

        match self {
            RelayCommand::StartCaptureData { .. }
            | RelayCommand::StopCaptureData { .. }
            | RelayCommand::Unknown { .. } => Ok(()),
            RelayCommand::AddFlexor { region, pin, .. } => {
                write!(f, "{0}{1}{0}{2}", RELAY_FIELD_SEPARATOR, region, pin)
            },
            RelayCommand::AddFlexors { flexors, .. } => {
                let regions: Vec<i32> = flexors.iter().map(|(region, _)| *region).collect();
                let pins: Vec<i32> = flexors.iter().map(|(_, pin)| *pin).collect();
                write!(f, "{}", RELAY_FIELD_SEPARATOR)?;
                write_list(f, &regions)?;
                write!(f, "{}", RELAY_FIELD_SEPARATOR)?;
                write_list(f, &pins)
            },
            RelayCommand::RemoveFlexor { region, .. } => {
                write!(f, "{}{}", RELAY_FIELD_SEPARATOR, region)
            },
            RelayCommand::RemoveFlexors { regions, .. } => {
                write!(f, "{}", RELAY_FIELD_SEPARATOR)?;
                write_list(f, regions)
            },
            RelayCommand::ActivateActuators {
                regions,
                intensities,
                ..
            } => {
                write!(f, "{}", RELAY_FIELD_SEPARATOR)?;
                write_list(f, regions)?;
                write!(f, "{}", RELAY_FIELD_SEPARATOR)?;
                write_list(f, intensities)
            },
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", RELAY_LIST_SEPARATOR)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// 解析完整的中继命令
pub fn parse_relay_command(text: &str) -> Result<RelayCommand, ParseError> {
    RelayCommand::try_from(parse_relay_message(text)?)
}

fn parse_int(value: &str, field: &'static str) -> Result<i32, ParseError> {
    value
        .trim()
        .parse::<i32>()
        .map_err(|_| ParseError::InvalidInteger {
            field,
            value: value.to_string(),
        })
}

fn parse_int_list(value: &str, field: &'static str) -> Result<Vec<i32>, ParseError> {
    value
        .split(RELAY_LIST_SEPARATOR)
        .map(|item| parse_int(item, field))
        .collect()
}
