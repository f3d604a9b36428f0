//! 协议常量

/// 线协议字段分隔符
pub const SEPARATOR: char = ',';

/// 线协议消息结束符
pub const TERMINAL: char = 's';

/// 确认校准消息（无操作码、无结束符）
pub const CONFIRM_CALIBRATION: &str = "e";

/// `ActivateMotors` 中 `"HIGH"` 的编码值
pub const MOTOR_HIGH: i32 = -1;

/// `ActivateMotors` 中 `"LOW"` 的编码值
pub const MOTOR_LOW: i32 = -2;

/// `ActivateMotors` 数值强度上限（含）
pub const MOTOR_INTENSITY_MAX: i32 = 255;

/// 中继消息字段分隔符
pub const RELAY_FIELD_SEPARATOR: char = ';';

/// 中继消息列表分隔符
pub const RELAY_LIST_SEPARATOR: char = ',';

/// 中继消息最少字段数：`ACTION;DEVICE`
pub const RELAY_MIN_FIELDS: usize = 2;

/// 中继消息最多字段数：`ACTION;DEVICE;REGIONS;VALUES`
pub const RELAY_MAX_FIELDS: usize = 4;

/// 未知动作的回显前缀
pub const ECHO_PREFIX: &str = "You said: ";
