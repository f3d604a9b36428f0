//! 操作码与动作码常量定义
//!
//! - 操作码（opcode）：写入设备固件的线协议消息的首字段
//! - 动作码（action code）：网络客户端发给中继服务的消息首字段

use num_enum::{IntoPrimitive, TryFromPrimitive};

// ============================================================================
// 线协议操作码
// ============================================================================

/// 设置主循环延迟
pub const OP_SET_LOOP_DELAY: i32 = 0;

/// 初始化马达引脚
pub const OP_INIT_MOTORS: i32 = 1;

/// 激活马达
pub const OP_ACTIVATE_MOTORS: i32 = 2;

/// 模拟读
pub const OP_ANALOG_READ: i32 = 3;

/// 数字读
pub const OP_DIGITAL_READ: i32 = 4;

/// 引脚模式
pub const OP_PIN_MODE: i32 = 6;

/// 数字写
pub const OP_DIGITAL_WRITE: i32 = 7;

/// 模拟写（PWM）
pub const OP_ANALOG_WRITE: i32 = 8;

// ============================================================================
// 弯曲传感器（flexor）操作码
// ============================================================================

pub const OP_ADD_FLEXOR: i32 = 10;
pub const OP_REMOVE_FLEXOR: i32 = 11;
pub const OP_CALIBRATE_FLEXORS: i32 = 12;
pub const OP_SET_THRESHOLD: i32 = 13;
pub const OP_RESET_FLEXORS: i32 = 14;

// ============================================================================
// IMU 操作码
// ============================================================================

pub const OP_START_IMU: i32 = 20;
pub const OP_SET_IMU_STATUS: i32 = 21;
pub const OP_SET_RAW_DATA: i32 = 22;

/// IMU 输出数据选择
pub const OP_SET_CHOOSING_DATA: i32 = 23;

// ============================================================================
// 中继动作码
// ============================================================================

/// 中继消息动作
///
/// 未在表中的动作码不是错误：路由器会把原始消息回显给发送方。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum RelayAction {
    /// 订阅设备数据流
    StartCaptureData = 1,
    /// 取消订阅设备数据流
    StopCaptureData = 2,
    /// 添加单个弯曲传感器：`region;pin`
    AddFlexor = 10,
    /// 批量添加弯曲传感器：`regions;pins`
    AddFlexors = 11,
    /// 移除单个弯曲传感器：`region`
    RemoveFlexor = 12,
    /// 批量移除弯曲传感器：`regions`
    RemoveFlexors = 13,
    /// 激活执行器：`regions;intensities`（仅解析，不执行）
    ActivateActuators = 20,
}

impl RelayAction {
    /// 从原始动作码识别动作，未知动作码返回 `None`
    pub fn from_code(code: i32) -> Option<Self> {
        Self::try_from(code).ok()
    }

    /// 动作码
    pub fn code(self) -> i32 {
        self.into()
    }
}
