//! 属性、模式、命令码与 puck 编号

use crate::ProtocolError;
use crate::ids::DEFAULT_PUCK_ADDRESS_BASE;
use num_enum::{IntoPrimitive, TryFromPrimitive};

// ============================================================================
// Puck 编号
// ============================================================================

/// puck 编号（0-2 为手指，3 为张开轴）
///
/// 使用枚举保证编号始终处于 `0..=3`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Puck {
    /// 手指 1
    Finger1 = 0,
    /// 手指 2
    Finger2 = 1,
    /// 手指 3
    Finger3 = 2,
    /// 张开轴（spread）
    Spread = 3,
}

impl Puck {
    /// 全部 puck，按编号排序
    pub const ALL: [Puck; 4] = [Puck::Finger1, Puck::Finger2, Puck::Finger3, Puck::Spread];

    /// 三个手指
    pub const FINGERS: [Puck; 3] = [Puck::Finger1, Puck::Finger2, Puck::Finger3];

    /// 数组下标
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// 是否为张开轴
    #[inline]
    pub const fn is_spread(self) -> bool {
        matches!(self, Puck::Spread)
    }

    /// 使用默认地址基数的单播地址
    #[inline]
    pub const fn address(self) -> u32 {
        self.address_with_base(DEFAULT_PUCK_ADDRESS_BASE)
    }

    /// 使用指定地址基数的单播地址
    #[inline]
    pub const fn address_with_base(self, base: u32) -> u32 {
        base + self as u32
    }
}

impl TryFrom<u8> for Puck {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Puck::Finger1),
            1 => Ok(Puck::Finger2),
            2 => Ok(Puck::Finger3),
            3 => Ok(Puck::Spread),
            _ => Err(ProtocolError::InvalidPuck(value)),
        }
    }
}

impl From<Puck> for u8 {
    fn from(puck: Puck) -> Self {
        puck as u8
    }
}

// ============================================================================
// 属性
// ============================================================================

/// puck 属性编号
///
/// 读写语义（R = 读取实际值，W = 写入指令值）：
/// - `Cmd`: 仅写，值为 [`CommandCode`]
/// - `Position`: 32 位位置，R=实际，W=指令
/// - `Velocity`: 速度（cts/ms），R=实际，W=指令
/// - `MaxVelocity`: 最大速度（cts/ms）
/// - `Mode`: 工作模式，见 [`PuckMode`]
/// - `Temperature`: puck 内部温度
/// - `Therm`: 电机热敏电阻温度
/// - `Tactile`: 触觉阵列访问（特殊，写 2 触发完整阵列应答）
/// - `Hold`: 运动结束后是否保持位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Property {
    /// 工作模式
    Mode = 8,
    /// puck 内部温度
    Temperature = 9,
    /// 电机热敏电阻温度
    Therm = 20,
    /// 电机电流
    MotorCurrent = 22,
    /// 无值命令
    Cmd = 29,
    /// 将属性写入 EEPROM
    Save = 30,
    /// 最大力矩
    MaxTorque = 43,
    /// 速度
    Velocity = 44,
    /// 最大速度
    MaxVelocity = 45,
    /// 32 位位置
    Position = 48,
    /// 终点（梯形运动目标）
    Endpoint = 52,
    /// 张开目标
    OpenTarget = 54,
    /// 闭合目标
    CloseTarget = 56,
    /// 运动结束后保持位置
    Hold = 77,
    /// 触觉阵列
    Tactile = 106,
}

impl Property {
    /// 属性编号
    #[inline]
    pub fn id(self) -> u8 {
        self.into()
    }
}

// ============================================================================
// 模式与命令码
// ============================================================================

/// puck 工作模式（`Property::Mode` 的取值）
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum PuckMode {
    /// 空闲（运动结束）
    Idle = 0,
    /// 力矩模式
    Torque = 2,
    /// PID 位置保持
    Pid = 3,
    /// 速度模式
    Velocity = 4,
    /// 梯形运动
    Trapezoid = 5,
}

impl PuckMode {
    /// 写入帧使用的 32 位值
    #[inline]
    pub fn value(self) -> i32 {
        u8::from(self) as i32
    }

    /// 从应答值解析，未知值返回 `None`
    pub fn from_raw(raw: i32) -> Option<Self> {
        u8::try_from(raw)
            .ok()
            .and_then(|v| PuckMode::try_from(v).ok())
    }
}

/// 无值命令码（写入 `Property::Cmd`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum CommandCode {
    /// 复位
    Reset = 8,
    /// 回零初始化（hand initialize）
    Hi = 13,
    /// 力矩闭合
    TorqueClose = 16,
    /// 力矩张开
    TorqueOpen = 17,
    /// 闭合
    Close = 18,
    /// 张开
    Open = 20,
    /// 停止
    Stop = 21,
}

impl CommandCode {
    /// 写入帧使用的 32 位值
    #[inline]
    pub fn value(self) -> i32 {
        u8::from(self) as i32
    }
}

/// 触觉阵列完整读取请求值（写入 `Property::Tactile`）
pub const TACTILE_FULL_REQUEST: i32 = 2;
