//! # BHand Protocol
//!
//! Barrett 手爪 puck 属性协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `ids`: 总线地址与组地址计算
//! - `property`: 属性、模式、命令码与 puck 编号
//! - `codec`: 属性读写帧编码、应答帧解码
//!
//! ## 字节序
//!
//! 与机械臂协议不同，puck 协议的多字节数值使用**小端**（低字节在前）。
//! 编码器反馈帧是例外：22 位字段按高字节在前排列，见 [`codec::decode_encoder_pair`]。

pub mod codec;
pub mod ids;
pub mod property;

// 重新导出常用类型
pub use codec::*;
pub use ids::*;
pub use property::*;

/// CAN 2.0 标准帧的统一抽象
///
/// 协议层和硬件层之间的中间类型：
///
/// ```text
/// Protocol Layer (bhand-protocol)
///     ↓ encode_set() / encode_get() 构建，decode_*() 解析
/// PuckFrame (此类型)
///     ↓ 转换逻辑在 CAN 层实现
/// CAN Layer (bhand-can)
///     ↓ SocketCAN / Mock 适配器
/// Hardware
/// ```
///
/// - **Copy**：发送后不可变，按值传递
/// - **固定 8 字节**：避免堆分配
///
/// ```rust
/// use bhand_protocol::PuckFrame;
///
/// let frame = PuckFrame::new(0x00B, &[0x30]);
/// assert_eq!(frame.id(), 0x00B);
/// assert_eq!(frame.data_slice(), &[0x30]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PuckFrame {
    /// CAN ID（11 位标准帧）
    pub id: u32,

    /// 帧数据（固定 8 字节，未使用部分为 0）
    pub data: [u8; 8],

    /// 有效数据长度 (0-8)
    pub len: u8,
}

impl PuckFrame {
    /// 创建标准帧，超过 8 字节的数据被截断
    pub fn new(id: u32, data: &[u8]) -> Self {
        let mut fixed_data = [0u8; 8];
        let len = data.len().min(8);
        fixed_data[..len].copy_from_slice(&data[..len]);

        Self {
            id,
            data: fixed_data,
            len: len as u8,
        }
    }

    /// 获取数据切片（只包含有效数据）
    pub fn data_slice(&self) -> &[u8] {
        &self.data[..(self.len as usize).min(8)]
    }

    /// 获取 CAN ID
    pub fn id(&self) -> u32 {
        self.id
    }

    /// 获取完整数据（8字节固定数组）
    pub fn data(&self) -> &[u8; 8] {
        &self.data
    }
}

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid puck id: {0} (expected 0..=3)")]
    InvalidPuck(u8),
}
