//! 属性帧编解码
//!
//! 帧格式：
//!
//! | 帧 | 长度 | 内容 |
//! |----|------|------|
//! | 写属性 | 6 | `[0x80 \| property, 0, v0, v1, v2, v3]`（小端） |
//! | 读属性 | 1 | `[property]`（最高位为 0 区分读写） |
//! | 属性应答 | 3-6 | `[0x80 \| property, 0, v0, ...]` |
//! | 编码器应答 | 3 或 6 | 两个 22 位字段，高字节在前 |
//! | 触觉应答 | 8 | 组号 + 5 个 12 位单元 |
//!
//! 应答帧不做校验：长度不足的帧按缺失字节为 0 解码，不会 panic。

use crate::PuckFrame;
use crate::property::Property;

/// 写属性标志位
pub const SET_FLAG: u8 = 0x80;

/// 写属性帧长度
pub const SET_FRAME_LEN: usize = 6;

/// 编码器字段回绕阈值
pub const ENCODER_WRAP_THRESHOLD: i32 = 0x20_0000;

/// 22 位编码器字段最大值
pub const ENCODER_FIELD_MAX: i32 = 0x3F_FFFF;

/// 单帧触觉单元数
pub const TACTILE_CELLS_PER_FRAME: usize = 5;

/// 单个手指的触觉帧数
pub const TACTILE_FRAMES_PER_ARRAY: usize = 5;

/// 单个手指的触觉单元总数
pub const TACTILE_CELLS: usize = TACTILE_CELLS_PER_FRAME * TACTILE_FRAMES_PER_ARRAY;

// ============================================================================
// 编码
// ============================================================================

/// 构建写属性帧
///
/// 数值取低 32 位，按小端写入 byte 2-5；超出 32 位的部分被截断。
///
/// ```rust
/// use bhand_protocol::{Property, encode_set};
///
/// let frame = encode_set(11, Property::MaxVelocity, 0x0102_0304);
/// assert_eq!(frame.data_slice(), &[0x80 | 45, 0, 0x04, 0x03, 0x02, 0x01]);
/// ```
pub fn encode_set(address: u32, property: Property, value: i64) -> PuckFrame {
    let v = (value as u32).to_le_bytes();
    PuckFrame::new(
        address,
        &[SET_FLAG | property.id(), 0, v[0], v[1], v[2], v[3]],
    )
}

/// 构建读属性帧
pub fn encode_get(address: u32, property: Property) -> PuckFrame {
    PuckFrame::new(address, &[property.id() & !SET_FLAG])
}

// ============================================================================
// 解码
// ============================================================================

/// 应答帧中回显的属性编号（byte 0 低 7 位）
///
/// 空帧返回 `None`。
pub fn reply_property(frame: &PuckFrame) -> Option<u8> {
    frame.data_slice().first().map(|b| b & !SET_FLAG)
}

/// 解析属性应答中的标量值
///
/// 从 byte 2 开始按小端拼接到最后一个有效字节，并以最高有效字节的
/// 最高位做符号扩展。有效字节不足 3 个时返回 0。
///
/// ```rust
/// use bhand_protocol::{PuckFrame, decode_scalar_reply};
///
/// // 3 字节短应答：0xFF 符号扩展为 -1
/// let frame = PuckFrame::new(0x566, &[0x08, 0, 0xFF]);
/// assert_eq!(decode_scalar_reply(&frame), -1);
/// ```
pub fn decode_scalar_reply(frame: &PuckFrame) -> i32 {
    let data = frame.data_slice();
    if data.len() <= 2 {
        return 0;
    }

    let mut value: i32 = if data[data.len() - 1] & 0x80 != 0 { -1 } else { 0 };
    for &byte in data[2..].iter().rev() {
        value = (value << 8) | byte as i32;
    }
    value
}

/// 解析编码器应答（电机编码器 + 关节编码器）
///
/// - 6 字节：两个 22 位字段，分别来自 byte 0-2 与 byte 3-5（首字节只取低 6 位）
/// - 3 字节：只有第一个字段，第二个字段为 0
///
/// 任一字段大于 `0x200000` 时按 `0x3FFFFF - field` 折回（设备端回绕）。
pub fn decode_encoder_pair(frame: &PuckFrame) -> (i32, i32) {
    let d = frame.data();
    let first = encoder_field(d[0], d[1], d[2]);
    let second = if frame.len >= 6 {
        encoder_field(d[3], d[4], d[5])
    } else {
        0
    };
    (fold_encoder(first), fold_encoder(second))
}

#[inline]
fn encoder_field(hi: u8, mid: u8, lo: u8) -> i32 {
    ((0x3F & hi as i32) << 16) | ((mid as i32) << 8) | lo as i32
}

/// 编码器字段回绕修正
#[inline]
pub fn fold_encoder(field: i32) -> i32 {
    if field > ENCODER_WRAP_THRESHOLD {
        ENCODER_FIELD_MAX - field
    } else {
        field
    }
}

/// 单帧触觉数据
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TactileFrame {
    /// 组号（byte 0 高 4 位）
    pub group: u8,
    /// 5 个 12 位单元
    pub cells: [u16; TACTILE_CELLS_PER_FRAME],
}

/// 解析单帧触觉数据
///
/// 12 位单元跨半字节排列：
///
/// ```text
/// byte:  0        1        2        3        4        5        6        7
///        gggg aaaa aaaaaaaa bbbbbbbb bbbb cccc cccccccc dddddddd dddd eeee eeeeeeee
/// ```
pub fn decode_tactile(frame: &PuckFrame) -> TactileFrame {
    let d = frame.data.map(u16::from);
    TactileFrame {
        group: ((d[0] >> 4) & 0x0F) as u8,
        cells: [
            ((d[0] & 0x0F) << 8) | d[1],
            (d[2] << 4) | ((d[3] >> 4) & 0x0F),
            ((d[3] & 0x0F) << 8) | d[4],
            (d[5] << 4) | ((d[6] >> 4) & 0x0F),
            ((d[6] & 0x0F) << 8) | d[7],
        ],
    }
}

/// 单个手指的完整触觉阵列（25 个单元）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TactileArray {
    pub cells: [u16; TACTILE_CELLS],
}

impl Default for TactileArray {
    fn default() -> Self {
        Self {
            cells: [0; TACTILE_CELLS],
        }
    }
}

impl TactileArray {
    /// 按到达顺序写入第 `slot` 帧（0-4），越界时忽略
    pub fn fill_slot(&mut self, slot: usize, frame: &TactileFrame) {
        if slot >= TACTILE_FRAMES_PER_ARRAY {
            return;
        }
        let start = slot * TACTILE_CELLS_PER_FRAME;
        self.cells[start..start + TACTILE_CELLS_PER_FRAME].copy_from_slice(&frame.cells);
    }

    /// 最大单元值
    pub fn max_cell(&self) -> u16 {
        self.cells.iter().copied().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// 设备回显：应答帧与写帧字节相同
    fn echo(frame: PuckFrame) -> PuckFrame {
        PuckFrame::new(0x566, frame.data_slice())
    }

    #[test]
    fn test_encode_set_layout() {
        let frame = encode_set(12, Property::Endpoint, -2);
        assert_eq!(frame.id, 12);
        assert_eq!(frame.len, 6);
        assert_eq!(frame.data_slice(), &[0x80 | 52, 0, 0xFE, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_encode_set_truncates_beyond_32_bits() {
        let frame = encode_set(11, Property::Position, 0x1_0000_0005);
        assert_eq!(&frame.data_slice()[2..], &[0x05, 0, 0, 0]);
    }

    #[test]
    fn test_encode_get_layout() {
        let frame = encode_get(13, Property::Mode);
        assert_eq!(frame.id, 13);
        assert_eq!(frame.data_slice(), &[8]);
        assert_eq!(frame.data[0] & SET_FLAG, 0);
    }

    #[test]
    fn test_scalar_reply_short_frames() {
        // 4 字节：16 位正数
        let frame = PuckFrame::new(0x566, &[0x88, 0, 0x34, 0x12]);
        assert_eq!(decode_scalar_reply(&frame), 0x1234);

        // 4 字节：16 位负数
        let frame = PuckFrame::new(0x566, &[0x88, 0, 0x00, 0x80]);
        assert_eq!(decode_scalar_reply(&frame), -32768);

        // 无数值字节
        let frame = PuckFrame::new(0x566, &[0x88, 0]);
        assert_eq!(decode_scalar_reply(&frame), 0);
        let frame = PuckFrame::new(0x566, &[]);
        assert_eq!(decode_scalar_reply(&frame), 0);
    }

    #[test]
    fn test_reply_property() {
        let frame = PuckFrame::new(0x566, &[0x80 | 22, 0, 1, 0]);
        assert_eq!(reply_property(&frame), Some(22));
        assert_eq!(reply_property(&PuckFrame::new(0x566, &[])), None);
    }

    #[test]
    fn test_encoder_wrap_folds_above_threshold() {
        // 0x200001 -> 0x3FFFFF - 0x200001 = 0x1FFFFE
        let frame = PuckFrame::new(0x563, &[0x20, 0x00, 0x01, 0x1F, 0xFF, 0xFF]);
        let (p, jp) = decode_encoder_pair(&frame);
        assert_eq!(p, 0x3F_FFFF - 0x20_0001);
        assert_eq!(p, 0x1F_FFFE);
        // 0x1FFFFF 不折回
        assert_eq!(jp, 0x1F_FFFF);
    }

    #[test]
    fn test_encoder_masks_top_bits_of_first_byte() {
        let frame = PuckFrame::new(0x563, &[0xC1, 0x02, 0x03, 0xC0, 0x00, 0x10]);
        let (p, jp) = decode_encoder_pair(&frame);
        assert_eq!(p, 0x01_0203);
        assert_eq!(jp, 0x10);
    }

    #[test]
    fn test_encoder_short_frame() {
        let frame = PuckFrame::new(0x563, &[0x00, 0x10, 0x00]);
        assert_eq!(decode_encoder_pair(&frame), (0x1000, 0));
    }

    #[test]
    fn test_decode_tactile() {
        // group=3, a=0x123, b=0x456, c=0x789, d=0xABC, e=0xDEF
        let frame = PuckFrame::new(
            0x569,
            &[0x31, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF],
        );
        let t = decode_tactile(&frame);
        assert_eq!(t.group, 3);
        assert_eq!(t.cells, [0x123, 0x456, 0x789, 0xABC, 0xDEF]);
    }

    #[test]
    fn test_tactile_array_fill() {
        let mut array = TactileArray::default();
        let frame = TactileFrame {
            group: 0,
            cells: [1, 2, 3, 4, 5],
        };
        array.fill_slot(4, &frame);
        assert_eq!(&array.cells[20..], &[1, 2, 3, 4, 5]);
        array.fill_slot(5, &frame);
        assert_eq!(array.max_cell(), 5);
    }

    proptest! {
        #[test]
        fn prop_scalar_roundtrip(value in any::<i32>()) {
            let frame = encode_set(11, Property::Position, value as i64);
            prop_assert_eq!(decode_scalar_reply(&echo(frame)), value);
        }
    }
}
