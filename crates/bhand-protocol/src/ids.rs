//! 总线地址定义
//!
//! puck 单播地址为 `base + id`（默认 base = 11）；组地址由
//! `0x400 | (from << 5) | to` 计算，一次广播请求会让组内每个 puck 各自应答。

/// 默认单播地址基数（puck 0 = 11）
pub const DEFAULT_PUCK_ADDRESS_BASE: u32 = 11;

/// 组地址标志位
pub const GROUP_FLAG: u32 = 0x400;

// ============================================================================
// 组编号
// ============================================================================

/// 全部 puck
pub const GROUP_ALL: u32 = 0;

/// 位置反馈组（编码器应答）
pub const GROUP_POSITION_FEEDBACK: u32 = 3;

/// 手爪组（3 个手指 + 张开轴）
pub const GROUP_HAND: u32 = 5;

/// 属性应答组
pub const GROUP_PROPERTY_REPLY: u32 = 6;

/// 完整触觉阵列应答组
pub const GROUP_TACTILE_FULL: u32 = 9;

/// 计算组地址
///
/// ```rust
/// use bhand_protocol::ids::group_address;
///
/// assert_eq!(group_address(0, 5), 0x405);
/// assert_eq!(group_address(11, 6), 0x400 | (11 << 5) | 6);
/// ```
#[inline]
pub const fn group_address(from: u32, to: u32) -> u32 {
    GROUP_FLAG | (from << 5) | to
}

/// 发往整个手爪的广播地址
#[inline]
pub const fn hand_group_address() -> u32 {
    group_address(GROUP_ALL, GROUP_HAND)
}

/// puck 的属性应答地址
#[inline]
pub const fn property_reply_address(puck_address: u32) -> u32 {
    group_address(puck_address, GROUP_PROPERTY_REPLY)
}

/// puck 的位置（编码器）应答地址
#[inline]
pub const fn position_reply_address(puck_address: u32) -> u32 {
    group_address(puck_address, GROUP_POSITION_FEEDBACK)
}

/// puck 的触觉阵列应答地址
#[inline]
pub const fn tactile_reply_address(puck_address: u32) -> u32 {
    group_address(puck_address, GROUP_TACTILE_FULL)
}

/// 是否为属性应答地址（多个属性共用同一地址，需要按属性分拣）
#[inline]
pub const fn is_property_reply(id: u32) -> bool {
    (id & GROUP_FLAG) != 0 && (id & 0x1F) == GROUP_PROPERTY_REPLY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_address_formula() {
        assert_eq!(group_address(0, 0), 0x400);
        assert_eq!(group_address(1, 2), 0x400 | 0x20 | 2);
        assert_eq!(hand_group_address(), 0x405);
    }

    #[test]
    fn test_reply_addresses_for_first_puck() {
        // puck 0 的单播地址为 11
        assert_eq!(property_reply_address(11), 0x400 | (11 << 5) | 6);
        assert_eq!(position_reply_address(11), 0x400 | (11 << 5) | 3);
        assert_eq!(tactile_reply_address(11), 0x400 | (11 << 5) | 9);
    }

    #[test]
    fn test_is_property_reply() {
        assert!(is_property_reply(property_reply_address(12)));
        assert!(!is_property_reply(position_reply_address(12)));
        // 单播地址没有组标志
        assert!(!is_property_reply(6));
    }
}
