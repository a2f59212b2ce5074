//! 应答分拣
//!
//! 总线按到达顺序交付帧，而 getter 需要"某个 puck 的某类应答"。
//! 同一个 puck 的 MODE、电流、温度应答共用属性应答地址，因此属性应答
//! 额外按回显的属性编号分拣；位置与触觉应答只按地址分拣。
//!
//! 每个键的缓冲有上限，超出时丢弃最旧的应答。键的集合由调用方过滤：
//! 只有本手爪 puck 的应答地址才会进入缓存。

use bhand_can::PuckFrame;
use bhand_protocol::codec::reply_property;
use bhand_protocol::ids::is_property_reply;
use std::collections::{HashMap, VecDeque};
use tracing::{trace, warn};

/// 每个键默认缓存的应答帧数
pub const DEFAULT_MAILBOX_DEPTH: usize = 32;

/// 预分配的键数（4 个 puck，每个 puck 的位置、触觉与常用属性应答）
const EXPECTED_KEYS: usize = 32;

/// 分拣键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplyKey {
    pub address: u32,
    /// 属性应答地址上的属性编号；其他地址为 `None`
    pub property: Option<u8>,
}

impl ReplyKey {
    /// 按地址分拣的键（位置、触觉应答）
    pub const fn address(address: u32) -> Self {
        Self {
            address,
            property: None,
        }
    }

    /// 按地址 + 属性分拣的键
    pub const fn property(address: u32, property: u8) -> Self {
        Self {
            address,
            property: Some(property),
        }
    }

    /// 计算一帧应答所属的键
    pub fn of(frame: &PuckFrame) -> Self {
        if is_property_reply(frame.id) {
            Self {
                address: frame.id,
                property: reply_property(frame),
            }
        } else {
            Self::address(frame.id)
        }
    }
}

/// 按键缓存的应答帧
#[derive(Debug)]
pub struct ReplyMailbox {
    slots: HashMap<ReplyKey, VecDeque<PuckFrame>>,
    depth: usize,
    dropped: u64,
}

impl Default for ReplyMailbox {
    fn default() -> Self {
        Self::new(DEFAULT_MAILBOX_DEPTH)
    }
}

impl ReplyMailbox {
    pub fn new(depth: usize) -> Self {
        Self {
            slots: HashMap::with_capacity(EXPECTED_KEYS),
            depth: depth.max(1),
            dropped: 0,
        }
    }

    /// 存入一帧
    pub fn post(&mut self, frame: PuckFrame) {
        let key = ReplyKey::of(&frame);
        let slot = self.slots.entry(key).or_default();
        if slot.len() >= self.depth {
            slot.pop_front();
            self.dropped += 1;
            // 持续溢出时按 1, 2, 4, 8... 次告警
            if self.dropped.is_power_of_two() {
                warn!(
                    "Reply mailbox full for ID=0x{:X} property={:?}, dropping oldest ({} dropped)",
                    key.address, key.property, self.dropped
                );
            } else {
                trace!("Reply mailbox full for ID=0x{:X}, dropping oldest", key.address);
            }
        }
        slot.push_back(frame);
    }

    /// 取出该键最早的一帧
    pub fn take(&mut self, key: ReplyKey) -> Option<PuckFrame> {
        self.slots.get_mut(&key).and_then(VecDeque::pop_front)
    }

    /// 该键缓存的帧数
    pub fn pending(&self, key: ReplyKey) -> usize {
        self.slots.get(&key).map_or(0, VecDeque::len)
    }

    /// 丢弃该键的全部帧
    pub fn discard(&mut self, key: ReplyKey) {
        if let Some(slot) = self.slots.get_mut(&key) {
            slot.clear();
        }
    }

    /// 全部键缓存的帧数
    pub fn len(&self) -> usize {
        self.slots.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.values().all(VecDeque::is_empty)
    }

    /// 因缓冲满被丢弃的帧数
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bhand_protocol::ids::{position_reply_address, property_reply_address};

    #[test]
    fn test_property_replies_sorted_by_property() {
        let addr = property_reply_address(11);
        let mut mailbox = ReplyMailbox::default();
        mailbox.post(PuckFrame::new(addr, &[0x80 | 8, 0, 5, 0]));
        mailbox.post(PuckFrame::new(addr, &[0x80 | 22, 0, 0x10, 0]));

        let current = mailbox.take(ReplyKey::property(addr, 22)).unwrap();
        assert_eq!(current.data[2], 0x10);
        let mode = mailbox.take(ReplyKey::property(addr, 8)).unwrap();
        assert_eq!(mode.data[2], 5);
        assert!(mailbox.take(ReplyKey::property(addr, 8)).is_none());
    }

    #[test]
    fn test_position_replies_keyed_by_address_only() {
        let addr = position_reply_address(12);
        let frame = PuckFrame::new(addr, &[0x00, 0x10, 0x00]);
        assert_eq!(ReplyKey::of(&frame), ReplyKey::address(addr));
    }

    #[test]
    fn test_depth_drops_oldest() {
        let addr = position_reply_address(11);
        let key = ReplyKey::address(addr);
        let mut mailbox = ReplyMailbox::new(2);
        for i in 0..3u8 {
            mailbox.post(PuckFrame::new(addr, &[0, 0, i]));
        }
        assert_eq!(mailbox.pending(key), 2);
        assert_eq!(mailbox.len(), 2);
        assert_eq!(mailbox.dropped(), 1);
        assert_eq!(mailbox.take(key).unwrap().data[2], 1);

        mailbox.discard(key);
        assert_eq!(mailbox.pending(key), 0);
        assert!(mailbox.is_empty());
    }
}
