//! 有界命令队列
//!
//! 容量固定的环形 FIFO。队列满时丢弃新命令并置位粘滞的溢出标志；
//! 标志不会因 `clear` 或出队而复位，只能通过 [`CommandQueue::take_overloaded`] 清除。

use crate::command::HandCommand;
use std::collections::VecDeque;

/// 默认队列容量
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// 待发送命令队列
#[derive(Debug, Clone)]
pub struct CommandQueue {
    buf: VecDeque<HandCommand>,
    capacity: usize,
    overloaded: bool,
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandQueue {
    /// 创建默认容量（100）的队列
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
            overloaded: false,
        }
    }

    /// 入队
    ///
    /// 队列已满时返回 `false`，命令被丢弃，溢出标志置位。
    pub fn push(&mut self, cmd: HandCommand) -> bool {
        if self.buf.len() >= self.capacity {
            self.overloaded = true;
            return false;
        }
        self.buf.push_back(cmd);
        true
    }

    /// 批量入队，返回成功入队的条数
    pub fn extend(&mut self, cmds: impl IntoIterator<Item = HandCommand>) -> usize {
        cmds.into_iter().filter(|&cmd| self.push(cmd)).count()
    }

    /// 取出最早入队的命令
    pub fn pop(&mut self) -> Option<HandCommand> {
        self.buf.pop_front()
    }

    /// 丢弃全部命令（溢出标志保持不变）
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// 溢出标志（只读，不清除）
    pub fn was_overloaded(&self) -> bool {
        self.overloaded
    }

    /// 读取并清除溢出标志
    pub fn take_overloaded(&mut self) -> bool {
        std::mem::take(&mut self.overloaded)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 按出队顺序遍历（不出队）
    pub fn iter(&self) -> impl Iterator<Item = &HandCommand> {
        self.buf.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bhand_protocol::Puck;

    fn target(i: i32) -> HandCommand {
        HandCommand::TargetPos {
            puck: Puck::Finger1,
            position: i,
        }
    }

    #[test]
    fn test_overflow_drops_newest() {
        let mut queue = CommandQueue::new();
        for i in 0..100 {
            assert!(queue.push(target(i)));
        }
        assert!(!queue.was_overloaded());

        assert!(!queue.push(target(100)));
        assert!(queue.was_overloaded());
        assert_eq!(queue.len(), 100);

        // 最后一条仍是第 100 条
        assert_eq!(queue.iter().last(), Some(&target(99)));

        queue.clear();
        assert!(queue.pop().is_none());
        // clear 不影响溢出标志
        assert!(queue.was_overloaded());
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = CommandQueue::new();
        let pushed: Vec<HandCommand> = (0..37).map(target).collect();
        assert_eq!(queue.extend(pushed.iter().copied()), 37);

        let popped: Vec<HandCommand> = std::iter::from_fn(|| queue.pop()).collect();
        assert_eq!(popped, pushed);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_fifo_after_wraparound() {
        let mut queue = CommandQueue::with_capacity(3);
        queue.push(target(0));
        queue.push(target(1));
        assert_eq!(queue.pop(), Some(target(0)));
        queue.push(target(2));
        queue.push(target(3));
        assert!(!queue.push(target(4)));
        assert_eq!(queue.pop(), Some(target(1)));
        assert_eq!(queue.pop(), Some(target(2)));
        assert_eq!(queue.pop(), Some(target(3)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_take_overloaded_clears_flag() {
        let mut queue = CommandQueue::with_capacity(1);
        queue.push(target(0));
        queue.push(target(1));
        assert!(queue.take_overloaded());
        assert!(!queue.take_overloaded());
        assert!(!queue.was_overloaded());
        assert_eq!(queue.capacity(), 1);
    }
}
