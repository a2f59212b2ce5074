//! Mock CAN 总线（无硬件依赖）
//!
//! [`MockBus`] 是共享句柄：测试代码持有一份用来注入应答、检查已发送帧，
//! [`MockCanAdapter`] 交给被测对象使用。

use crate::{CanAdapter, CanError, PuckFrame};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct BusState {
    /// 已发送帧（按发送顺序）
    sent: Vec<PuckFrame>,
    /// 待接收帧
    rx: VecDeque<PuckFrame>,
    /// 待注入的发送错误（每次发送消耗一个）
    send_errors: VecDeque<CanError>,
}

/// 共享的 mock 总线
#[derive(Debug, Clone, Default)]
pub struct MockBus {
    state: Arc<Mutex<BusState>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建挂在此总线上的适配器
    pub fn adapter(&self) -> MockCanAdapter {
        MockCanAdapter {
            bus: self.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        // 测试线程 panic 后仍允许读取状态
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 注入一帧待接收数据
    pub fn inject(&self, frame: PuckFrame) {
        self.lock().rx.push_back(frame);
    }

    /// 批量注入
    pub fn inject_all(&self, frames: impl IntoIterator<Item = PuckFrame>) {
        self.lock().rx.extend(frames);
    }

    /// 让下一次发送失败
    pub fn fail_next_send(&self, error: CanError) {
        self.lock().send_errors.push_back(error);
    }

    /// 已发送帧的副本
    pub fn sent(&self) -> Vec<PuckFrame> {
        self.lock().sent.clone()
    }

    /// 取出并清空已发送帧
    pub fn take_sent(&self) -> Vec<PuckFrame> {
        std::mem::take(&mut self.lock().sent)
    }

    /// 尚未被读取的帧数
    pub fn pending_rx(&self) -> usize {
        self.lock().rx.len()
    }
}

/// Mock CAN 适配器
#[derive(Debug, Clone)]
pub struct MockCanAdapter {
    bus: MockBus,
}

impl MockCanAdapter {
    /// 独立的适配器（附带新建的总线句柄）
    pub fn new() -> (Self, MockBus) {
        let bus = MockBus::new();
        (bus.adapter(), bus)
    }
}

impl CanAdapter for MockCanAdapter {
    fn send(&mut self, frame: PuckFrame) -> Result<(), CanError> {
        let mut state = self.bus.lock();
        if let Some(err) = state.send_errors.pop_front() {
            return Err(err);
        }
        state.sent.push(frame);
        Ok(())
    }

    fn try_receive(&mut self) -> Result<Option<PuckFrame>, CanError> {
        Ok(self.bus.lock().rx.pop_front())
    }
}
