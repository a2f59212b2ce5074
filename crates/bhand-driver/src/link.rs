//! puck 命令与遥测链路
//!
//! 所有操作都不阻塞：
//! - 写属性/命令：发送即返回
//! - 读属性：拆成 `send_get_*`（发请求）与 `get_*`（尝试取一个已到达的应答）两步，
//!   `get_*` 返回 `Ok(None)` 表示应答尚未到达，这不是错误
//!
//! 发送失败分两类：瞬态错误（缓冲区满、超时）记录后吞掉并计数；
//! 致命错误（设备丢失、总线关闭）作为 [`DriverError`] 返回。

use crate::command::HandCommand;
use crate::error::DriverError;
use crate::mailbox::{DEFAULT_MAILBOX_DEPTH, ReplyKey, ReplyMailbox};
use bhand_can::{CanAdapter, PuckFrame};
use bhand_protocol::codec::{
    TACTILE_FRAMES_PER_ARRAY, TactileArray, decode_encoder_pair, decode_scalar_reply,
    decode_tactile, encode_get, encode_set,
};
use bhand_protocol::codec::reply_property;
use bhand_protocol::ids::{
    DEFAULT_PUCK_ADDRESS_BASE, GROUP_FLAG, GROUP_POSITION_FEEDBACK, GROUP_PROPERTY_REPLY,
    GROUP_TACTILE_FULL, hand_group_address, position_reply_address, property_reply_address,
    tactile_reply_address,
};
use bhand_protocol::{CommandCode, Property, Puck, PuckMode, TACTILE_FULL_REQUEST};
use tracing::{debug, trace, warn};

/// 单次 `get_*` 调用最多从总线读取的帧数
pub const DEFAULT_MAX_FRAMES_PER_GET: usize = 64;

/// 链路统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// 成功发送的帧数
    pub frames_sent: u64,
    /// 瞬态发送失败次数
    pub send_failures: u64,
    /// 从总线读到的帧数
    pub frames_received: u64,
    /// 瞬态接收失败次数
    pub receive_failures: u64,
    /// 不属于本手爪应答地址而被丢弃的帧数
    pub frames_ignored: u64,
}

/// 单个 puck 的触觉帧拼装状态
#[derive(Debug, Clone, Copy, Default)]
struct TactileAssembly {
    array: TactileArray,
    filled: usize,
}

/// puck 链路
pub struct PuckLink<A: CanAdapter> {
    adapter: A,
    address_base: u32,
    mailbox: ReplyMailbox,
    max_frames_per_get: usize,
    tactile: [TactileAssembly; 4],
    stats: LinkStats,
}

impl<A: CanAdapter> PuckLink<A> {
    /// 使用默认地址基数（11）创建链路
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            address_base: DEFAULT_PUCK_ADDRESS_BASE,
            mailbox: ReplyMailbox::new(DEFAULT_MAILBOX_DEPTH),
            max_frames_per_get: DEFAULT_MAX_FRAMES_PER_GET,
            tactile: [TactileAssembly::default(); 4],
            stats: LinkStats::default(),
        }
    }

    /// 设置单播地址基数
    pub fn with_address_base(mut self, base: u32) -> Self {
        self.address_base = base;
        self
    }

    /// 设置每个键的应答缓存深度
    pub fn with_mailbox_depth(mut self, depth: usize) -> Self {
        self.mailbox = ReplyMailbox::new(depth);
        self
    }

    /// puck 的单播地址
    #[inline]
    pub fn address(&self, puck: Puck) -> u32 {
        puck.address_with_base(self.address_base)
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// 缓存中尚未被取走的应答帧数
    pub fn buffered(&self) -> usize {
        self.mailbox.len()
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn into_adapter(self) -> A {
        self.adapter
    }

    // ========================================================================
    // 底层收发
    // ========================================================================

    fn transmit(&mut self, frame: PuckFrame) -> Result<(), DriverError> {
        match self.adapter.send(frame) {
            Ok(()) => {
                self.stats.frames_sent += 1;
                Ok(())
            },
            Err(e) if !e.is_fatal() => {
                self.stats.send_failures += 1;
                warn!("Dropped frame ID=0x{:X}: {}", frame.id, e);
                Ok(())
            },
            Err(e) => Err(e.into()),
        }
    }

    fn set_property(&mut self, address: u32, property: Property, value: i32) -> Result<(), DriverError> {
        trace!("SET 0x{:X} {:?}={}", address, property, value);
        self.transmit(encode_set(address, property, value as i64))
    }

    fn request_property(&mut self, address: u32, property: Property) -> Result<(), DriverError> {
        trace!("GET 0x{:X} {:?}", address, property);
        self.transmit(encode_get(address, property))
    }

    fn command(&mut self, address: u32, code: CommandCode) -> Result<(), DriverError> {
        self.set_property(address, Property::Cmd, code.value())
    }

    /// 帧是否为本手爪 4 个 puck 的应答
    ///
    /// 只接受位置、属性、触觉三个应答组；属性应答还要求回显的属性编号已知。
    /// 这样缓存的键集合是有限的。
    fn is_hand_reply(&self, frame: &PuckFrame) -> bool {
        if frame.id > 0x7FF || frame.id & GROUP_FLAG == 0 {
            return false;
        }
        let from = (frame.id >> 5) & 0x1F;
        let to = frame.id & 0x1F;
        if !(self.address_base..self.address_base + Puck::ALL.len() as u32).contains(&from) {
            return false;
        }
        match to {
            GROUP_POSITION_FEEDBACK | GROUP_TACTILE_FULL => true,
            GROUP_PROPERTY_REPLY => {
                reply_property(frame).is_some_and(|p| Property::try_from(p).is_ok())
            },
            _ => false,
        }
    }

    /// 取一帧属于 `key` 的应答
    ///
    /// 先查缓存；缓存为空时从总线读取，不匹配的应答存入缓存，
    /// 直到读到匹配帧、总线暂无数据或达到单次读取上限。
    /// 不属于本手爪的帧直接丢弃。
    pub fn receive(&mut self, key: ReplyKey) -> Result<Option<PuckFrame>, DriverError> {
        if let Some(frame) = self.mailbox.take(key) {
            return Ok(Some(frame));
        }

        for _ in 0..self.max_frames_per_get {
            let frame = match self.adapter.try_receive() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) if !e.is_fatal() => {
                    self.stats.receive_failures += 1;
                    warn!("Receive failed: {}", e);
                    break;
                },
                Err(e) => return Err(e.into()),
            };
            self.stats.frames_received += 1;

            if !self.is_hand_reply(&frame) {
                self.stats.frames_ignored += 1;
                trace!("Ignored frame ID=0x{:X} len={}", frame.id, frame.len);
                continue;
            }
            if ReplyKey::of(&frame) == key {
                return Ok(Some(frame));
            }
            self.mailbox.post(frame);
        }
        Ok(None)
    }

    fn receive_scalar(&mut self, puck: Puck, property: Property) -> Result<Option<i32>, DriverError> {
        let key = ReplyKey::property(property_reply_address(self.address(puck)), property.id());
        Ok(self.receive(key)?.map(|frame| decode_scalar_reply(&frame)))
    }

    // ========================================================================
    // 命令
    // ========================================================================

    /// 复位手指
    pub fn reset_finger(&mut self, puck: Puck) -> Result<(), DriverError> {
        self.command(self.address(puck), CommandCode::Reset)
    }

    /// 回零初始化
    pub fn init_finger(&mut self, puck: Puck) -> Result<(), DriverError> {
        self.command(self.address(puck), CommandCode::Hi)
    }

    pub fn stop_finger(&mut self, puck: Puck) -> Result<(), DriverError> {
        self.command(self.address(puck), CommandCode::Stop)
    }

    /// 停止整只手（组广播）
    pub fn stop_hand(&mut self) -> Result<(), DriverError> {
        self.command(hand_group_address(), CommandCode::Stop)
    }

    pub fn open(&mut self, puck: Puck) -> Result<(), DriverError> {
        self.command(self.address(puck), CommandCode::Open)
    }

    pub fn close(&mut self, puck: Puck) -> Result<(), DriverError> {
        self.command(self.address(puck), CommandCode::Close)
    }

    /// 全部 puck 进入梯形运动
    pub fn move_all(&mut self) -> Result<(), DriverError> {
        self.set_property(hand_group_address(), Property::Mode, PuckMode::Trapezoid.value())
    }

    /// 全部 puck 进入速度模式
    pub fn move_all_velocity(&mut self) -> Result<(), DriverError> {
        self.set_property(hand_group_address(), Property::Mode, PuckMode::Velocity.value())
    }

    /// 单个 puck 进入梯形运动
    pub fn move_puck(&mut self, puck: Puck) -> Result<(), DriverError> {
        self.set_property(self.address(puck), Property::Mode, PuckMode::Trapezoid.value())
    }

    // ========================================================================
    // 属性写入
    // ========================================================================

    pub fn set_max_vel(&mut self, puck: Puck, value: i32) -> Result<(), DriverError> {
        self.set_property(self.address(puck), Property::MaxVelocity, value)
    }

    /// 目标位置（写入 ENDPOINT）
    pub fn set_target_pos(&mut self, puck: Puck, position: i32) -> Result<(), DriverError> {
        self.set_property(self.address(puck), Property::Endpoint, position)
    }

    pub fn set_target_vel(&mut self, puck: Puck, velocity: i32) -> Result<(), DriverError> {
        self.set_property(self.address(puck), Property::Velocity, velocity)
    }

    pub fn set_max_torque(&mut self, puck: Puck, value: i32) -> Result<(), DriverError> {
        self.set_property(self.address(puck), Property::MaxTorque, value)
    }

    pub fn set_hold_position(&mut self, puck: Puck, hold: bool) -> Result<(), DriverError> {
        self.set_property(self.address(puck), Property::Hold, i32::from(hold))
    }

    pub fn set_open_target(&mut self, puck: Puck, target: i32) -> Result<(), DriverError> {
        self.set_property(self.address(puck), Property::OpenTarget, target)
    }

    pub fn set_close_target(&mut self, puck: Puck, target: i32) -> Result<(), DriverError> {
        self.set_property(self.address(puck), Property::CloseTarget, target)
    }

    /// 写任意属性；`save` 为真时随后写 SAVE 使其持久化
    pub fn set_parameter(
        &mut self,
        puck: Puck,
        property: Property,
        value: i32,
        save: bool,
    ) -> Result<(), DriverError> {
        let address = self.address(puck);
        self.set_property(address, property, value)?;
        if save {
            self.set_property(address, Property::Save, property.id() as i32)?;
        }
        Ok(())
    }

    // ========================================================================
    // 请求 / 轮询
    // ========================================================================

    pub fn send_get_position(&mut self, puck: Puck) -> Result<(), DriverError> {
        self.request_property(self.address(puck), Property::Position)
    }

    /// (电机编码器, 关节编码器)
    pub fn get_position(&mut self, puck: Puck) -> Result<Option<(i32, i32)>, DriverError> {
        let key = ReplyKey::address(position_reply_address(self.address(puck)));
        Ok(self.receive(key)?.map(|frame| decode_encoder_pair(&frame)))
    }

    pub fn send_get_status(&mut self, puck: Puck) -> Result<(), DriverError> {
        self.request_property(self.address(puck), Property::Mode)
    }

    /// 工作模式原始值（0 = 空闲）
    pub fn get_status(&mut self, puck: Puck) -> Result<Option<i32>, DriverError> {
        self.receive_scalar(puck, Property::Mode)
    }

    pub fn send_get_current(&mut self, puck: Puck) -> Result<(), DriverError> {
        self.request_property(self.address(puck), Property::MotorCurrent)
    }

    pub fn get_current(&mut self, puck: Puck) -> Result<Option<i32>, DriverError> {
        self.receive_scalar(puck, Property::MotorCurrent)
    }

    pub fn send_get_temperature(&mut self, puck: Puck) -> Result<(), DriverError> {
        self.request_property(self.address(puck), Property::Temperature)
    }

    pub fn get_temperature(&mut self, puck: Puck) -> Result<Option<i32>, DriverError> {
        self.receive_scalar(puck, Property::Temperature)
    }

    pub fn send_get_therm(&mut self, puck: Puck) -> Result<(), DriverError> {
        self.request_property(self.address(puck), Property::Therm)
    }

    pub fn get_therm(&mut self, puck: Puck) -> Result<Option<i32>, DriverError> {
        self.receive_scalar(puck, Property::Therm)
    }

    /// 请求任意属性
    pub fn send_get_parameter(&mut self, puck: Puck, property: Property) -> Result<(), DriverError> {
        self.request_property(self.address(puck), property)
    }

    pub fn get_parameter(&mut self, puck: Puck, property: Property) -> Result<Option<i32>, DriverError> {
        self.receive_scalar(puck, property)
    }

    /// 请求完整触觉阵列（丢弃上一次未拼装完的帧）
    pub fn send_get_tactile(&mut self, puck: Puck) -> Result<(), DriverError> {
        let address = self.address(puck);
        self.tactile[puck.index()] = TactileAssembly::default();
        self.mailbox.discard(ReplyKey::address(tactile_reply_address(address)));
        self.set_property(address, Property::Tactile, TACTILE_FULL_REQUEST)
    }

    /// 五帧全部到达后返回完整阵列，否则返回 `None`（已到达的帧保留）
    pub fn get_tactile(&mut self, puck: Puck) -> Result<Option<TactileArray>, DriverError> {
        let key = ReplyKey::address(tactile_reply_address(self.address(puck)));
        let i = puck.index();

        while self.tactile[i].filled < TACTILE_FRAMES_PER_ARRAY {
            let Some(frame) = self.receive(key)? else {
                return Ok(None);
            };
            let slot = self.tactile[i].filled;
            self.tactile[i].array.fill_slot(slot, &decode_tactile(&frame));
            self.tactile[i].filled += 1;
        }

        let array = self.tactile[i].array;
        self.tactile[i] = TactileAssembly::default();
        Ok(Some(array))
    }

    // ========================================================================
    // 队列命令分发
    // ========================================================================

    /// 把一条队列命令翻译成对应的链路操作
    pub fn execute(&mut self, cmd: &HandCommand) -> Result<(), DriverError> {
        debug!("Dispatch {} to {:?}", cmd.name(), cmd.puck());
        match *cmd {
            HandCommand::MaxVel { puck, value } => self.set_max_vel(puck, value),
            HandCommand::Hold { puck, enabled } => self.set_hold_position(puck, enabled),
            HandCommand::Reset { puck } => self.reset_finger(puck),
            HandCommand::Init { puck } => self.init_finger(puck),
            HandCommand::MaxTorque { puck, value } => self.set_max_torque(puck, value),
            HandCommand::TargetPos { puck, position } => self.set_target_pos(puck, position),
            HandCommand::Stop { puck } => self.stop_finger(puck),
            HandCommand::Move { puck } => self.move_puck(puck),
        }
    }
}

impl<A: CanAdapter + std::fmt::Debug> std::fmt::Debug for PuckLink<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PuckLink")
            .field("adapter", &self.adapter)
            .field("address_base", &self.address_base)
            .field("stats", &self.stats)
            .finish()
    }
}
