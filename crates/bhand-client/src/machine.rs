//! 控制状态机
//!
//! 由外部定时器以固定周期调用 [`HandStateMachine::tick`]，状态机本身不创建线程、
//! 不阻塞。两个状态：
//!
//! ```text
//!            reset == 1
//! NormalOp ──────────────▶ InitHand
//!     ▲                        │
//!     └──── 进入后 3000ms ─────┘
//! ```
//!
//! NormalOp 把总线流量按 6 个相位分摊：相位 0-3 各轮询一个 puck 的位置、模式、电流，
//! 相位 4-5 各从队列取至多 3 条命令发出。

use crate::config::HandConfig;
use crate::error::HandError;
use crate::io::{MoveRequest, TickInput, TickOutput};
use crate::kinematics::{
    self, JOINT_COUNT, constant_joint_positions, joint_to_counts, joint_torques,
    velocity_to_counts_per_ms,
};
use crate::status::{HandStatus, ReadSequence, StatusInputs, StatusMonitor};
use crate::thermal::ThermalGuard;
use bhand_can::CanAdapter;
use bhand_driver::command::per_puck;
use bhand_driver::{CommandBatch, CommandQueue, HandCommand, HandTelemetry, PuckLink};
use bhand_protocol::Puck;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 运动开始时使用的力矩上限
pub const STATIC_TORQUE_MAX: i32 = 4700;

/// 运动开始后保持 [`STATIC_TORQUE_MAX`] 的周期数
pub const TORQUE_RAMP_TICKS: u32 = 5;

/// NormalOp 相位数
pub const PHASE_COUNT: u8 = 6;

/// 每个命令相位最多发出的命令数
pub const COMMANDS_PER_PHASE: usize = 3;

/// 初始化时各 puck 发送 INIT 的时刻（相对进入 InitHand）
pub const INIT_SCHEDULE: [(Puck, Duration); 4] = [
    (Puck::Finger1, Duration::from_millis(100)),
    (Puck::Finger2, Duration::from_millis(200)),
    (Puck::Finger3, Duration::from_millis(300)),
    (Puck::Spread, Duration::from_millis(1500)),
];

/// 初始化总时长
pub const INIT_DURATION: Duration = Duration::from_millis(3000);

/// 控制状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandState {
    /// 回零初始化
    InitHand {
        /// 进入时刻
        entered_at: Instant,
        /// 各 puck 的 INIT 是否已入队
        sent: [bool; 4],
        /// 复位前的读取时序，回到 NormalOp 时恢复
        read_seq: ReadSequence,
    },
    /// 正常运行
    NormalOp {
        /// 相位计数（0-5）
        iteration: u8,
        read_seq: ReadSequence,
    },
}

impl HandState {
    fn normal() -> Self {
        HandState::NormalOp {
            iteration: 0,
            read_seq: ReadSequence::BeforeCmdSend,
        }
    }

    pub fn is_init(&self) -> bool {
        matches!(self, HandState::InitHand { .. })
    }

    /// 当前（或复位前）的读取时序
    pub fn read_seq(&self) -> ReadSequence {
        match *self {
            HandState::InitHand { read_seq, .. } | HandState::NormalOp { read_seq, .. } => read_seq,
        }
    }
}

/// 手爪控制状态机
pub struct HandStateMachine<A: CanAdapter> {
    link: PuckLink<A>,
    queue: CommandQueue,
    state: HandState,
    telemetry: HandTelemetry,
    monitor: StatusMonitor,
    thermal: Option<ThermalGuard>,
    constant_configuration: Option<[f64; 4]>,
    max_poll_attempts: usize,

    last_command: Option<MoveRequest>,
    last_pressure: Option<[f64; 4]>,
    /// 剩余的静态力矩周期；`None` 表示力矩已切换到稳态值
    torque_ramp: Option<u32>,
    torque_limits: [i32; 4],
    overload_reported: bool,
    /// NormalOp 周期计数（用于温度检查）
    normal_ticks: u64,
    last_output: TickOutput,
}

impl<A: CanAdapter> HandStateMachine<A> {
    /// 创建状态机（初始状态为 NormalOp）
    pub fn new(adapter: A, config: &HandConfig) -> Result<Self, HandError> {
        config.validate()?;

        let link = PuckLink::new(adapter).with_address_base(config.puck_address_base);
        info!(
            "Hand controller created: address base {}, constant configuration {:?}",
            config.puck_address_base, config.constant_configuration
        );

        Ok(Self {
            link,
            queue: CommandQueue::new(),
            state: HandState::normal(),
            telemetry: HandTelemetry::default(),
            monitor: StatusMonitor::default(),
            thermal: config.thermal.map(ThermalGuard::new),
            constant_configuration: config.constant_configuration(),
            max_poll_attempts: config.max_poll_attempts,
            last_command: None,
            last_pressure: None,
            torque_ramp: None,
            torque_limits: [STATIC_TORQUE_MAX; 4],
            overload_reported: false,
            normal_ticks: 0,
            last_output: TickOutput::default(),
        })
    }

    // ========================================================================
    // 访问器
    // ========================================================================

    pub fn state(&self) -> HandState {
        self.state
    }

    pub fn telemetry(&self) -> &HandTelemetry {
        &self.telemetry
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// 可用于 `take_overloaded` 清除溢出标志
    pub fn queue_mut(&mut self) -> &mut CommandQueue {
        &mut self.queue
    }

    /// 当前下发给各 puck 的力矩上限
    pub fn torque_limits(&self) -> [i32; 4] {
        self.torque_limits
    }

    pub fn last_output(&self) -> &TickOutput {
        &self.last_output
    }

    pub fn last_command(&self) -> Option<&MoveRequest> {
        self.last_command.as_ref()
    }

    /// 过热保护是否允许保持（未启用过热保护时恒为 `true`）
    pub fn hold_allowed(&self) -> bool {
        self.thermal.as_ref().is_none_or(ThermalGuard::hold_allowed)
    }

    pub fn link(&self) -> &PuckLink<A> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut PuckLink<A> {
        &mut self.link
    }

    // ========================================================================
    // 周期入口
    // ========================================================================

    /// 执行一个控制周期
    ///
    /// 只有致命的总线错误会返回 `Err`；应答缺失只会导致遥测过期。
    /// 返回 `Err` 时本周期只执行了一部分：命令可能已出队或已展开入队，
    /// 但状态、`last_output` 不会更新，本周期的复位信号也被丢弃。
    /// 调用方应在此错误后停止循环。
    pub fn tick(&mut self, now: Instant, input: TickInput) -> Result<TickOutput, HandError> {
        if let Some(pressure) = input.pressure {
            self.last_pressure = Some(pressure);
        }

        let output = match self.state {
            HandState::InitHand {
                entered_at,
                sent,
                read_seq,
            } => self.tick_init(now, entered_at, sent, read_seq)?,
            HandState::NormalOp {
                iteration,
                read_seq,
            } => self.tick_normal(now, iteration, read_seq, &input)?,
        };
        self.last_output = output;
        Ok(output)
    }

    /// 立即进入 InitHand（丢弃未发送的命令）
    ///
    /// 读取时序保持不变，初始化结束后原样恢复。
    pub fn begin_init(&mut self, now: Instant) {
        self.queue.clear();
        self.state = HandState::InitHand {
            entered_at: now,
            sent: [false; 4],
            read_seq: self.state.read_seq(),
        };
        info!("Entering INIT_HAND");
    }

    /// 相位计数归零，读取时序沿用复位前的值
    fn enter_normal_op(&mut self, read_seq: ReadSequence) {
        self.state = HandState::NormalOp {
            iteration: 0,
            read_seq,
        };
        info!("Entering NORMAL_OP");
    }

    // ========================================================================
    // InitHand
    // ========================================================================

    fn tick_init(
        &mut self,
        now: Instant,
        entered_at: Instant,
        mut sent: [bool; 4],
        read_seq: ReadSequence,
    ) -> Result<TickOutput, HandError> {
        self.drain_telemetry()?;

        let elapsed = now.saturating_duration_since(entered_at);
        let due = INIT_SCHEDULE
            .iter()
            .find(|(puck, delay)| elapsed > *delay && !sent[puck.index()]);

        match due {
            Some(&(puck, _)) => {
                sent[puck.index()] = true;
                self.enqueue(HandCommand::Init { puck });
                self.state = HandState::InitHand {
                    entered_at,
                    sent,
                    read_seq,
                };
            },
            None if elapsed > INIT_DURATION => self.enter_normal_op(read_seq),
            None => {},
        }

        // 初始化期间每个周期只发一条命令
        if let Some(cmd) = self.queue.pop() {
            self.link.execute(&cmd)?;
        }

        let joint_positions = self.joint_positions();
        let mut status = HandStatus::empty();
        self.monitor.torque_switch(&joint_positions, &mut status);

        Ok(TickOutput {
            status,
            joint_positions,
            joint_torques: joint_torques(&self.telemetry),
        })
    }

    // ========================================================================
    // NormalOp
    // ========================================================================

    fn tick_normal(
        &mut self,
        now: Instant,
        iteration: u8,
        mut read_seq: ReadSequence,
        input: &TickInput,
    ) -> Result<TickOutput, HandError> {
        self.report_overload();
        self.drain_telemetry()?;
        let iteration = (iteration + 1) % PHASE_COUNT;

        if let Some(cmd) = input.command {
            self.expand_command(&cmd);
            read_seq = ReadSequence::BeforeCmdSend;
            self.last_command = Some(cmd);
        }

        self.advance_torque_ramp();

        let joint_positions = self.joint_positions();
        let mut status = HandStatus::empty();
        self.monitor.torque_switch(&joint_positions, &mut status);
        let stops = self.monitor.evaluate(
            &StatusInputs {
                modes: self.telemetry.pucks.map(|t| t.mode),
                joints: &joint_positions,
                read_seq,
                command: self.last_command.as_ref(),
                pressure: self.last_pressure.as_ref(),
            },
            &mut status,
        );
        for stop in stops {
            warn!("Over pressure on {:?}, stopping", stop.puck());
            self.enqueue(stop);
        }

        let output = TickOutput {
            status,
            joint_positions,
            joint_torques: joint_torques(&self.telemetry),
        };

        let read_seq = self.dispatch_phase(iteration, read_seq)?;
        self.check_thermal()?;
        self.normal_ticks += 1;
        self.state = HandState::NormalOp {
            iteration,
            read_seq,
        };

        if input.reset == Some(1) {
            self.begin_init(now);
        }
        Ok(output)
    }

    /// 运动指令展开为 17 条命令
    fn expand_command(&mut self, cmd: &MoveRequest) {
        debug!("Move request: q={:?} dq={:?} hold={}", cmd.q, cmd.dq, cmd.hold);

        self.enqueue_all(per_puck(|puck| HandCommand::MaxVel {
            puck,
            value: velocity_to_counts_per_ms(joint_to_counts(puck, cmd.dq[puck.index()])),
        }));

        self.enqueue_all(per_puck(|puck| HandCommand::MaxTorque {
            puck,
            value: STATIC_TORQUE_MAX,
        }));
        self.torque_limits = [STATIC_TORQUE_MAX; 4];
        self.torque_ramp = Some(TORQUE_RAMP_TICKS);

        let hold = cmd.hold && self.hold_allowed();
        self.enqueue(HandCommand::Hold {
            puck: Puck::Spread,
            enabled: hold,
        });

        self.enqueue_all(per_puck(|puck| HandCommand::TargetPos {
            puck,
            position: joint_to_counts(puck, cmd.q[puck.index()]) as i32,
        }));
        self.enqueue_all(per_puck(|puck| HandCommand::Move { puck }));
    }

    /// 运动开始后先用静态力矩上限，若干周期后切换到指令给出的稳态值
    fn advance_torque_ramp(&mut self) {
        match self.torque_ramp {
            Some(0) => {
                self.torque_ramp = None;
                let Some(cmd) = self.last_command else {
                    return;
                };
                let limits = cmd.max_torque.map(|t| t as i32);
                self.torque_limits = limits;
                debug!("Torque limits switched to {:?}", limits);
                self.enqueue_all(per_puck(|puck| HandCommand::MaxTorque {
                    puck,
                    value: limits[puck.index()],
                }));
            },
            Some(n) => self.torque_ramp = Some(n - 1),
            None => {},
        }
    }

    fn dispatch_phase(
        &mut self,
        iteration: u8,
        mut read_seq: ReadSequence,
    ) -> Result<ReadSequence, HandError> {
        match iteration {
            0..=3 => {
                let puck = Puck::ALL[iteration as usize];
                self.link.send_get_position(puck)?;
                self.link.send_get_status(puck)?;
                self.link.send_get_current(puck)?;
                if puck.is_spread() && read_seq == ReadSequence::CmdSend {
                    read_seq = ReadSequence::StatusRecv;
                }
            },
            _ => {
                for _ in 0..COMMANDS_PER_PHASE {
                    let Some(cmd) = self.queue.pop() else {
                        break;
                    };
                    self.link.execute(&cmd)?;
                    if cmd == (HandCommand::Move { puck: Puck::Spread })
                        && read_seq == ReadSequence::BeforeCmdSend
                    {
                        read_seq = ReadSequence::CmdSend;
                    }
                }
            },
        }
        Ok(read_seq)
    }

    /// 周期性温度检查：先用上一轮的读数更新保持许可，再发出新一轮请求
    fn check_thermal(&mut self) -> Result<(), HandError> {
        let Some(guard) = self.thermal.as_mut() else {
            return Ok(());
        };
        if !guard.is_check_tick(self.normal_ticks) {
            return Ok(());
        }

        if guard.update(self.telemetry.pucks.iter()).is_some() {
            let hold_requested = self.last_command.is_some_and(|c| c.hold);
            let enabled = hold_requested && self.hold_allowed();
            self.enqueue(HandCommand::Hold {
                puck: Puck::Spread,
                enabled,
            });
        }

        for puck in Puck::ALL {
            self.link.send_get_temperature(puck)?;
            self.link.send_get_therm(puck)?;
        }
        Ok(())
    }

    // ========================================================================
    // 内部工具
    // ========================================================================

    fn drain_telemetry(&mut self) -> Result<(), HandError> {
        self.telemetry.drain(&mut self.link, self.max_poll_attempts)?;
        Ok(())
    }

    fn joint_positions(&self) -> [f64; JOINT_COUNT] {
        match &self.constant_configuration {
            Some(c) => constant_joint_positions(c),
            None => kinematics::joint_positions(&self.telemetry),
        }
    }

    fn enqueue(&mut self, cmd: HandCommand) {
        if !self.queue.push(cmd) {
            debug!("Command queue full, dropped {} for {:?}", cmd.name(), cmd.puck());
        }
    }

    fn enqueue_all(&mut self, cmds: CommandBatch) {
        let total = cmds.len();
        let accepted = self.queue.extend(cmds);
        if accepted < total {
            debug!("Command queue full, dropped {} of {} commands", total - accepted, total);
        }
    }

    /// 每个溢出周期只告警一次；标志被清除后重新开始
    fn report_overload(&mut self) {
        if self.queue.was_overloaded() {
            if !self.overload_reported {
                warn!("Command queue was overloaded, newest commands dropped");
                self.overload_reported = true;
            }
        } else {
            self.overload_reported = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bhand_can::MockCanAdapter;

    fn machine() -> HandStateMachine<MockCanAdapter> {
        let (adapter, _bus) = MockCanAdapter::new();
        HandStateMachine::new(adapter, &HandConfig::default()).unwrap()
    }

    #[test]
    fn test_initial_state_is_normal_op() {
        let m = machine();
        assert_eq!(
            m.state(),
            HandState::NormalOp {
                iteration: 0,
                read_seq: ReadSequence::BeforeCmdSend
            }
        );
        assert!(m.hold_allowed());
    }

    #[test]
    fn test_command_expands_to_seventeen_commands() {
        let mut m = machine();
        let t0 = Instant::now();
        let cmd = MoveRequest {
            q: [1.0, 0.5, 0.0, std::f64::consts::PI],
            dq: [1.0, 1.0, 1.0, std::f64::consts::PI],
            max_torque: [1000.0; 4],
            hold: true,
            max_pressure: 500.0,
        };
        m.tick(t0, TickInput::with_command(cmd)).unwrap();

        // 第一个周期是相位 1，不发命令
        let queued: Vec<HandCommand> = m.queue().iter().copied().collect();
        assert_eq!(queued.len(), 17);
        assert_eq!(
            queued[0],
            HandCommand::MaxVel {
                puck: Puck::Finger1,
                value: 81
            }
        );
        assert_eq!(
            queued[3],
            HandCommand::MaxVel {
                puck: Puck::Spread,
                value: 35
            }
        );
        assert_eq!(
            queued[4],
            HandCommand::MaxTorque {
                puck: Puck::Finger1,
                value: STATIC_TORQUE_MAX
            }
        );
        assert_eq!(
            queued[8],
            HandCommand::Hold {
                puck: Puck::Spread,
                enabled: true
            }
        );
        assert_eq!(
            queued[9],
            HandCommand::TargetPos {
                puck: Puck::Finger1,
                position: 81_487
            }
        );
        assert_eq!(
            queued[12],
            HandCommand::TargetPos {
                puck: Puck::Spread,
                position: 35_840
            }
        );
        assert_eq!(queued[16], HandCommand::Move { puck: Puck::Spread });
    }

    #[test]
    fn test_reset_edge_clears_queue() {
        let mut m = machine();
        let t0 = Instant::now();
        m.tick(t0, TickInput::with_command(MoveRequest::default()))
            .unwrap();
        assert!(!m.queue().is_empty());

        m.tick(t0 + Duration::from_millis(2), TickInput::with_reset())
            .unwrap();
        assert!(m.queue().is_empty());
        assert!(m.state().is_init());

        // 非 1 的复位值不触发
        let mut m = machine();
        m.tick(
            t0,
            TickInput {
                reset: Some(0),
                ..TickInput::default()
            },
        )
        .unwrap();
        assert!(!m.state().is_init());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let (adapter, _bus) = MockCanAdapter::new();
        let config = HandConfig {
            constant_configuration: vec![0.1],
            ..HandConfig::default()
        };
        assert!(matches!(
            HandStateMachine::new(adapter, &config),
            Err(HandError::Config(_))
        ));
    }
}
