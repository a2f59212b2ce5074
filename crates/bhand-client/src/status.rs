//! 状态字与保护逻辑
//!
//! 状态字每个周期从零重新计算，不跨周期保留。

use crate::io::MoveRequest;
use crate::kinematics::{FINGER_JOINTS, JOINT_COUNT};
use bhand_driver::{CommandBatch, HandCommand};
use bhand_protocol::{Puck, PuckMode};
use bilge::prelude::*;

/// 16 位状态字
///
/// | 位 | 含义 |
/// |----|------|
/// | 0-3 | 过流（手指 1-3、张开轴） |
/// | 4-6 | 过压（手指 1-3） |
/// | 8-10 | 力矩开关（手指 1-3） |
/// | 12-15 | 空闲（手指 1-3、张开轴） |
#[bitsize(16)]
#[derive(FromBits, DebugBits, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandStatus {
    pub overcurrent1: bool,   // Bit 0
    pub overcurrent2: bool,   // Bit 1
    pub overcurrent3: bool,   // Bit 2
    pub overcurrent4: bool,   // Bit 3
    pub overpressure1: bool,  // Bit 4
    pub overpressure2: bool,  // Bit 5
    pub overpressure3: bool,  // Bit 6
    pub reserved_7: u1,       // Bit 7: 保留
    pub torque_switch1: bool, // Bit 8
    pub torque_switch2: bool, // Bit 9
    pub torque_switch3: bool, // Bit 10
    pub reserved_11: u1,      // Bit 11: 保留
    pub idle1: bool,          // Bit 12
    pub idle2: bool,          // Bit 13
    pub idle3: bool,          // Bit 14
    pub idle4: bool,          // Bit 15
}

impl HandStatus {
    /// 全部清零
    pub fn empty() -> Self {
        Self::from(0u16)
    }

    /// 原始 16 位值
    pub fn bits(self) -> u16 {
        u16::from(self)
    }

    pub fn idle_for(&self, puck: Puck) -> bool {
        match puck {
            Puck::Finger1 => self.idle1(),
            Puck::Finger2 => self.idle2(),
            Puck::Finger3 => self.idle3(),
            Puck::Spread => self.idle4(),
        }
    }

    pub fn set_idle_for(&mut self, puck: Puck, value: bool) {
        match puck {
            Puck::Finger1 => self.set_idle1(value),
            Puck::Finger2 => self.set_idle2(value),
            Puck::Finger3 => self.set_idle3(value),
            Puck::Spread => self.set_idle4(value),
        }
    }

    pub fn overcurrent_for(&self, puck: Puck) -> bool {
        match puck {
            Puck::Finger1 => self.overcurrent1(),
            Puck::Finger2 => self.overcurrent2(),
            Puck::Finger3 => self.overcurrent3(),
            Puck::Spread => self.overcurrent4(),
        }
    }

    pub fn set_overcurrent_for(&mut self, puck: Puck, value: bool) {
        match puck {
            Puck::Finger1 => self.set_overcurrent1(value),
            Puck::Finger2 => self.set_overcurrent2(value),
            Puck::Finger3 => self.set_overcurrent3(value),
            Puck::Spread => self.set_overcurrent4(value),
        }
    }

    /// 张开轴没有压力传感器，恒为 `false`
    pub fn overpressure_for(&self, puck: Puck) -> bool {
        match puck {
            Puck::Finger1 => self.overpressure1(),
            Puck::Finger2 => self.overpressure2(),
            Puck::Finger3 => self.overpressure3(),
            Puck::Spread => false,
        }
    }

    pub fn set_overpressure_for(&mut self, puck: Puck, value: bool) {
        match puck {
            Puck::Finger1 => self.set_overpressure1(value),
            Puck::Finger2 => self.set_overpressure2(value),
            Puck::Finger3 => self.set_overpressure3(value),
            Puck::Spread => {},
        }
    }

    pub fn torque_switch_for(&self, puck: Puck) -> bool {
        match puck {
            Puck::Finger1 => self.torque_switch1(),
            Puck::Finger2 => self.torque_switch2(),
            Puck::Finger3 => self.torque_switch3(),
            Puck::Spread => false,
        }
    }

    pub fn set_torque_switch_for(&mut self, puck: Puck, value: bool) {
        match puck {
            Puck::Finger1 => self.set_torque_switch1(value),
            Puck::Finger2 => self.set_torque_switch2(value),
            Puck::Finger3 => self.set_torque_switch3(value),
            Puck::Spread => {},
        }
    }
}

/// 状态读取时序
///
/// 运动指令发出后，只有等张开轴的 MOVE 发出、并且随后一轮状态请求也已发出，
/// puck 上报的 MODE 才反映新的运动，此时才允许判断空闲。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadSequence {
    /// 指令尚未发出
    #[default]
    BeforeCmdSend,
    /// 张开轴 MOVE 已发出
    CmdSend,
    /// MOVE 之后的状态请求已发出
    StatusRecv,
}

/// 每个 puck 与指令角度比较的关节下标
const COMMANDED_JOINT: [usize; 4] = [1, 4, 6, 3];

/// 状态判断所需的输入
#[derive(Debug, Clone, Copy)]
pub struct StatusInputs<'a> {
    /// 各 puck 的 MODE 原始值
    pub modes: [i32; 4],
    pub joints: &'a [f64; JOINT_COUNT],
    pub read_seq: ReadSequence,
    /// 最近一次运动指令
    pub command: Option<&'a MoveRequest>,
    /// 最近一次压力测量
    pub pressure: Option<&'a [f64; 4]>,
}

/// 状态监视器
#[derive(Debug, Clone, Copy)]
pub struct StatusMonitor {
    /// 空闲时角度误差上限（rad），超出视为过流
    pub position_tolerance: f64,
    /// 张开轴保持时视为到位的误差窗口（rad）
    pub spread_hold_window: f64,
    /// 远端/近端偏离 1:3 耦合的阈值（rad）
    pub torque_switch_tolerance: f64,
}

impl Default for StatusMonitor {
    fn default() -> Self {
        Self {
            position_tolerance: 0.03,
            spread_hold_window: 0.05,
            torque_switch_tolerance: 0.03,
        }
    }
}

impl StatusMonitor {
    /// 力矩开关检测
    pub fn torque_switch(&self, q: &[f64; JOINT_COUNT], status: &mut HandStatus) {
        for (puck, &(proximal, distal)) in Puck::FINGERS.iter().zip(FINGER_JOINTS.iter()) {
            if (q[distal] * 3.0 - q[proximal]).abs() > self.torque_switch_tolerance {
                status.set_torque_switch_for(*puck, true);
            }
        }
    }

    /// 空闲、过流与过压判断
    ///
    /// 返回需要入队的 STOP 命令（每个手指每个周期至多一条）。
    pub fn evaluate(&self, inputs: &StatusInputs<'_>, status: &mut HandStatus) -> CommandBatch {
        let status_fresh = inputs.read_seq == ReadSequence::StatusRecv;
        let hold_requested = inputs.command.is_some_and(|c| c.hold);

        for puck in Puck::ALL {
            let i = puck.index();
            let measured = inputs.joints[COMMANDED_JOINT[i]];
            let error = inputs.command.map(|c| (c.q[i] - measured).abs());

            let mut idle = inputs.modes[i] == PuckMode::Idle.value();
            if puck.is_spread() {
                idle |= hold_requested && error.is_some_and(|e| e < self.spread_hold_window);
            }
            let idle = idle && status_fresh;

            status.set_idle_for(puck, idle);
            if idle && error.is_some_and(|e| e > self.position_tolerance) {
                status.set_overcurrent_for(puck, true);
            }
        }

        let mut stops = CommandBatch::new();
        if let (Some(cmd), Some(pressure)) = (inputs.command, inputs.pressure) {
            for puck in Puck::FINGERS {
                if !status.idle_for(puck) && pressure[puck.index()] > cmd.max_pressure {
                    stops.push(HandCommand::Stop { puck });
                    status.set_overpressure_for(puck, true);
                }
            }
        }
        stops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(q: [f64; 4]) -> MoveRequest {
        MoveRequest {
            q,
            max_pressure: 500.0,
            ..MoveRequest::default()
        }
    }

    #[test]
    fn test_status_bit_layout() {
        let mut status = HandStatus::empty();
        status.set_overcurrent1(true);
        assert_eq!(status.bits(), 0x0001);

        let mut status = HandStatus::empty();
        status.set_overcurrent_for(Puck::Spread, true);
        status.set_overpressure_for(Puck::Finger1, true);
        status.set_torque_switch_for(Puck::Finger3, true);
        status.set_idle_for(Puck::Spread, true);
        assert_eq!(status.bits(), 0x0008 | 0x0010 | 0x0400 | 0x8000);

        let status = HandStatus::from(0x7000u16);
        assert!(status.idle_for(Puck::Finger1));
        assert!(status.idle_for(Puck::Finger3));
        assert!(!status.idle_for(Puck::Spread));
    }

    #[test]
    fn test_overcurrent_when_idle_and_off_target() {
        let monitor = StatusMonitor::default();
        let mut joints = [0.0; JOINT_COUNT];
        joints[1] = 0.90;
        let cmd = command([1.00, 0.0, 0.0, 0.0]);
        let inputs = StatusInputs {
            modes: [0; 4],
            joints: &joints,
            read_seq: ReadSequence::StatusRecv,
            command: Some(&cmd),
            pressure: None,
        };
        let mut status = HandStatus::empty();
        let stops = monitor.evaluate(&inputs, &mut status);
        assert!(stops.is_empty());
        assert!(status.idle1());
        assert!(status.overcurrent1());
        assert!(!status.overcurrent2());
    }

    #[test]
    fn test_no_overcurrent_within_tolerance() {
        let monitor = StatusMonitor::default();
        let mut joints = [0.0; JOINT_COUNT];
        joints[1] = 0.99;
        let cmd = command([1.00, 0.0, 0.0, 0.0]);
        let inputs = StatusInputs {
            modes: [0; 4],
            joints: &joints,
            read_seq: ReadSequence::StatusRecv,
            command: Some(&cmd),
            pressure: None,
        };
        let mut status = HandStatus::empty();
        monitor.evaluate(&inputs, &mut status);
        assert!(status.idle1());
        assert!(!status.overcurrent1());
    }

    #[test]
    fn test_not_idle_before_status_received() {
        let monitor = StatusMonitor::default();
        let joints = [0.0; JOINT_COUNT];
        let cmd = command([1.0; 4]);
        for read_seq in [ReadSequence::BeforeCmdSend, ReadSequence::CmdSend] {
            let inputs = StatusInputs {
                modes: [0; 4],
                joints: &joints,
                read_seq,
                command: Some(&cmd),
                pressure: None,
            };
            let mut status = HandStatus::empty();
            monitor.evaluate(&inputs, &mut status);
            assert_eq!(status.bits(), 0);
        }
    }

    #[test]
    fn test_spread_idle_while_holding_near_target() {
        let monitor = StatusMonitor::default();
        let mut joints = [0.0; JOINT_COUNT];
        joints[3] = 0.96;
        let cmd = MoveRequest {
            hold: true,
            ..command([0.0, 0.0, 0.0, 1.0])
        };
        let inputs = StatusInputs {
            // 张开轴仍处于 PID 保持
            modes: [5, 5, 5, PuckMode::Pid.value()],
            joints: &joints,
            read_seq: ReadSequence::StatusRecv,
            command: Some(&cmd),
            pressure: None,
        };
        let mut status = HandStatus::empty();
        monitor.evaluate(&inputs, &mut status);
        assert!(status.idle4());
        // 0.04 > 0.03
        assert!(status.overcurrent4());
        assert!(!status.idle1());
    }

    #[test]
    fn test_overpressure_stops_moving_finger_once() {
        let monitor = StatusMonitor::default();
        let joints = [0.0; JOINT_COUNT];
        let cmd = command([0.0; 4]);
        let pressure = [550.0, 400.0, 550.0, 9999.0];
        let inputs = StatusInputs {
            modes: [5, 5, 0, 5],
            joints: &joints,
            read_seq: ReadSequence::StatusRecv,
            command: Some(&cmd),
            pressure: Some(&pressure),
        };
        let mut status = HandStatus::empty();
        let stops = monitor.evaluate(&inputs, &mut status);

        // 手指 3 空闲，不做压力保护；张开轴没有压力保护
        assert_eq!(stops.as_slice(), &[HandCommand::Stop { puck: Puck::Finger1 }]);
        assert!(status.overpressure1());
        assert!(!status.overpressure2());
        assert!(!status.overpressure3());
    }

    #[test]
    fn test_torque_switch_detection() {
        let monitor = StatusMonitor::default();
        let mut q = [0.0; JOINT_COUNT];
        // 手指 1 满足 3:1 耦合
        q[1] = 0.3;
        q[2] = 0.1;
        // 手指 2 偏离
        q[4] = 0.3;
        q[5] = 0.2;
        let mut status = HandStatus::empty();
        monitor.torque_switch(&q, &mut status);
        assert!(!status.torque_switch1());
        assert!(status.torque_switch2());
        assert!(!status.torque_switch3());
    }
}
