//! 每个周期的输入与输出

use crate::kinematics::JOINT_COUNT;
use crate::status::HandStatus;

/// 运动指令（外部消息，每个周期至多一条）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveRequest {
    /// 目标关节角度 `[f1, f2, f3, spread]`（弧度）
    pub q: [f64; 4],
    /// 目标关节速度（弧度/秒）
    pub dq: [f64; 4],
    /// 稳态力矩上限
    pub max_torque: [f64; 4],
    /// 运动结束后保持张开轴位置
    pub hold: bool,
    /// 压力上限
    pub max_pressure: f64,
}

/// 单个周期的外部输入
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickInput {
    /// 新的运动指令
    pub command: Option<MoveRequest>,
    /// 复位信号（1 = 复位）
    pub reset: Option<u8>,
    /// 每个手指测得的最大压力（未提供时沿用上一次的值）
    pub pressure: Option<[f64; 4]>,
}

impl TickInput {
    /// 空输入
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn with_command(command: MoveRequest) -> Self {
        Self {
            command: Some(command),
            ..Self::default()
        }
    }

    pub fn with_reset() -> Self {
        Self {
            reset: Some(1),
            ..Self::default()
        }
    }

    pub fn with_pressure(pressure: [f64; 4]) -> Self {
        Self {
            pressure: Some(pressure),
            ..Self::default()
        }
    }
}

/// 单个周期的输出
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickOutput {
    pub status: HandStatus,
    /// 8 个关节角度
    pub joint_positions: [f64; JOINT_COUNT],
    /// 8 个关节力矩
    pub joint_torques: [f64; JOINT_COUNT],
}
