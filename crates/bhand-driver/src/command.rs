//! 命令类型定义模块
//!
//! 队列中的每条命令都是一个完整的变体：只有需要数值的命令才携带数值，
//! 无效的（类型, 数值）组合无法构造。

use bhand_protocol::Puck;
use smallvec::SmallVec;

/// 单条待发送命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandCommand {
    /// 最大速度（cts/ms）
    MaxVel { puck: Puck, value: i32 },
    /// 运动结束后是否保持位置
    Hold { puck: Puck, enabled: bool },
    /// 复位
    Reset { puck: Puck },
    /// 回零初始化
    Init { puck: Puck },
    /// 最大力矩
    MaxTorque { puck: Puck, value: i32 },
    /// 目标位置（编码器计数）
    TargetPos { puck: Puck, position: i32 },
    /// 停止
    Stop { puck: Puck },
    /// 启动梯形运动
    Move { puck: Puck },
}

impl HandCommand {
    /// 目标 puck
    pub fn puck(&self) -> Puck {
        match *self {
            HandCommand::MaxVel { puck, .. }
            | HandCommand::Hold { puck, .. }
            | HandCommand::Reset { puck }
            | HandCommand::Init { puck }
            | HandCommand::MaxTorque { puck, .. }
            | HandCommand::TargetPos { puck, .. }
            | HandCommand::Stop { puck }
            | HandCommand::Move { puck } => puck,
        }
    }

    /// 命令名称（用于日志）
    pub fn name(&self) -> &'static str {
        match self {
            HandCommand::MaxVel { .. } => "MaxVel",
            HandCommand::Hold { .. } => "Hold",
            HandCommand::Reset { .. } => "Reset",
            HandCommand::Init { .. } => "Init",
            HandCommand::MaxTorque { .. } => "MaxTorque",
            HandCommand::TargetPos { .. } => "TargetPos",
            HandCommand::Stop { .. } => "Stop",
            HandCommand::Move { .. } => "Move",
        }
    }
}

/// 一组命令（每个 puck 一条时不会分配堆内存）
pub type CommandBatch = SmallVec<[HandCommand; 4]>;

/// 对每个 puck 生成一条命令
///
/// ```rust
/// use bhand_driver::command::{HandCommand, per_puck};
///
/// let batch = per_puck(|puck| HandCommand::Move { puck });
/// assert_eq!(batch.len(), 4);
/// ```
pub fn per_puck(f: impl FnMut(Puck) -> HandCommand) -> CommandBatch {
    Puck::ALL.into_iter().map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_puck() {
        let cmd = HandCommand::TargetPos {
            puck: Puck::Finger2,
            position: 1000,
        };
        assert_eq!(cmd.puck(), Puck::Finger2);
        assert_eq!(cmd.name(), "TargetPos");
        assert_eq!(HandCommand::Stop { puck: Puck::Spread }.puck(), Puck::Spread);
    }

    #[test]
    fn test_per_puck_order() {
        let batch = per_puck(|puck| HandCommand::MaxTorque { puck, value: 4700 });
        assert!(!batch.spilled());
        let pucks: Vec<Puck> = batch.iter().map(|c| c.puck()).collect();
        assert_eq!(pucks, Puck::ALL.to_vec());
    }
}
