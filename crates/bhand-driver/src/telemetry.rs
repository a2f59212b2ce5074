//! puck 遥测缓存
//!
//! 每个量只在读到新应答时覆盖；本周期没有应答时保留上一次的值（可能已过期）。

use crate::error::DriverError;
use crate::link::PuckLink;
use crate::poll::poll_bounded;
use bhand_can::CanAdapter;
use bhand_protocol::Puck;

/// 单个 puck 的遥测
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PuckTelemetry {
    /// 电机编码器
    pub position: i32,
    /// 关节（次级）编码器
    pub secondary: i32,
    /// 工作模式原始值
    pub mode: i32,
    /// 电机电流
    pub current: i32,
    /// puck 内部温度（尚未读到时为 `None`）
    pub temperature: Option<i32>,
    /// 电机热敏电阻温度
    pub therm: Option<i32>,
}

/// 整只手的遥测
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandTelemetry {
    pub pucks: [PuckTelemetry; 4],
}

impl HandTelemetry {
    pub fn get(&self, puck: Puck) -> &PuckTelemetry {
        &self.pucks[puck.index()]
    }

    /// 读取所有已到达的应答（每个量至多 `attempts` 次）
    ///
    /// 返回本次至少更新了一个量的 puck 数。
    pub fn drain<A: CanAdapter>(
        &mut self,
        link: &mut PuckLink<A>,
        attempts: usize,
    ) -> Result<usize, DriverError> {
        let mut updated = 0;
        for puck in Puck::ALL {
            let t = &mut self.pucks[puck.index()];
            let mut fresh = false;

            if let Some((position, secondary)) = poll_bounded(attempts, || link.get_position(puck))? {
                t.position = position;
                t.secondary = secondary;
                fresh = true;
            }
            if let Some(mode) = poll_bounded(attempts, || link.get_status(puck))? {
                t.mode = mode;
                fresh = true;
            }
            if let Some(current) = poll_bounded(attempts, || link.get_current(puck))? {
                t.current = current;
                fresh = true;
            }
            if let Some(temperature) = poll_bounded(attempts, || link.get_temperature(puck))? {
                t.temperature = Some(temperature);
                fresh = true;
            }
            if let Some(therm) = poll_bounded(attempts, || link.get_therm(puck))? {
                t.therm = Some(therm);
                fresh = true;
            }

            if fresh {
                updated += 1;
            }
        }
        Ok(updated)
    }
}
