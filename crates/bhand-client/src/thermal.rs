//! 过热保护
//!
//! 张开轴保持位置时电机持续通电。任一 puck 温度超过上限时禁止保持，
//! 全部回落到下限以下后再恢复（滞回）。

use crate::config::ThermalConfig;
use bhand_driver::PuckTelemetry;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
pub struct ThermalGuard {
    config: ThermalConfig,
    hold_allowed: bool,
}

impl ThermalGuard {
    pub fn new(config: ThermalConfig) -> Self {
        Self {
            config,
            hold_allowed: true,
        }
    }

    pub fn config(&self) -> &ThermalConfig {
        &self.config
    }

    /// 当前是否允许保持
    pub fn hold_allowed(&self) -> bool {
        self.hold_allowed
    }

    /// 第 `tick` 个周期是否需要检查温度
    pub fn is_check_tick(&self, tick: u64) -> bool {
        tick % u64::from(self.config.check_period_ticks) == 0
    }

    /// 根据最新读数更新保持许可
    ///
    /// 许可发生变化时返回新值；没有任何读数时不做判断。
    pub fn update<'a>(&mut self, pucks: impl IntoIterator<Item = &'a PuckTelemetry>) -> Option<bool> {
        let mut any_reading = false;
        let mut one_too_high = false;
        let mut all_ok = true;

        for t in pucks {
            for reading in [t.temperature, t.therm].into_iter().flatten() {
                any_reading = true;
                if reading > self.config.temp_max_hi {
                    one_too_high = true;
                } else if reading >= self.config.temp_max_lo {
                    all_ok = false;
                }
            }
        }

        if !any_reading {
            return None;
        }

        if self.hold_allowed && one_too_high {
            self.hold_allowed = false;
            warn!("Puck over temperature (> {} C), hold disabled", self.config.temp_max_hi);
            Some(false)
        } else if !self.hold_allowed && !one_too_high && all_ok {
            self.hold_allowed = true;
            info!("Puck temperatures below {} C, hold re-enabled", self.config.temp_max_lo);
            Some(true)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings(temps: [i32; 4]) -> [PuckTelemetry; 4] {
        temps.map(|t| PuckTelemetry {
            temperature: Some(t),
            therm: Some(t - 5),
            ..PuckTelemetry::default()
        })
    }

    #[test]
    fn test_hysteresis() {
        let mut guard = ThermalGuard::new(ThermalConfig::default());
        assert!(guard.hold_allowed());

        assert_eq!(guard.update(&readings([40, 50, 64, 30])), None);
        assert_eq!(guard.update(&readings([40, 66, 50, 30])), Some(false));
        assert!(!guard.hold_allowed());

        // 62 仍处于滞回区间
        assert_eq!(guard.update(&readings([40, 62, 50, 30])), None);
        assert!(!guard.hold_allowed());

        assert_eq!(guard.update(&readings([40, 59, 50, 30])), Some(true));
        assert!(guard.hold_allowed());
    }

    #[test]
    fn test_no_readings_no_decision() {
        let mut guard = ThermalGuard::new(ThermalConfig::default());
        let empty = [PuckTelemetry::default(); 4];
        assert_eq!(guard.update(&empty), None);
        assert!(guard.hold_allowed());
    }

    #[test]
    fn test_check_period() {
        let guard = ThermalGuard::new(ThermalConfig {
            check_period_ticks: 100,
            ..ThermalConfig::default()
        });
        assert!(guard.is_check_tick(0));
        assert!(!guard.is_check_tick(1));
        assert!(guard.is_check_tick(200));
    }
}
