//! 手爪配置
//!
//! TOML 格式，所有字段都有默认值：
//!
//! ```toml
//! interface = "can0"
//! puck_address_base = 11
//! tick_period_us = 2000
//! max_poll_attempts = 20
//! # 未连接实物时使用的固定关节配置（4 个元素），为空表示读取编码器
//! constant_configuration = []
//!
//! [thermal]
//! check_period_ticks = 100
//! temp_max_hi = 65
//! temp_max_lo = 60
//! ```

use crate::error::HandError;
use bhand_driver::DEFAULT_POLL_ATTEMPTS;
use bhand_protocol::ids::DEFAULT_PUCK_ADDRESS_BASE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 手爪配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandConfig {
    /// CAN 接口名称
    pub interface: String,
    /// puck 单播地址基数
    pub puck_address_base: u32,
    /// 控制周期（微秒）
    pub tick_period_us: u64,
    /// 每个量每个周期的最大读取次数
    pub max_poll_attempts: usize,
    /// 固定关节配置（长度 0 或 4）
    pub constant_configuration: Vec<f64>,
    /// 过热保护（不配置则关闭）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thermal: Option<ThermalConfig>,
}

impl Default for HandConfig {
    fn default() -> Self {
        Self {
            interface: "can0".to_string(),
            puck_address_base: DEFAULT_PUCK_ADDRESS_BASE,
            tick_period_us: 2000,
            max_poll_attempts: DEFAULT_POLL_ATTEMPTS,
            constant_configuration: Vec::new(),
            thermal: None,
        }
    }
}

/// 过热保护配置（单位：°C）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalConfig {
    /// 每隔多少个周期检查一次温度
    pub check_period_ticks: u32,
    /// 任一温度超过此值时关闭保持
    pub temp_max_hi: i32,
    /// 全部温度低于此值时恢复保持
    pub temp_max_lo: i32,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            check_period_ticks: 100,
            temp_max_hi: 65,
            temp_max_lo: 60,
        }
    }
}

impl HandConfig {
    /// 解析并校验 TOML 配置
    pub fn from_toml_str(s: &str) -> Result<Self, HandError> {
        let config: HandConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载配置
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, HandError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String, HandError> {
        toml::to_string_pretty(self).map_err(|e| HandError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), HandError> {
        if self.interface.is_empty() {
            return Err(HandError::Config("interface must not be empty".into()));
        }
        // 组地址的 from 字段只有 5 位
        if self.puck_address_base > 28 {
            return Err(HandError::Config(format!(
                "puck_address_base must be at most 28, got {}",
                self.puck_address_base
            )));
        }
        if self.tick_period_us == 0 {
            return Err(HandError::Config("tick_period_us must be non-zero".into()));
        }
        if self.max_poll_attempts == 0 {
            return Err(HandError::Config("max_poll_attempts must be non-zero".into()));
        }
        if !matches!(self.constant_configuration.len(), 0 | 4) {
            return Err(HandError::Config(format!(
                "constant_configuration must have 0 or 4 elements, got {}",
                self.constant_configuration.len()
            )));
        }
        if let Some(thermal) = &self.thermal {
            if thermal.check_period_ticks == 0 {
                return Err(HandError::Config(
                    "thermal.check_period_ticks must be non-zero".into(),
                ));
            }
            if thermal.temp_max_lo > thermal.temp_max_hi {
                return Err(HandError::Config(format!(
                    "thermal.temp_max_lo ({}) exceeds temp_max_hi ({})",
                    thermal.temp_max_lo, thermal.temp_max_hi
                )));
            }
        }
        Ok(())
    }

    /// 固定关节配置（未配置时为 `None`）
    pub fn constant_configuration(&self) -> Option<[f64; 4]> {
        <[f64; 4]>::try_from(self.constant_configuration.as_slice()).ok()
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_micros(self.tick_period_us)
    }
}
