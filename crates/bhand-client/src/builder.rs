//! Builder 模式实现
//!
//! 提供链式构造 `HandStateMachine` 的便捷方式。

use crate::config::HandConfig;
use crate::error::HandError;
use crate::machine::HandStateMachine;
use bhand_can::CanAdapter;
#[cfg(target_os = "linux")]
use bhand_can::SocketCanAdapter;

/// 手爪 Builder
///
/// # Example
///
/// ```no_run
/// use bhand_client::HandBuilder;
///
/// let hand = HandBuilder::new()
///     .interface("can0")
///     .address_base(11)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct HandBuilder {
    config: HandConfig,
}

impl HandBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用完整配置
    pub fn config(mut self, config: HandConfig) -> Self {
        self.config = config;
        self
    }

    /// 设置 CAN 接口名称
    pub fn interface(mut self, interface: impl Into<String>) -> Self {
        self.config.interface = interface.into();
        self
    }

    /// 设置 puck 单播地址基数
    pub fn address_base(mut self, base: u32) -> Self {
        self.config.puck_address_base = base;
        self
    }

    /// 设置固定关节配置（未连接实物时使用）
    pub fn constant_configuration(mut self, configuration: [f64; 4]) -> Self {
        self.config.constant_configuration = configuration.to_vec();
        self
    }

    pub fn config_ref(&self) -> &HandConfig {
        &self.config
    }

    /// 使用给定的适配器构建
    pub fn build_with_adapter<A: CanAdapter>(self, adapter: A) -> Result<HandStateMachine<A>, HandError> {
        HandStateMachine::new(adapter, &self.config)
    }

    /// 打开 SocketCAN 接口并构建
    ///
    /// # Errors
    /// - `HandError::Config`: 配置无效
    /// - `HandError::Driver`: CAN 接口打开失败
    #[cfg(target_os = "linux")]
    pub fn build(self) -> Result<HandStateMachine<SocketCanAdapter>, HandError> {
        self.config.validate()?;
        let adapter = SocketCanAdapter::new(&self.config.interface)?;
        self.build_with_adapter(adapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bhand_can::{MockCanAdapter, PuckFrame};
    use bhand_protocol::Puck;

    #[test]
    fn test_builder_applies_address_base() {
        let (adapter, bus) = MockCanAdapter::new();
        let mut hand = HandBuilder::new()
            .address_base(20)
            .build_with_adapter(adapter)
            .unwrap();
        hand.link_mut().stop_finger(Puck::Finger1).unwrap();
        assert_eq!(bus.sent()[0].id, 20);

        // 应答地址随基数变化
        bus.inject(PuckFrame::new(0x400 | (21 << 5) | 6, &[0x88, 0, 2]));
        assert_eq!(hand.link_mut().get_status(Puck::Finger2).unwrap(), Some(2));
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let (adapter, _bus) = MockCanAdapter::new();
        let result = HandBuilder::new().interface("").build_with_adapter(adapter);
        assert!(matches!(result, Err(HandError::Config(_))));
    }
}
