//! 急停命令
//!
//! 向手爪组地址广播 STOP，不经过控制周期。

use crate::commands::config::load_or_default;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

/// 急停命令参数
#[derive(Args, Debug)]
pub struct StopCommand {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// CAN 接口（覆盖配置）
    #[arg(short, long)]
    pub interface: Option<String>,
}

impl StopCommand {
    /// 执行急停
    #[cfg(target_os = "linux")]
    pub fn execute(&self) -> Result<()> {
        use bhand_client::HandBuilder;

        let mut config = load_or_default(self.config.as_deref())?;
        if let Some(interface) = &self.interface {
            config.interface = interface.clone();
        }

        println!("🔌 打开 CAN 接口 {}...", config.interface);
        let mut hand = HandBuilder::new().config(config).build()?;

        println!("🛑 发送急停命令...");
        hand.link_mut().stop_hand()?;

        println!("✅ 急停完成");
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    pub fn execute(&self) -> Result<()> {
        load_or_default(self.config.as_deref())?;
        anyhow::bail!("SocketCAN 只在 Linux 上可用")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_command_defaults() {
        let cmd = StopCommand {
            config: None,
            interface: None,
        };
        assert!(cmd.config.is_none());
        assert!(cmd.interface.is_none());
    }

    #[test]
    fn test_stop_command_rejects_missing_config() {
        let cmd = StopCommand {
            config: Some(PathBuf::from("/nonexistent/bhand.toml")),
            interface: Some("vcan0".to_string()),
        };
        assert!(cmd.execute().is_err());
    }
}
