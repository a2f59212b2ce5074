//! 配置管理命令
//!
//! 控制器配置使用 TOML 文件，字段见 `bhand_client::HandConfig`。

use anyhow::{Context, Result};
use bhand_client::HandConfig;
use clap::Subcommand;
use std::fs;
use std::path::{Path, PathBuf};

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 打印配置（未指定文件时打印默认配置）
    Show {
        /// 配置文件路径
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// 写出默认配置文件
    Init {
        /// 输出路径
        path: PathBuf,

        /// 覆盖已存在的文件
        #[arg(short, long)]
        force: bool,
    },

    /// 检查配置文件
    Check {
        /// 配置文件路径
        path: PathBuf,
    },
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Show { path } => Self::show_(path.as_deref()),
            ConfigCommand::Init { path, force } => Self::init_(&path, force),
            ConfigCommand::Check { path } => Self::check_(&path),
        }
    }

    fn show_(path: Option<&Path>) -> Result<()> {
        let config = load_or_default(path)?;
        print!("{}", config.to_toml_string()?);
        Ok(())
    }

    fn init_(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            anyhow::bail!("{} 已存在（使用 --force 覆盖）", path.display());
        }
        let content = HandConfig::default().to_toml_string()?;
        fs::write(path, content).with_context(|| format!("写入 {} 失败", path.display()))?;
        println!("✅ 已写出默认配置: {}", path.display());
        Ok(())
    }

    fn check_(path: &Path) -> Result<()> {
        let config = HandConfig::load(path)
            .with_context(|| format!("配置文件 {} 无效", path.display()))?;

        println!("配置文件: {}", path.display());
        println!("  接口: {}", config.interface);
        println!("  地址基数: {}", config.puck_address_base);
        println!("  周期: {:?}", config.tick_period());
        println!("  轮询上限: {}", config.max_poll_attempts);
        match config.constant_configuration() {
            Some(c) => println!("  固定关节配置: {:?}", c),
            None => println!("  固定关节配置: (未设置)"),
        }
        match config.thermal {
            Some(t) => println!(
                "  过热保护: 每 {} 周期, 上限 {} °C, 恢复 {} °C",
                t.check_period_ticks, t.temp_max_hi, t.temp_max_lo
            ),
            None => println!("  过热保护: (关闭)"),
        }
        println!("✅ 配置有效");
        Ok(())
    }
}

/// 加载配置文件；未指定路径时使用默认配置
pub fn load_or_default(path: Option<&Path>) -> Result<HandConfig> {
    match path {
        Some(path) => HandConfig::load(path)
            .with_context(|| format!("加载配置文件 {} 失败", path.display())),
        None => Ok(HandConfig::default()),
    }
}
