//! # BHand CLI
//!
//! Barrett 手爪命令行工具。
//!
//! ```bash
//! # 打印默认配置
//! bhand-cli config show
//!
//! # 初始化后张开到给定角度并保持运行，Ctrl+C 退出
//! bhand-cli run --interface can0 --init --joints 1.0,1.0,1.0,0.0
//!
//! # 解析一帧总线数据
//! bhand-cli decode 0x566 88000500
//!
//! # 整手急停
//! bhand-cli stop --interface can0
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod validation;

use commands::{ConfigCommand, DecodeCommand, RunCommand, StopCommand};

/// BHand CLI - 手爪命令行工具
#[derive(Parser, Debug)]
#[command(name = "bhand-cli")]
#[command(about = "Command-line interface for Barrett hand control", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 运行控制周期
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 解析一帧 CAN 数据
    Decode {
        #[command(flatten)]
        args: DecodeCommand,
    },

    /// 急停
    Stop {
        #[command(flatten)]
        args: StopCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bhand_cli=info".parse()?)
                .add_directive("bhand_client=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(),
        Commands::Run { args } => args.execute(),
        Commands::Decode { args } => args.execute(),
        Commands::Stop { args } => args.execute(),
    }
}
