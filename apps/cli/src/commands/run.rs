//! 控制周期命令
//!
//! 以配置的周期驱动 `HandStateMachine`：可选先执行初始化，初始化完成后
//! 发送一次运动指令，之后持续轮询直到 Ctrl+C 或达到时长。

use crate::commands::config::load_or_default;
use crate::validation::JointValidator;
use anyhow::{Context, Result};
use bhand_can::CanAdapter;
use bhand_client::{HandStateMachine, MoveRequest, TickInput};
use clap::Args;
use spin_sleep::SpinSleeper;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// 控制周期参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// CAN 接口（覆盖配置）
    #[arg(short, long)]
    pub interface: Option<String>,

    /// 启动时先执行初始化（回零）
    #[arg(long)]
    pub init: bool,

    /// 目标关节角度 F1,F2,F3,Spread（弧度）
    #[arg(short, long, value_delimiter = ',')]
    pub joints: Option<Vec<f64>>,

    /// 关节速度（弧度/秒），所有关节相同
    #[arg(long, default_value_t = 1.0)]
    pub velocity: f64,

    /// 稳态力矩上限，所有 puck 相同
    #[arg(long, default_value_t = 1000.0)]
    pub max_torque: f64,

    /// 压力上限
    #[arg(long, default_value_t = 1000.0)]
    pub max_pressure: f64,

    /// 运动结束后保持张开轴位置
    #[arg(long)]
    pub hold: bool,

    /// 运行时长（秒），0 表示直到 Ctrl+C
    #[arg(short, long, default_value_t = 0)]
    pub duration: u64,

    /// 每隔多少个周期打印一次状态
    #[arg(long, default_value_t = 500)]
    pub report_every: u64,
}

/// 一次运行的计划
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub init: bool,
    pub request: Option<MoveRequest>,
    pub max_ticks: Option<u64>,
    pub report_every: u64,
}

/// 运行统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    /// 周期超时次数
    pub overruns: u64,
    /// 命令队列溢出次数
    pub overloads: u64,
    pub last_status: u16,
}

impl RunCommand {
    pub fn execute(&self) -> Result<()> {
        let mut config = load_or_default(self.config.as_deref())?;
        if let Some(interface) = &self.interface {
            config.interface = interface.clone();
        }
        let period = config.tick_period();
        let plan = self.plan(period)?;

        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();
        ctrlc::set_handler(move || {
            eprintln!("\n收到退出信号，正在停止...");
            r.store(false, Ordering::SeqCst);
        })
        .context("注册 Ctrl+C 处理器失败")?;

        println!("🔌 打开 CAN 接口 {}...", config.interface);
        let mut hand = open_hand(config)?;
        println!("✅ 已连接，周期 {:?}，按 Ctrl+C 停止", period);

        let result = drive(&mut hand, &plan, period, &running);

        // 无论循环如何结束都尝试停住手爪
        if let Err(e) = hand.link_mut().stop_hand() {
            warn!("Failed to stop hand on exit: {}", e);
        }

        let summary = result?;
        println!(
            "✅ 运行结束: {} 周期, 超时 {} 次, 队列溢出 {} 次, 最后状态 {:#06x}",
            summary.ticks, summary.overruns, summary.overloads, summary.last_status
        );
        Ok(())
    }

    fn plan(&self, period: Duration) -> Result<RunPlan> {
        let request = match &self.joints {
            Some(joints) => {
                let q = JointValidator::default_range().validate(joints)?;
                Some(MoveRequest {
                    q,
                    dq: [self.velocity; 4],
                    max_torque: [self.max_torque; 4],
                    hold: self.hold,
                    max_pressure: self.max_pressure,
                })
            },
            None => None,
        };

        let max_ticks = (self.duration > 0).then(|| {
            let ticks = Duration::from_secs(self.duration).as_micros() / period.as_micros().max(1);
            ticks as u64
        });

        Ok(RunPlan {
            init: self.init,
            request,
            max_ticks,
            report_every: self.report_every.max(1),
        })
    }
}

#[cfg(target_os = "linux")]
fn open_hand(
    config: bhand_client::HandConfig,
) -> Result<HandStateMachine<bhand_can::SocketCanAdapter>> {
    Ok(bhand_client::HandBuilder::new().config(config).build()?)
}

#[cfg(not(target_os = "linux"))]
fn open_hand(
    _config: bhand_client::HandConfig,
) -> Result<HandStateMachine<Box<dyn CanAdapter + Send>>> {
    anyhow::bail!("SocketCAN 只在 Linux 上可用")
}

/// 驱动控制周期直到 `running` 被清除或达到 `plan.max_ticks`
///
/// 每个周期睡眠到下一个锚点；超时时重置锚点，不做追赶。
pub fn drive<A: CanAdapter>(
    hand: &mut HandStateMachine<A>,
    plan: &RunPlan,
    period: Duration,
    running: &AtomicBool,
) -> Result<RunSummary> {
    let sleeper = SpinSleeper::default();
    let mut summary = RunSummary::default();
    let mut pending_reset = plan.init;
    let mut pending_move = plan.request;
    let mut next_tick = Instant::now();

    while running.load(Ordering::SeqCst) {
        if plan.max_ticks.is_some_and(|max| summary.ticks >= max) {
            break;
        }

        let now = Instant::now();
        let mut input = TickInput::idle();
        if pending_reset {
            input.reset = Some(1);
            pending_reset = false;
        } else if !hand.state().is_init()
            && let Some(request) = pending_move.take()
        {
            info!("Sending move request q={:?}", request.q);
            input.command = Some(request);
        }

        let output = hand.tick(now, input)?;
        summary.ticks += 1;

        let status = output.status.bits();
        if status != summary.last_status {
            info!("Status changed: {:#06x} -> {:#06x}", summary.last_status, status);
            summary.last_status = status;
        }
        if hand.queue_mut().take_overloaded() {
            summary.overloads += 1;
        }
        if summary.ticks % plan.report_every == 0 {
            info!(
                "tick {} state {:?} q={:.3?}",
                summary.ticks,
                hand.state(),
                output.joint_positions
            );
        }

        next_tick += period;
        let now = Instant::now();
        if next_tick > now {
            sleeper.sleep(next_tick - now);
        } else {
            summary.overruns += 1;
            next_tick = now;
        }
    }
    Ok(summary)
}
