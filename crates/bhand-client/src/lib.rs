//! # BHand Client
//!
//! Barrett 手爪的周期控制核心：
//!
//! - [`HandStateMachine`]: InitHand / NormalOp 状态机，每个周期调用一次 `tick`
//! - [`StatusMonitor`]: 空闲、过流、过压、力矩开关判断
//! - [`kinematics`]: 编码器与电流到关节角度/力矩的换算
//! - [`HandConfig`]: TOML 配置
//!
//! # 示例
//!
//! ```no_run
//! use bhand_client::{HandBuilder, TickInput};
//! use std::time::Instant;
//!
//! let mut hand = HandBuilder::new().interface("can0").build()?;
//! let output = hand.tick(Instant::now(), TickInput::idle())?;
//! println!("status = {:#06x}", output.status.bits());
//! # Ok::<(), bhand_client::HandError>(())
//! ```

mod builder;
pub mod config;
mod error;
pub mod io;
pub mod kinematics;
pub mod machine;
pub mod status;
pub mod thermal;

pub use builder::HandBuilder;
pub use config::{HandConfig, ThermalConfig};
pub use error::HandError;
pub use io::{MoveRequest, TickInput, TickOutput};
pub use machine::{HandState, HandStateMachine};
pub use status::{HandStatus, ReadSequence, StatusMonitor};
pub use thermal::ThermalGuard;

// 重新导出下层常用类型
pub use bhand_driver::{CommandQueue, HandCommand, HandTelemetry, PuckTelemetry};
pub use bhand_protocol::Puck;
