//! 驱动层模块
//!
//! 本模块提供 puck 级别的通讯功能，包括：
//! - 命令类型与有界命令队列
//! - 请求/轮询拆分的非阻塞应答读取（按应答地址分拣）
//! - 有界轮询原语
//! - puck 遥测缓存
//!
//! 大多数用户应该使用 `bhand-client` 提供的状态机接口。

pub mod command;
mod error;
pub mod link;
pub mod mailbox;
pub mod poll;
pub mod queue;
pub mod telemetry;

pub use command::{CommandBatch, HandCommand};
pub use error::DriverError;
pub use link::{LinkStats, PuckLink};
pub use mailbox::{ReplyKey, ReplyMailbox};
pub use poll::{DEFAULT_POLL_ATTEMPTS, poll_bounded};
pub use queue::{CommandQueue, DEFAULT_QUEUE_CAPACITY};
pub use telemetry::{HandTelemetry, PuckTelemetry};
