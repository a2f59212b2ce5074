//! 命令定义和实现

pub mod config;
pub mod decode;
pub mod run;
pub mod stop;

pub use config::ConfigCommand;
pub use decode::DecodeCommand;
pub use run::RunCommand;
pub use stop::StopCommand;
