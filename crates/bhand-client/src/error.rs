//! 客户端错误类型

use bhand_can::CanError;
use bhand_driver::DriverError;
use thiserror::Error;

/// 客户端错误类型
#[derive(Error, Debug)]
pub enum HandError {
    /// 驱动层错误（致命的总线错误）
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// 配置无效
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// 配置文件解析失败
    #[error("Failed to parse configuration: {0}")]
    ParseConfig(#[from] toml::de::Error),

    /// 配置文件读取失败
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CanError> for HandError {
    fn from(err: CanError) -> Self {
        HandError::Driver(DriverError::Can(err))
    }
}
