//! 驱动层错误类型定义

use bhand_can::CanError;
use bhand_protocol::ProtocolError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// CAN 驱动错误（仅致命错误会向上传递）
    #[error("CAN driver error: {0}")]
    Can(#[from] CanError),

    /// 协议解析错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 无效输入
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::DriverError;
    use bhand_can::CanError;
    use bhand_protocol::ProtocolError;

    #[test]
    fn test_driver_error_display() {
        let driver_error = DriverError::Can(CanError::BusOff);
        let msg = format!("{}", driver_error);
        assert!(msg.contains("Bus off"), "Can error message: {}", msg);

        let driver_error = DriverError::Protocol(ProtocolError::InvalidPuck(7));
        let msg = format!("{}", driver_error);
        assert!(msg.contains("Invalid puck id: 7"), "Protocol error message: {}", msg);

        let driver_error = DriverError::InvalidInput("empty".to_string());
        assert_eq!(format!("{}", driver_error), "Invalid input: empty");
    }

    #[test]
    fn test_driver_error_from_conversions() {
        let err: DriverError = CanError::Timeout.into();
        assert!(matches!(err, DriverError::Can(CanError::Timeout)));

        let err: DriverError = ProtocolError::InvalidPuck(9).into();
        assert!(matches!(err, DriverError::Protocol(ProtocolError::InvalidPuck(9))));
    }
}
