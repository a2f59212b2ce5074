//! # BHand CAN Adapter Layer
//!
//! CAN 硬件抽象层。控制周期内的收发都是非阻塞的：
//! 发送即返回（fire-and-forget），接收要么返回一帧，要么返回"暂无数据"。

use thiserror::Error;

// 重新导出 bhand-protocol 中的 PuckFrame
pub use bhand_protocol::PuckFrame;

#[cfg(target_os = "linux")]
pub mod socketcan;

#[cfg(target_os = "linux")]
pub use socketcan::SocketCanAdapter;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockBus, MockCanAdapter};

/// CAN 适配层统一错误类型
#[derive(Error, Debug)]
pub enum CanError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] CanDeviceError),
    #[error("Read timeout")]
    Timeout,
    #[error("Buffer overflow")]
    BufferOverflow,
    #[error("Bus off")]
    BusOff,
    #[error("Device not started")]
    NotStarted,
}

impl CanError {
    /// 是否为致命错误（设备丢失、总线关闭等，需要上报给宿主）
    ///
    /// 超时和缓冲区满属于瞬态错误，调用方应记录后继续。
    pub fn is_fatal(&self) -> bool {
        match self {
            CanError::Timeout | CanError::BufferOverflow => false,
            CanError::Io(e) => !matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
            ),
            CanError::Device(e) => e.is_fatal(),
            CanError::BusOff | CanError::NotStarted => true,
        }
    }
}

/// 设备/后端错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanDeviceErrorKind {
    Unknown,
    NotFound,
    NoDevice,
    AccessDenied,
    Busy,
    InvalidFrame,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct CanDeviceError {
    pub kind: CanDeviceErrorKind,
    pub message: String,
}

impl CanDeviceError {
    pub fn new(kind: CanDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            CanDeviceErrorKind::NoDevice
                | CanDeviceErrorKind::AccessDenied
                | CanDeviceErrorKind::NotFound
        )
    }
}

impl From<String> for CanDeviceError {
    fn from(message: String) -> Self {
        Self::new(CanDeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for CanDeviceError {
    fn from(message: &str) -> Self {
        Self::new(CanDeviceErrorKind::Unknown, message)
    }
}

/// CAN 传输协作者
///
/// - `send`：发送即返回，不等待应答
/// - `try_receive`：立即返回，`Ok(None)` 表示暂无数据
pub trait CanAdapter {
    fn send(&mut self, frame: PuckFrame) -> Result<(), CanError>;
    fn try_receive(&mut self) -> Result<Option<PuckFrame>, CanError>;
}

impl<A: CanAdapter + ?Sized> CanAdapter for Box<A> {
    fn send(&mut self, frame: PuckFrame) -> Result<(), CanError> {
        (**self).send(frame)
    }

    fn try_receive(&mut self) -> Result<Option<PuckFrame>, CanError> {
        (**self).try_receive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors_are_not_fatal() {
        assert!(!CanError::Timeout.is_fatal());
        assert!(!CanError::BufferOverflow.is_fatal());
        let would_block = std::io::Error::from(std::io::ErrorKind::WouldBlock);
        assert!(!CanError::Io(would_block).is_fatal());
    }

    #[test]
    fn test_fatal_errors() {
        assert!(CanError::BusOff.is_fatal());
        let denied = CanDeviceError::new(CanDeviceErrorKind::AccessDenied, "permission denied");
        assert!(CanError::Device(denied).is_fatal());
        let unknown: CanDeviceError = "odd reply".into();
        assert!(!CanError::Device(unknown).is_fatal());
    }

    #[test]
    fn test_boxed_adapter_forwards() {
        let bus = MockBus::new();
        let mut adapter: Box<dyn CanAdapter> = Box::new(bus.adapter());
        adapter.send(PuckFrame::new(11, &[8])).unwrap();
        assert_eq!(bus.sent().len(), 1);
        assert!(adapter.try_receive().unwrap().is_none());
    }
}
