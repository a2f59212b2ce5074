//! SocketCAN CAN 适配器实现
//!
//! Linux 下直接使用内核 SocketCAN 接口。socket 以非阻塞方式打开，
//! 控制周期内的发送与接收都不会挂起调用线程。
//!
//! ## 限制
//!
//! - **仅限 Linux 平台**
//! - **接口配置**：波特率由系统工具（`ip link`）设置，应用层不做配置
//! - **权限要求**：可能需要 `dialout` 组权限或 `sudo`

use crate::{CanAdapter, CanDeviceError, CanDeviceErrorKind, CanError, PuckFrame};
use socketcan::{CanFrame, CanSocket, EmbeddedFrame, Frame, Socket, StandardId};
use std::io::ErrorKind;
use std::os::unix::io::AsRawFd;
use tracing::{trace, warn};

/// SocketCAN 适配器
///
/// # 示例
///
/// ```no_run
/// use bhand_can::{CanAdapter, PuckFrame, SocketCanAdapter};
///
/// let mut adapter = SocketCanAdapter::new("can0").unwrap();
/// adapter.send(PuckFrame::new(11, &[8])).unwrap();
/// while let Some(frame) = adapter.try_receive().unwrap() {
///     println!("{:?}", frame);
/// }
/// ```
#[derive(Debug)]
pub struct SocketCanAdapter {
    socket: CanSocket,
    /// 接口名称（如 "can0"）
    interface: String,
}

impl SocketCanAdapter {
    /// 打开 CAN 接口
    ///
    /// # 错误
    /// - `CanError::Device`: 接口不存在或无法打开
    /// - `CanError::Io`: 设置非阻塞模式失败
    pub fn new(interface: impl Into<String>) -> Result<Self, CanError> {
        let interface = interface.into();

        let socket = CanSocket::open(&interface).map_err(|e| {
            let kind = match e.kind() {
                ErrorKind::NotFound => CanDeviceErrorKind::NotFound,
                ErrorKind::PermissionDenied => CanDeviceErrorKind::AccessDenied,
                _ => CanDeviceErrorKind::Backend,
            };
            CanError::Device(CanDeviceError::new(
                kind,
                format!("Failed to open CAN interface '{}': {}", interface, e),
            ))
        })?;

        // 关闭回环：自己发出的请求帧不应出现在接收队列里
        let loopback_enabled: libc::c_int = 0;
        let loopback_result = unsafe {
            libc::setsockopt(
                socket.as_raw_fd(),
                libc::SOL_CAN_RAW,
                libc::CAN_RAW_LOOPBACK,
                &loopback_enabled as *const _ as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if loopback_result < 0 {
            warn!(
                "Failed to disable CAN_RAW_LOOPBACK on '{}': {}",
                interface,
                std::io::Error::last_os_error()
            );
        }

        socket.set_nonblocking(true)?;

        trace!("SocketCAN interface '{}' opened (non-blocking)", interface);
        Ok(Self { socket, interface })
    }

    /// 接口名称
    pub fn interface(&self) -> &str {
        &self.interface
    }
}

impl CanAdapter for SocketCanAdapter {
    /// 发送帧（Fire-and-Forget）
    ///
    /// 内核发送缓冲区满时返回 `CanError::BufferOverflow`（瞬态错误）。
    fn send(&mut self, frame: PuckFrame) -> Result<(), CanError> {
        let can_frame = StandardId::new(frame.id as u16)
            .and_then(|id| CanFrame::new(id, frame.data_slice()))
            .ok_or_else(|| {
                CanError::Device(CanDeviceError::new(
                    CanDeviceErrorKind::InvalidFrame,
                    format!("Failed to create standard frame with ID 0x{:X}", frame.id),
                ))
            })?;

        match self.socket.write_frame(&can_frame) {
            Ok(()) => {
                trace!("Sent CAN frame: ID=0x{:X}, len={}", frame.id, frame.len);
                Ok(())
            },
            Err(e) if e.kind() == ErrorKind::WouldBlock => Err(CanError::BufferOverflow),
            Err(e) if e.raw_os_error() == Some(libc::ENETDOWN) => Err(CanError::BusOff),
            Err(e) => Err(CanError::Io(e)),
        }
    }

    /// 非阻塞接收
    ///
    /// 错误帧与远程帧直接丢弃，继续读取下一帧。
    fn try_receive(&mut self) -> Result<Option<PuckFrame>, CanError> {
        loop {
            let can_frame = match self.socket.read_frame() {
                Ok(frame) => frame,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(None),
                Err(e) => return Err(CanError::Io(e)),
            };

            match can_frame {
                CanFrame::Data(_) => {
                    let frame = PuckFrame::new(can_frame.raw_id(), can_frame.data());
                    trace!("Received CAN frame: ID=0x{:X}, len={}", frame.id, frame.len);
                    return Ok(Some(frame));
                },
                CanFrame::Error(_) => {
                    warn!("Dropped CAN error frame on '{}'", self.interface);
                },
                CanFrame::Remote(_) => {
                    trace!("Ignored CAN remote frame: ID=0x{:X}", can_frame.raw_id());
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 检查 vcan0 是否可用（CI 环境中通常没有）
    fn vcan_available() -> bool {
        std::path::Path::new("/sys/class/net/vcan0").exists()
    }

    #[test]
    fn test_socketcan_adapter_new_invalid_interface() {
        let result = SocketCanAdapter::new("bhand_no_such_if0");
        assert!(matches!(result, Err(CanError::Device(_))));
    }

    #[test]
    fn test_socketcan_adapter_try_receive_empty() {
        if !vcan_available() {
            return;
        }
        let mut adapter = SocketCanAdapter::new("vcan0").unwrap();
        assert_eq!(adapter.interface(), "vcan0");
        // 回环已关闭：自己发出的帧不会被读到
        adapter.send(PuckFrame::new(11, &[8])).unwrap();
        assert!(adapter.try_receive().unwrap().is_none());
    }
}
