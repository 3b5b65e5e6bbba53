//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use crate::device::{DeviceState, Operation};
use thiserror::Error;

/// The primary error type for the device lifecycle library.
/// 设备生命周期库的主要错误类型。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The operation is not valid for the state the device is currently in.
    /// 当前设备状态下该操作无效。
    #[error("cannot {operation} while device is {state}")]
    InvalidState {
        operation: Operation,
        state: DeviceState,
    },

    /// The operation requires a powered device but the device is off.
    /// 该操作需要设备通电，但设备处于关闭状态。
    #[error("cannot {operation}: device is not powered on")]
    NotPowered { operation: Operation },

    /// Every connection attempt allowed by the retry policy failed.
    /// 重试策略允许的所有连接尝试均已失败。
    #[error("connection activation failed after {attempts} attempts")]
    ActivationFailed { attempts: u32 },

    /// Every transmit attempt allowed by the retry policy was rejected by the link.
    /// 重试策略允许的所有发送尝试均被链路拒绝。
    #[error("link rejected transmission after {attempts} attempts")]
    TransmitRejected { attempts: u32 },

    /// A transmission could not be completed. The source names the stage that failed.
    /// 发送无法完成，source 指明失败的阶段。
    #[error("transmission failed: {source}")]
    TransmissionFailed {
        #[source]
        source: Box<Error>,
    },

    /// The caller-supplied deadline elapsed before the operation could finish.
    /// 调用方提供的截止时间在操作完成前已到期。
    #[error("{operation} gave up at deadline after {attempts} attempts")]
    DeadlineExceeded { operation: Operation, attempts: u32 },

    /// No session is registered under the given device id.
    /// 没有以该设备ID注册的会话。
    #[error("unknown device: {0}")]
    UnknownDevice(String),

    /// A session is already registered under the given device id.
    /// 该设备ID已注册了会话。
    #[error("device already registered: {0}")]
    DuplicateDevice(String),
}

impl Error {
    /// Wraps an error raised while preparing or performing a transmission.
    pub(crate) fn transmission(source: Error) -> Self {
        Self::TransmissionFailed {
            source: Box::new(source),
        }
    }

    /// Whether the failure came from the network rather than from call sequencing.
    ///
    /// 失败是否来自网络而非调用顺序错误。
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ActivationFailed { .. }
            | Self::TransmitRejected { .. }
            | Self::DeadlineExceeded { .. } => true,
            Self::TransmissionFailed { source } => source.is_retryable(),
            Self::InvalidState { .. }
            | Self::NotPowered { .. }
            | Self::UnknownDevice(_)
            | Self::DuplicateDevice(_) => false,
        }
    }
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_operation_and_state() {
        let err = Error::InvalidState {
            operation: Operation::Register,
            state: DeviceState::Connected,
        };
        assert_eq!(err.to_string(), "cannot register while device is CONNECTED");

        let err = Error::NotPowered {
            operation: Operation::Register,
        };
        assert_eq!(err.to_string(), "cannot register: device is not powered on");
    }

    #[test]
    fn test_transmission_failure_keeps_source() {
        use std::error::Error as _;

        let err = Error::transmission(Error::ActivationFailed { attempts: 3 });
        assert!(err.is_retryable());
        let source = err.source().map(|s| s.to_string());
        assert_eq!(
            source.as_deref(),
            Some("connection activation failed after 3 attempts")
        );

        let err = Error::transmission(Error::NotPowered {
            operation: Operation::ActivateConnection,
        });
        assert!(!err.is_retryable());
    }
}
