use nix::errno::Errno;
use std::path::PathBuf;
use thiserror::Error as ThisError;

use crate::host::HostError;

#[derive(ThisError, Debug)]
pub enum GpioError {
    #[error("write of {length} bytes exceeds capacity of {capacity} bytes")]
    InvalidArgument { length: usize, capacity: usize },

    #[error("boundary copy faulted")]
    TransferFault,

    #[error("failed to register pseudo-file {path}: {source}")]
    ResourceExhausted {
        path: String,
        #[source]
        source: HostError,
    },

    #[error("no such entry: {0}")]
    NoSuchEntry(String),

    #[error("registry is not running")]
    NotRunning,

    #[error("registry is already running")]
    AlreadyRunning,

    #[error("another instance is already serving {0}")]
    AddrInUse(PathBuf),

    #[error("malformed request: {0}")]
    Protocol(String),

    /// Error reported by the daemon on the other end of the socket.
    #[error("{message}")]
    Remote { errno: Errno, message: String },

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

impl GpioError {
    /// Kernel-style error code reported over the wire and by the CLI.
    pub fn errno(&self) -> Errno {
        match self {
            Self::InvalidArgument { .. } => Errno::EINVAL,
            Self::TransferFault => Errno::EFAULT,
            Self::ResourceExhausted { .. } => Errno::ENOMEM,
            Self::NoSuchEntry(_) => Errno::ENOENT,
            Self::NotRunning => Errno::ENODEV,
            Self::AlreadyRunning => Errno::EBUSY,
            Self::AddrInUse(_) => Errno::EADDRINUSE,
            Self::Protocol(_) | Self::SerdeJsonError(_) => Errno::EPROTO,
            Self::Remote { errno, .. } => *errno,
            Self::IoError(e) => e.raw_os_error().map(Errno::from_raw).unwrap_or(Errno::EIO),
        }
    }
}

impl From<crate::gpio::TransferFault> for GpioError {
    fn from(_: crate::gpio::TransferFault) -> Self {
        Self::TransferFault
    }
}

pub type Result<T> = std::result::Result<T, GpioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_mapping() {
        let err = GpioError::InvalidArgument {
            length: 11,
            capacity: 10,
        };
        assert_eq!(err.errno(), Errno::EINVAL);
        assert_eq!(GpioError::TransferFault.errno(), Errno::EFAULT);
        assert_eq!(
            GpioError::ResourceExhausted {
                path: "led".into(),
                source: HostError::Exhausted("led".into()),
            }
            .errno(),
            Errno::ENOMEM
        );
        assert_eq!(GpioError::NoSuchEntry("fan".into()).errno(), Errno::ENOENT);
    }

    #[test]
    fn test_io_error_keeps_os_code() {
        let err = GpioError::from(std::io::Error::from_raw_os_error(Errno::EACCES as i32));
        assert_eq!(err.errno(), Errno::EACCES);

        let err = GpioError::from(std::io::Error::other("boom"));
        assert_eq!(err.errno(), Errno::EIO);
    }
}
