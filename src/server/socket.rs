//! Unix socket the daemon listens on.
//!
//! Binding doubles as the single-instance check: if something still accepts
//! connections on the path another daemon owns it, otherwise the leftover
//! file is stale and gets replaced.

use crate::error::{GpioError, Result};
use log::debug;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tokio::net::UnixListener;

/// Bound listening socket. The socket file is removed on drop.
pub struct BoundSocket {
    listener: UnixListener,
    path: PathBuf,
}

impl BoundSocket {
    /// Bind `path` and give the socket file permission bits `mode`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(path: &Path, mode: u32) -> Result<Self> {
        if path.exists() {
            match std::os::unix::net::UnixStream::connect(path) {
                Ok(_) => return Err(GpioError::AddrInUse(path.to_path_buf())),
                Err(_) => {
                    debug!("Removing stale socket {}", path.display());
                    let _ = fs::remove_file(path);
                }
            }
        }

        let listener = match UnixListener::bind(path) {
            Ok(listener) => listener,
            // Another daemon bound between the check and the bind
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                return Err(GpioError::AddrInUse(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        let socket = Self {
            listener,
            path: path.to_path_buf(),
        };
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
        Ok(socket)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn listener(&self) -> &UnixListener {
        &self.listener
    }
}

impl Drop for BoundSocket {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_socket() -> PathBuf {
        std::env::temp_dir().join(format!("virtual-gpio-test-{}.sock", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_bind_sets_mode_and_cleans_up() {
        let path = temp_socket();
        let socket = BoundSocket::bind(&path, 0o600).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert_eq!(socket.path(), path.as_path());

        drop(socket);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_second_bind_is_refused() {
        let path = temp_socket();
        let _first = BoundSocket::bind(&path, 0o666).unwrap();
        let second = BoundSocket::bind(&path, 0o666);
        assert!(matches!(second, Err(GpioError::AddrInUse(ref p)) if p == &path));
    }

    #[tokio::test]
    async fn test_stale_socket_is_replaced() {
        let path = temp_socket();
        {
            let stale = std::os::unix::net::UnixListener::bind(&path).unwrap();
            drop(stale);
        }
        assert!(path.exists());
        let socket = BoundSocket::bind(&path, 0o666).unwrap();
        assert!(socket.path().exists());
    }
}
