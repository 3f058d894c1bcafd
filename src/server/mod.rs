//! Socket front end serving the registry to other processes.
//!
//! Every connection is its own session: it sends request lines and receives
//! one response line per request. Read cursors travel with each request, so
//! sessions keep no per-file state on the server side.

pub mod protocol;
pub mod socket;

pub use protocol::{EntryStatus, Request, Response};
pub use socket::BoundSocket;

use crate::error::{GpioError, Result};
use crate::host::PseudoFsHost;
use crate::registry::Registry;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use std::future::Future;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UnixStream;
use tokio::task::JoinHandle;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use uuid::Uuid;

/// Longest request line a session will buffer. Valid requests are far shorter.
pub const MAX_REQUEST_LINE: usize = 1024;

/// Pause after a failed accept so a persistent error (e.g. EMFILE) does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub struct Server<H: PseudoFsHost + 'static> {
    registry: Arc<Registry<H>>,
    socket: BoundSocket,
}

impl<H: PseudoFsHost + 'static> Server<H> {
    pub fn bind(path: &Path, mode: u32, registry: Arc<Registry<H>>) -> Result<Self> {
        let socket = BoundSocket::bind(path, mode)?;
        info!("Listening on {}", socket.path().display());
        Ok(Self { registry, socket })
    }

    /// Accept connections until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!("Server shutting down");
                    return Ok(());
                }
                accepted = self.socket.listener().accept() => {
                    if self.on_accept(accepted.map(|(stream, _)| stream)).is_none() {
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                }
            }
        }
    }

    /// Start a session for an accepted connection. A failed accept only
    /// affects that connection: it is logged and `None` is returned.
    fn on_accept(&self, accepted: io::Result<UnixStream>) -> Option<JoinHandle<()>> {
        match accepted {
            Ok(stream) => Some(self.spawn_session(stream)),
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                None
            }
        }
    }

    fn spawn_session(&self, stream: UnixStream) -> JoinHandle<()> {
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            let session = Uuid::new_v4();
            debug!("[{}] session opened", session);
            if let Err(e) = handle_session(registry, stream, session).await {
                debug!("[{}] session ended with error: {}", session, e);
            } else {
                debug!("[{}] session closed", session);
            }
        })
    }
}

fn codec_error(err: LinesCodecError) -> GpioError {
    match err {
        LinesCodecError::Io(e) => e.into(),
        other => GpioError::Protocol(other.to_string()),
    }
}

async fn reply(framed: &mut Framed<UnixStream, LinesCodec>, response: &Response) -> Result<()> {
    framed
        .send(serde_json::to_string(response)?)
        .await
        .map_err(codec_error)
}

async fn handle_session<H: PseudoFsHost>(
    registry: Arc<Registry<H>>,
    stream: UnixStream,
    session: Uuid,
) -> Result<()> {
    let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_REQUEST_LINE));

    while let Some(frame) = framed.next().await {
        let line = match frame {
            Ok(line) => line,
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                warn!("[{}] request line exceeds {} bytes, closing", session, MAX_REQUEST_LINE);
                let err = GpioError::Protocol(format!(
                    "request line exceeds {MAX_REQUEST_LINE} bytes"
                ));
                return reply(&mut framed, &Response::from_error(&err)).await;
            }
            Err(e) => return Err(codec_error(e)),
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(line) {
            Ok(request) => {
                debug!("[{}] {:?}", session, request);
                protocol::dispatch(registry.as_ref(), request)
            }
            Err(e) => {
                warn!("[{}] malformed request: {}", session, e);
                Response::from_error(&GpioError::Protocol(e.to_string()))
            }
        };
        reply(&mut framed, &response).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use nix::errno::Errno;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};

    fn bound() -> Server<MemoryHost> {
        let path = std::env::temp_dir().join(format!("virtual-gpio-server-{}.sock", Uuid::new_v4()));
        let registry = Arc::new(Registry::new(MemoryHost::new()));
        registry.start().unwrap();
        Server::bind(&path, 0o666, registry).unwrap()
    }

    async fn read_response(reader: &mut BufReader<UnixStream>) -> Response {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        serde_json::from_str(&line).unwrap()
    }

    #[tokio::test]
    async fn test_failed_accept_keeps_serving() {
        let server = bound();
        let refused = server.on_accept(Err(io::Error::from_raw_os_error(Errno::EMFILE as i32)));
        assert!(refused.is_none());

        let (local, remote) = UnixStream::pair().unwrap();
        let session = server.on_accept(Ok(local)).unwrap();

        let mut remote = BufReader::new(remote);
        remote
            .get_mut()
            .write_all(b"{\"op\":\"write\",\"path\":\"led\",\"data\":[49]}\n")
            .await
            .unwrap();
        assert_eq!(read_response(&mut remote).await, Response::Written { count: 1 });

        drop(remote);
        session.await.unwrap();
        assert!(server.registry.endpoint("led").unwrap().cell().get());
    }

    #[tokio::test]
    async fn test_oversized_line_is_refused_and_closed() {
        let server = bound();
        let (local, remote) = UnixStream::pair().unwrap();
        let session = server.on_accept(Ok(local)).unwrap();
        let (read_half, mut write_half) = remote.into_split();

        // No newline: the session must give up before the line ends.
        let flood = tokio::spawn(async move {
            let chunk = vec![b'a'; 16 * 1024];
            for _ in 0..64 {
                if write_half.write_all(&chunk).await.is_err() {
                    break;
                }
            }
        });

        let mut reader = BufReader::new(read_half);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let response: Response = serde_json::from_str(&line).unwrap();
        assert!(matches!(response, Response::Error { ref errno, .. } if errno == "EPROTO"));

        // Closed after the error; the peer may see EOF or a reset, never more data.
        let mut rest = Vec::new();
        let _ = reader.read_to_end(&mut rest).await;
        assert!(rest.is_empty());

        session.await.unwrap();
        flood.abort();
        assert!(!server.registry.endpoint("led").unwrap().cell().get());
    }

    #[tokio::test]
    async fn test_line_at_cap_is_still_parsed() {
        let server = bound();
        let (local, remote) = UnixStream::pair().unwrap();
        let _session = server.on_accept(Ok(local)).unwrap();

        let request = b"{\"op\":\"list\"}";
        let mut line = request.to_vec();
        line.resize(MAX_REQUEST_LINE, b' ');
        line.push(b'\n');

        let mut remote = BufReader::new(remote);
        remote.get_mut().write_all(&line).await.unwrap();
        assert!(matches!(
            read_response(&mut remote).await,
            Response::Entries { .. }
        ));
    }
}
