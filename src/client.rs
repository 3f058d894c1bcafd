//! Async client for the daemon socket.

use crate::error::{GpioError, Result};
use crate::server::protocol::MAX_READ_CAPACITY;
use crate::server::{EntryStatus, Request, Response};
use nix::errno::Errno;
use std::io;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

/// Bytes returned by one read, and the cursor after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadChunk {
    pub data: Vec<u8>,
    pub position: u64,
}

pub struct GpioClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl GpioClient {
    pub async fn connect(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path).await?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
        })
    }

    /// Send one request and wait for its response. Error responses are
    /// turned into [`GpioError::Remote`].
    pub async fn call(&mut self, request: &Request) -> Result<Response> {
        let mut encoded = serde_json::to_vec(request)?;
        encoded.push(b'\n');
        self.writer.write_all(&encoded).await?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }

        match serde_json::from_str::<Response>(&line)? {
            Response::Error { code, message, .. } => Err(GpioError::Remote {
                errno: Errno::from_raw(code),
                message,
            }),
            response => Ok(response),
        }
    }

    pub async fn read(&mut self, path: &str, position: u64, capacity: usize) -> Result<ReadChunk> {
        let request = Request::Read {
            path: path.to_string(),
            position,
            capacity,
        };
        match self.call(&request).await? {
            Response::Read { data, position, .. } => Ok(ReadChunk { data, position }),
            other => Err(unexpected(&other)),
        }
    }

    /// Read from the start until end of stream.
    pub async fn read_to_end(&mut self, path: &str) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut position = 0;
        loop {
            let chunk = self.read(path, position, MAX_READ_CAPACITY).await?;
            if chunk.data.is_empty() {
                return Ok(out);
            }
            out.extend_from_slice(&chunk.data);
            position = chunk.position;
        }
    }

    pub async fn write(&mut self, path: &str, data: &[u8]) -> Result<usize> {
        self.write_request(path, data, None).await
    }

    /// Write while claiming a payload length that may differ from `data`.
    pub async fn write_claimed(&mut self, path: &str, data: &[u8], length: usize) -> Result<usize> {
        self.write_request(path, data, Some(length)).await
    }

    async fn write_request(&mut self, path: &str, data: &[u8], length: Option<usize>) -> Result<usize> {
        let request = Request::Write {
            path: path.to_string(),
            data: data.to_vec(),
            length,
        };
        match self.call(&request).await? {
            Response::Written { count } => Ok(count),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn list(&mut self) -> Result<Vec<EntryStatus>> {
        match self.call(&Request::List).await? {
            Response::Entries { entries } => Ok(entries),
            other => Err(unexpected(&other)),
        }
    }
}

fn unexpected(response: &Response) -> GpioError {
    GpioError::Protocol(format!("unexpected response: {response:?}"))
}
