//! Newline-delimited JSON requests and responses carried over the socket.
//!
//! Each request line gets exactly one response line. Requests are routed to
//! the registry; write payloads are handed over as a [`ClaimedSource`] so a
//! request that claims more bytes than it carries faults like a bad buffer.

use crate::error::GpioError;
use crate::gpio::{ClaimedSource, describe};
use crate::host::PseudoFsHost;
use crate::registry::Registry;
use serde::{Deserialize, Serialize};

/// Largest read buffer a client may ask for.
pub const MAX_READ_CAPACITY: usize = 4096;

fn default_capacity() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Read {
        path: String,
        #[serde(default)]
        position: u64,
        #[serde(default = "default_capacity")]
        capacity: usize,
    },
    Write {
        path: String,
        /// Raw payload bytes, carried as a JSON array so any byte value fits.
        data: Vec<u8>,
        /// Claimed payload length; defaults to the length of `data`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        length: Option<usize>,
    },
    List,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryStatus {
    pub path: String,
    pub label: String,
    /// Wire character, "0" or "1".
    pub value: String,
    pub state: String,
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Read {
        data: Vec<u8>,
        count: usize,
        position: u64,
    },
    Written {
        count: usize,
    },
    Entries {
        entries: Vec<EntryStatus>,
    },
    Error {
        errno: String,
        code: i32,
        message: String,
    },
}

impl Response {
    pub fn from_error(err: &GpioError) -> Self {
        let errno = err.errno();
        Self::Error {
            errno: format!("{errno:?}"),
            code: errno as i32,
            message: err.to_string(),
        }
    }
}

/// Execute one request against the registry.
pub fn dispatch<H: PseudoFsHost>(registry: &Registry<H>, request: Request) -> Response {
    let result = match request {
        Request::Read {
            path,
            mut position,
            capacity,
        } => {
            let mut buffer = vec![0u8; capacity.min(MAX_READ_CAPACITY)];
            registry
                .read(&path, buffer.as_mut_slice(), &mut position)
                .map(|count| Response::Read {
                    data: buffer[..count].to_vec(),
                    count,
                    position,
                })
        }
        Request::Write { path, data, length } => {
            let source = ClaimedSource::new(&data, length.unwrap_or(data.len()));
            registry
                .write(&path, &source)
                .map(|count| Response::Written { count })
        }
        Request::List => Ok(Response::Entries {
            entries: registry
                .endpoints()
                .iter()
                .map(|endpoint| {
                    let value = endpoint.cell().get();
                    EntryStatus {
                        path: endpoint.path_name().to_string(),
                        label: endpoint.cell().name().to_string(),
                        value: if value { "1" } else { "0" }.to_string(),
                        state: describe(value).to_string(),
                        version: endpoint.cell().version(),
                    }
                })
                .collect(),
        }),
    };

    result.unwrap_or_else(|err| Response::from_error(&err))
}
