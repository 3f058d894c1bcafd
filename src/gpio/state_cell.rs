//! Single-bit state for one simulated line and its transfer protocol.
//!
//! The state crosses the caller boundary as one ASCII character: `'1'` for
//! ON / PRESSED and `'0'` for OFF / RELEASED. Reads behave like a one-record
//! pseudo-file: a fresh cursor yields the character once, any later position
//! yields end of stream.

use super::transfer::{UserSink, UserSource};
use crate::error::{GpioError, Result};
use log::info;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Largest write payload accepted in one call.
pub const WRITE_CAPACITY: usize = 10;

/// Encode a state as its wire character.
pub fn encode(value: bool) -> u8 {
    if value { b'1' } else { b'0' }
}

/// Decode a write payload. Only a leading `'1'` sets the line; anything else,
/// including an empty payload, clears it.
pub fn decode(payload: &[u8]) -> bool {
    payload.first() == Some(&b'1')
}

/// Human-readable state used in diagnostics.
pub fn describe(value: bool) -> &'static str {
    if value { "ON / PRESSED" } else { "OFF / RELEASED" }
}

/// Thread-safe state of one simulated line.
///
/// The value lives in a single atomic word, so concurrent writers replace it
/// whole and readers never observe a partial update. The version is bumped
/// each time a write actually changes the value.
#[derive(Debug)]
pub struct StateCell {
    name: String,
    value: AtomicBool,
    version: AtomicU32,
}

impl StateCell {
    /// Create a cell in the OFF / RELEASED state.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AtomicBool::new(false),
            version: AtomicU32::new(0),
        }
    }

    /// Diagnostic label, e.g. "LED".
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self) -> bool {
        self.value.load(Ordering::SeqCst)
    }

    pub fn version(&self) -> u32 {
        self.version.load(Ordering::SeqCst)
    }

    fn store(&self, value: bool) {
        let old = self.value.swap(value, Ordering::SeqCst);
        if old != value {
            self.version.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Write the line from caller memory.
    ///
    /// Oversized payloads are rejected before caller memory is touched. A
    /// faulting copy leaves the state as it was. Returns the number of bytes
    /// accepted, which is always the full claimed length.
    pub fn write_from<S: UserSource + ?Sized>(&self, src: &S) -> Result<usize> {
        let length = src.claimed_len();
        if length > WRITE_CAPACITY {
            return Err(GpioError::InvalidArgument {
                length,
                capacity: WRITE_CAPACITY,
            });
        }

        let mut buffer = [0u8; WRITE_CAPACITY];
        src.copy_in(&mut buffer[..length])?;

        let value = decode(&buffer[..length]);
        self.store(value);
        info!("Simulated {} is {}", self.name, describe(value));

        Ok(length)
    }

    /// Read the line into caller memory at `position`.
    ///
    /// Returns 0 once the cursor is past the single record. A sink with no
    /// room for the record faults without being copied to. On success the
    /// cursor is moved to 1; on a fault it is left alone.
    pub fn read_into<K: UserSink + ?Sized>(&self, sink: &mut K, position: &mut u64) -> Result<usize> {
        if *position > 0 {
            return Ok(0);
        }

        let record = [encode(self.get())];
        if sink.capacity() < record.len() {
            return Err(GpioError::TransferFault);
        }
        sink.copy_out(&record)?;

        *position = 1;
        Ok(record.len())
    }
}
