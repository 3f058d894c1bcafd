//! Fallible copies across the caller/core boundary.
//!
//! A caller hands the core a [`UserSource`] to write from or a [`UserSink`] to
//! read into. Either side may fail independently of the data's validity, the
//! same way a copy from an unmapped user buffer fails. The core only ever
//! touches caller memory through these traits.

use thiserror::Error;

/// The boundary copy could not be completed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("boundary copy faulted")]
pub struct TransferFault;

/// Caller-owned bytes that the core copies in on write.
pub trait UserSource {
    /// Number of bytes the caller claims to be passing.
    fn claimed_len(&self) -> usize;

    /// Copy exactly `dst.len()` bytes (never more than `claimed_len()`) into `dst`.
    fn copy_in(&self, dst: &mut [u8]) -> Result<(), TransferFault>;
}

/// Caller-owned memory that the core copies out to on read.
pub trait UserSink {
    /// Number of bytes the caller made room for.
    fn capacity(&self) -> usize;

    /// Copy all of `src` to the start of the caller's memory.
    fn copy_out(&mut self, src: &[u8]) -> Result<(), TransferFault>;
}

impl UserSource for [u8] {
    fn claimed_len(&self) -> usize {
        self.len()
    }

    fn copy_in(&self, dst: &mut [u8]) -> Result<(), TransferFault> {
        let src = self.get(..dst.len()).ok_or(TransferFault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

impl UserSink for [u8] {
    fn capacity(&self) -> usize {
        self.len()
    }

    fn copy_out(&mut self, src: &[u8]) -> Result<(), TransferFault> {
        let dst = self.get_mut(..src.len()).ok_or(TransferFault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

/// A source whose claimed length may exceed the bytes actually supplied.
///
/// Used where the length arrives separately from the payload (e.g. a request
/// header over a socket). Copying past the supplied bytes faults instead of
/// reading garbage.
#[derive(Debug, Clone, Copy)]
pub struct ClaimedSource<'a> {
    bytes: &'a [u8],
    claimed: usize,
}

impl<'a> ClaimedSource<'a> {
    pub fn new(bytes: &'a [u8], claimed: usize) -> Self {
        Self { bytes, claimed }
    }
}

impl UserSource for ClaimedSource<'_> {
    fn claimed_len(&self) -> usize {
        self.claimed
    }

    fn copy_in(&self, dst: &mut [u8]) -> Result<(), TransferFault> {
        if dst.len() > self.claimed {
            return Err(TransferFault);
        }
        self.bytes.copy_in(dst)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Source that claims a length but faults on every copy.
    pub struct FaultySource(pub usize);

    impl UserSource for FaultySource {
        fn claimed_len(&self) -> usize {
            self.0
        }

        fn copy_in(&self, _dst: &mut [u8]) -> Result<(), TransferFault> {
            Err(TransferFault)
        }
    }

    /// Sink that reports a fixed capacity and accepts any copy, counting them.
    pub struct CountingSink {
        capacity: usize,
        pub copies: usize,
        pub last: Vec<u8>,
    }

    impl CountingSink {
        pub fn new(capacity: usize) -> Self {
            Self {
                capacity,
                copies: 0,
                last: Vec::new(),
            }
        }
    }

    impl UserSink for CountingSink {
        fn capacity(&self) -> usize {
            self.capacity
        }

        fn copy_out(&mut self, src: &[u8]) -> Result<(), TransferFault> {
            self.copies += 1;
            self.last = src.to_vec();
            Ok(())
        }
    }

    /// Sink that claims capacity but faults on every copy.
    pub struct FaultySink;

    impl UserSink for FaultySink {
        fn capacity(&self) -> usize {
            16
        }

        fn copy_out(&mut self, _src: &[u8]) -> Result<(), TransferFault> {
            Err(TransferFault)
        }
    }
}
