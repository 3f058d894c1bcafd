//! Registry owning the simulated lines for the lifetime of one run.
//!
//! `start()` builds fresh cells, binds them to endpoints and registers each
//! endpoint with the host; `stop()` unregisters and drops them. Calls arriving
//! between the two are routed by path name.

use crate::error::{GpioError, Result};
use crate::gpio::{Endpoint, Line, UserSink, UserSource};
use crate::host::PseudoFsHost;
use log::{info, warn};
use parking_lot::RwLock;
use std::sync::Arc;
use strum::IntoEnumIterator;

/// Permission bits given to each pseudo-file: read and write for everyone.
pub const DEFAULT_ENTRY_MODE: u32 = 0o666;

/// The endpoints alive between `start()` and `stop()`.
#[derive(Debug)]
struct Bank {
    led: Arc<Endpoint>,
    button: Arc<Endpoint>,
}

impl Bank {
    fn new() -> Self {
        Self {
            led: Arc::new(Endpoint::for_line(Line::Led)),
            button: Arc::new(Endpoint::for_line(Line::Button)),
        }
    }

    fn get(&self, line: Line) -> &Arc<Endpoint> {
        match line {
            Line::Led => &self.led,
            Line::Button => &self.button,
        }
    }
}

pub struct Registry<H: PseudoFsHost> {
    host: H,
    mode: u32,
    bank: RwLock<Option<Bank>>,
}

impl<H: PseudoFsHost> Registry<H> {
    pub fn new(host: H) -> Self {
        Self::with_mode(host, DEFAULT_ENTRY_MODE)
    }

    pub fn with_mode(host: H, mode: u32) -> Self {
        Self {
            host,
            mode,
            bank: RwLock::new(None),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn is_running(&self) -> bool {
        self.bank.read().is_some()
    }

    /// Register both lines with the host.
    ///
    /// If a later registration fails, every entry created so far is removed
    /// before the error is returned, leaving the host as it was.
    pub fn start(&self) -> Result<()> {
        let mut bank = self.bank.write();
        if bank.is_some() {
            return Err(GpioError::AlreadyRunning);
        }

        let mut created: Vec<Line> = Vec::new();
        for line in Line::iter() {
            if let Err(source) = self.host.create_entry(line.path_name(), self.mode) {
                for done in created.iter().rev() {
                    warn!("Rolling back entry {} after failed start", done.path_name());
                    self.host.remove_entry(done.path_name());
                }
                return Err(GpioError::ResourceExhausted {
                    path: line.path_name().to_string(),
                    source,
                });
            }
            created.push(line);
        }

        *bank = Some(Bank::new());
        info!("Simulated GPIO LED/Button module loaded");
        Ok(())
    }

    /// Unregister both lines and discard their state. A no-op when stopped.
    pub fn stop(&self) {
        let mut bank = self.bank.write();
        if bank.take().is_none() {
            return;
        }
        for line in Line::iter() {
            self.host.remove_entry(line.path_name());
        }
        info!("Simulated GPIO LED/Button module unloaded");
    }

    /// Look up the endpoint registered under `path`.
    pub fn endpoint(&self, path: &str) -> Result<Arc<Endpoint>> {
        let line: Line = path
            .parse()
            .map_err(|_| GpioError::NoSuchEntry(path.to_string()))?;
        let bank = self.bank.read();
        let bank = bank.as_ref().ok_or(GpioError::NotRunning)?;
        Ok(Arc::clone(bank.get(line)))
    }

    /// All registered endpoints, in registration order.
    pub fn endpoints(&self) -> Vec<Arc<Endpoint>> {
        match self.bank.read().as_ref() {
            Some(bank) => Line::iter().map(|line| Arc::clone(bank.get(line))).collect(),
            None => Vec::new(),
        }
    }

    /// Open a fresh read session on `path`.
    pub fn open(&self, path: &str) -> Result<OpenFile> {
        Ok(OpenFile::new(self.endpoint(path)?))
    }

    /// Route a read at an explicit cursor.
    pub fn read<K: UserSink + ?Sized>(&self, path: &str, sink: &mut K, position: &mut u64) -> Result<usize> {
        self.endpoint(path)?.read(sink, position)
    }

    /// Route a write.
    pub fn write<S: UserSource + ?Sized>(&self, path: &str, src: &S) -> Result<usize> {
        self.endpoint(path)?.write(src)
    }
}

impl<H: PseudoFsHost> Drop for Registry<H> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One caller's handle on an endpoint, carrying its own read cursor.
#[derive(Debug)]
pub struct OpenFile {
    endpoint: Arc<Endpoint>,
    position: u64,
}

impl OpenFile {
    fn new(endpoint: Arc<Endpoint>) -> Self {
        Self {
            endpoint,
            position: 0,
        }
    }

    pub fn path_name(&self) -> &'static str {
        self.endpoint.path_name()
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Move the cursor back to the start so the next read yields the state again.
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    pub fn read<K: UserSink + ?Sized>(&mut self, sink: &mut K) -> Result<usize> {
        self.endpoint.read(sink, &mut self.position)
    }

    pub fn write<S: UserSource + ?Sized>(&mut self, src: &S) -> Result<usize> {
        self.endpoint.write(src)
    }

    /// Read until end of stream, the way a naive `cat` would.
    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut chunk = [0u8; 64];
        loop {
            let n = self.read(chunk.as_mut_slice())?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&chunk[..n]);
        }
    }
}
