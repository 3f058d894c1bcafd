//! Host namespace that pseudo-file entries are registered in.
//!
//! The registry only needs to create and remove named entries; how the host
//! surfaces them (a procfs, a socket, a test table) is up to the implementor.

use log::debug;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use thiserror::Error;

/// Error types for host namespace operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    /// An entry with this name is already registered.
    #[error("entry {0} already exists")]
    Exists(String),

    /// The host could not allocate another entry.
    #[error("no room for entry {0}")]
    Exhausted(String),
}

/// Namespace in which pseudo-files are created.
pub trait PseudoFsHost: Send + Sync {
    /// Create an entry named `name` with permission bits `mode`.
    fn create_entry(&self, name: &str, mode: u32) -> Result<(), HostError>;

    /// Remove an entry. Removing a missing entry is a no-op.
    fn remove_entry(&self, name: &str);
}

/// In-process entry table.
///
/// An optional limit caps how many entries may exist at once, which is how
/// allocation failure is simulated.
#[derive(Debug, Default)]
pub struct MemoryHost {
    entries: RwLock<BTreeMap<String, u32>>,
    limit: Option<usize>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host that refuses to hold more than `limit` entries.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            limit: Some(limit),
        }
    }

    /// Permission bits of a registered entry.
    pub fn mode_of(&self, name: &str) -> Option<u32> {
        self.entries.read().get(name).copied()
    }

    /// Names of all registered entries, sorted.
    pub fn entries(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}

impl PseudoFsHost for MemoryHost {
    fn create_entry(&self, name: &str, mode: u32) -> Result<(), HostError> {
        let mut entries = self.entries.write();
        if entries.contains_key(name) {
            return Err(HostError::Exists(name.to_string()));
        }
        if self.limit.is_some_and(|limit| entries.len() >= limit) {
            return Err(HostError::Exhausted(name.to_string()));
        }
        entries.insert(name.to_string(), mode);
        debug!("Created entry {} (mode {:o})", name, mode);
        Ok(())
    }

    fn remove_entry(&self, name: &str) {
        if self.entries.write().remove(name).is_some() {
            debug!("Removed entry {}", name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_remove() {
        let host = MemoryHost::new();
        host.create_entry("led", 0o666).unwrap();
        assert_eq!(host.mode_of("led"), Some(0o666));
        assert_eq!(host.entries(), vec!["led".to_string()]);

        host.remove_entry("led");
        assert_eq!(host.mode_of("led"), None);
        host.remove_entry("led");
    }

    #[test]
    fn test_duplicate_rejected() {
        let host = MemoryHost::new();
        host.create_entry("led", 0o666).unwrap();
        assert_eq!(
            host.create_entry("led", 0o644),
            Err(HostError::Exists("led".to_string()))
        );
        assert_eq!(host.mode_of("led"), Some(0o666));
    }

    #[test]
    fn test_limit_exhausts() {
        let host = MemoryHost::with_limit(1);
        host.create_entry("led", 0o666).unwrap();
        assert_eq!(
            host.create_entry("button", 0o666),
            Err(HostError::Exhausted("button".to_string()))
        );
    }
}
