//! # Local Durable Store
//!
//! Synchronous key-value persistence that survives process restart. Both the
//! session timer and the offline queue keep their state here, each under its
//! own key, so they never contend for the same entry.
//!
//! ## Backends
//!
//! - [`MemoryStore`]: process-lifetime map with injectable failures, used by
//!   tests and ephemeral sessions
//! - [`FileStore`]: one JSON document per key in a data directory, written
//!   atomically through a temp file and rename
//!
//! ## Usage
//!
//! ```rust
//! use liftlog_session::session::local_store::{DurableStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! store.set("session-timer-checkpoint", "{}").unwrap();
//! assert_eq!(store.get("session-timer-checkpoint").unwrap().as_deref(), Some("{}"));
//! store.remove("session-timer-checkpoint").unwrap();
//! assert!(store.get("session-timer-checkpoint").unwrap().is_none());
//! ```

pub mod file;

pub use file::FileStore;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::shared::error::StoreError;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Durable key-value persistence surface
///
/// Calls are synchronous from the caller's point of view. Implementations are
/// best-effort: a process kill in the middle of `set` may lose that write.
pub trait DurableStore: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`; removing an absent key is not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory store
///
/// Reads and writes can be switched to fail so callers' degraded paths can be
/// exercised.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `get` fail until switched off
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `set`/`remove` fail until switched off
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of keys currently held
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("writes disabled"));
        }
        Ok(())
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("reads disabled"));
        }
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check_writable()?;
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.check_writable()?;
        self.lock().remove(key);
        Ok(())
    }
}
