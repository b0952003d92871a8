//! Durable backend contract and the in-memory reference backend.
//!
//! A [`StoreBackend`] is the pluggable durable side of a
//! [`BufferedStore`](crate::BufferedStore). It stores opaque JSON
//! blobs by key. Backends are injected at construction time; the
//! buffered store never resolves them at runtime.
//!
//! Backends may fail freely: every call returns `Result`, and the
//! buffered store treats failures as log-and-continue, never as fatal.

use ledger_core::{JsonValue, Result};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Durable backend for a buffered store.
///
/// Implementations must be safe to call from the store's background
/// writer thread.
pub trait StoreBackend: Send + Sync {
    /// Load the blob stored under `key`.
    ///
    /// Returns [`Error::NotFound`](ledger_core::Error::NotFound) when
    /// the key is absent.
    fn load(&self, key: &str) -> Result<JsonValue>;

    /// Store a blob under `key`, replacing any previous value.
    fn store(&self, key: &str, value: &JsonValue) -> Result<()>;

    /// Remove the blob under `key`. Removing an absent key is a no-op.
    fn remove(&self, key: &str) -> Result<()>;

    /// List every stored key, in no particular order.
    fn keys(&self) -> Result<Vec<String>>;
}

/// In-memory backend.
///
/// Useful for tests and for exercising the propagation machinery
/// without touching disk. Data lives in an `FxHashMap` behind a
/// `RwLock`.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: RwLock<FxHashMap<String, JsonValue>>,
}

impl MemoryBackend {
    /// Create an empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl StoreBackend for MemoryBackend {
    fn load(&self, key: &str) -> Result<JsonValue> {
        self.data
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| ledger_core::Error::not_found(key))
    }

    fn store(&self, key: &str, value: &JsonValue) -> Result<()> {
        self.data.write().insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.data.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.data.read().keys().cloned().collect())
    }
}
