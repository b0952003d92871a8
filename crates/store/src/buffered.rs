//! Buffered store: authoritative cache plus backend propagation.
//!
//! ## Write path
//!
//! `put` and `delete` commit to the cache first - that alone decides
//! the call's result. Backend propagation then happens per the
//! configured [`WriteMode`]:
//!
//! - [`WriteMode::Sync`]: the backend call runs inline before the
//!   method returns. A backend failure is logged and the call still
//!   returns `Ok` - the cache is authoritative.
//! - [`WriteMode::Async`]: the operation is queued to a background
//!   writer thread and the method returns immediately.
//!
//! A successful `put` is therefore a cache-commit guarantee, not a
//! durability guarantee. Durability-sensitive callers use sync mode
//! and watch the logs.
//!
//! ## Read path
//!
//! `get`/`exists`/`query` never touch the write path or the backend;
//! they read the DashMap cache directly for maximal concurrent
//! throughput.
//!
//! ## Startup
//!
//! With a backend configured, construction lists all backend keys and
//! loads each into the cache individually. A per-key failure is logged
//! and skipped; an entirely unreachable backend yields an empty but
//! functional store. Neither case is an error.

use dashmap::DashMap;
use ledger_core::{Error, Filter, JsonValue, Record, Result};
use parking_lot::Mutex;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// How cache writes propagate to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Propagate inline, blocking on backend acknowledgement.
    /// Backend failures are logged, never returned.
    #[default]
    Sync,
    /// Queue to the background writer thread, fire-and-forget.
    Async,
}

/// Aggregation operation for [`Store::aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    /// Sum of qualifying numeric values.
    Sum,
    /// Arithmetic mean of qualifying numeric values.
    Avg,
    /// Minimum qualifying numeric value.
    Min,
    /// Maximum qualifying numeric value.
    Max,
}

/// Unified store contract consumed by other subsystems.
///
/// Any backend substituted behind this contract must preserve the
/// error shapes exactly: `get` on an absent key is
/// [`Error::NotFound`], never a panic or an empty value.
pub trait Store: Send + Sync {
    /// Write a value under `key`. Success means the cache committed.
    fn put(&self, key: &str, value: JsonValue) -> Result<()>;

    /// Read the value under `key` from the cache.
    fn get(&self, key: &str) -> Result<JsonValue>;

    /// Delete `key`. Deleting an absent key is a no-op.
    fn delete(&self, key: &str) -> Result<()>;

    /// List all cached keys.
    fn list(&self) -> Result<Vec<String>>;

    /// True when `key` is present in the cache.
    fn exists(&self, key: &str) -> bool;

    /// Run the full filter pipeline over the cache.
    fn query(&self, filter: &Filter) -> Result<Vec<Record>>;

    /// Number of records matching the filter's conditions and time
    /// window, ignoring pagination.
    fn count(&self, filter: &Filter) -> Result<usize>;

    /// Aggregate a numeric field over the filtered records.
    ///
    /// Non-numeric and missing field values are ignored; returns
    /// `None` when no value qualifies.
    fn aggregate(&self, filter: &Filter, field: &str, op: AggregateOp) -> Result<Option<f64>>;
}

enum BackendOp {
    Store(String, JsonValue),
    Remove(String),
}

struct Writer {
    tx: Sender<BackendOp>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

/// Generic keyed store: in-memory cache + optional durable backend.
pub struct BufferedStore {
    cache: DashMap<String, Record>,
    backend: Option<Arc<dyn crate::StoreBackend>>,
    write_mode: WriteMode,
    writer: Option<Writer>,
}

impl BufferedStore {
    /// Create a cache-only store with no durable backend.
    pub fn new() -> Self {
        Self {
            cache: DashMap::new(),
            backend: None,
            write_mode: WriteMode::Sync,
            writer: None,
        }
    }

    /// Create a store backed by `backend`, loading its existing
    /// contents into the cache.
    ///
    /// Load failures never fail construction: a per-key failure skips
    /// that key, a failed key listing yields an empty cache. Both are
    /// logged.
    pub fn with_backend(backend: Arc<dyn crate::StoreBackend>, write_mode: WriteMode) -> Self {
        let cache = DashMap::new();
        match backend.keys() {
            Ok(keys) => {
                for key in keys {
                    match backend.load(&key) {
                        Ok(value) => match serde_json::from_value::<Record>(value) {
                            Ok(record) => {
                                cache.insert(key, record);
                            }
                            Err(e) => {
                                warn!(key, error = %e, "skipping undecodable backend record");
                            }
                        },
                        Err(e) => {
                            warn!(key, error = %e, "skipping unloadable backend record");
                        }
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "backend key listing failed; starting with empty cache");
            }
        }
        debug!(records = cache.len(), "buffered store loaded");

        let writer = match write_mode {
            WriteMode::Sync => None,
            WriteMode::Async => Some(Self::spawn_writer(Arc::clone(&backend))),
        };

        Self {
            cache,
            backend: Some(backend),
            write_mode,
            writer,
        }
    }

    /// Background writer draining queued backend operations.
    ///
    /// Failures are logged and the worker keeps going; the cache is
    /// authoritative either way. The loop ends when the sender side is
    /// dropped, after draining what remains.
    fn spawn_writer(backend: Arc<dyn crate::StoreBackend>) -> Writer {
        let (tx, rx) = mpsc::channel::<BackendOp>();
        let handle = std::thread::Builder::new()
            .name("ledger-store-writer".to_string())
            .spawn(move || {
                while let Ok(op) = rx.recv() {
                    let result = match &op {
                        BackendOp::Store(key, value) => backend.store(key, value),
                        BackendOp::Remove(key) => backend.remove(key),
                    };
                    if let Err(e) = result {
                        let key = match &op {
                            BackendOp::Store(key, _) | BackendOp::Remove(key) => key,
                        };
                        warn!(key, error = %e, "async backend write failed");
                    }
                }
            })
            .expect("failed to spawn store writer thread");
        Writer {
            tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    fn propagate(&self, op: BackendOp) {
        let Some(backend) = &self.backend else { return };
        match self.write_mode {
            WriteMode::Sync => {
                let result = match &op {
                    BackendOp::Store(key, value) => backend.store(key, value),
                    BackendOp::Remove(key) => backend.remove(key),
                };
                if let Err(e) = result {
                    warn!(error = %e, "sync backend write failed; cache remains authoritative");
                }
            }
            WriteMode::Async => {
                if let Some(writer) = &self.writer {
                    if writer.tx.send(op).is_err() {
                        warn!("store writer thread is gone; dropping backend write");
                    }
                }
            }
        }
    }

    /// Drain the async writer queue and stop the worker thread.
    ///
    /// Idempotent. Called automatically on drop.
    pub fn shutdown(&mut self) {
        if let Some(writer) = self.writer.take() {
            drop(writer.tx);
            if let Some(handle) = writer.handle.lock().take() {
                if handle.join().is_err() {
                    warn!("store writer thread panicked during shutdown");
                }
            }
        }
    }

    /// Number of cached records.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// True when the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// All cached records, sorted by key for deterministic ordering.
    fn records(&self) -> Vec<Record> {
        let mut records: Vec<Record> = self.cache.iter().map(|e| e.value().clone()).collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        records
    }
}

impl Default for BufferedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BufferedStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Store for BufferedStore {
    fn put(&self, key: &str, value: JsonValue) -> Result<()> {
        // Cache commit decides the result. The entry API keeps the
        // insert-or-update decision atomic per key.
        let record = match self.cache.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                let updated = occupied.get().updated(value);
                occupied.insert(updated.clone());
                updated
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let record = Record::new(key, value);
                vacant.insert(record.clone());
                record
            }
        };

        match serde_json::to_value(&record) {
            Ok(encoded) => self.propagate(BackendOp::Store(key.to_string(), encoded)),
            Err(e) => warn!(key, error = %e, "record not propagated to backend"),
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Result<JsonValue> {
        self.cache
            .get(key)
            .map(|record| record.data.clone())
            .ok_or_else(|| Error::not_found(key))
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.cache.remove(key);
        self.propagate(BackendOp::Remove(key.to_string()));
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.cache.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        Ok(keys)
    }

    fn exists(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }

    fn query(&self, filter: &Filter) -> Result<Vec<Record>> {
        Ok(filter.apply(self.records()))
    }

    fn count(&self, filter: &Filter) -> Result<usize> {
        // Conditions and time window only. Pagination does not change
        // how many records match.
        Ok(self
            .records()
            .iter()
            .filter(|record| filter.matches(record))
            .count())
    }

    fn aggregate(&self, filter: &Filter, field: &str, op: AggregateOp) -> Result<Option<f64>> {
        let values: Vec<f64> = self
            .query(filter)?
            .iter()
            .filter_map(|record| record.field(field).and_then(JsonValue::as_f64))
            .collect();

        if values.is_empty() {
            return Ok(None);
        }

        let result = match op {
            AggregateOp::Sum => values.iter().sum(),
            AggregateOp::Avg => values.iter().sum::<f64>() / values.len() as f64,
            AggregateOp::Min => values.iter().cloned().fold(f64::INFINITY, f64::min),
            AggregateOp::Max => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        };
        Ok(Some(result))
    }
}
