//! Main entry point wiring the persistence components together.
//!
//! A [`Ledger`] owns one event log, one buffered store, and, when a
//! snapshot store is configured, one background snapshotter. The
//! pieces are also usable individually through the member crates;
//! the facade just handles the common wiring.

use crate::error::{Error, Result};
use ledger_log::{
    EventLog, EventLogConfig, InMemoryEventLog, Snapshotter, SnapshotterConfig,
};
use ledger_store::{BufferedStore, Store, StoreBackend, WriteMode};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// The assembled persistence layer.
///
/// Create one with [`Ledger::in_memory`] or [`Ledger::builder`].
///
/// # Example
///
/// ```ignore
/// use ledgerdb::prelude::*;
///
/// let ledger = Ledger::in_memory()?;
///
/// // Event streams
/// ledger.log.append("run:1", vec![AppendEvent::new("started", json!({}))])?;
///
/// // Cached records
/// ledger.store.put("agent:1", json!({"name": "planner"}))?;
///
/// // Graceful shutdown
/// ledger.close();
/// ```
pub struct Ledger {
    /// The event log.
    pub log: Arc<InMemoryEventLog>,

    /// The buffered record store.
    pub store: BufferedStore,

    /// Background snapshot worker, present when a snapshot store was
    /// configured.
    snapshotter: Option<Snapshotter>,
}

impl Ledger {
    /// Create a fully in-memory ledger with no backends attached.
    ///
    /// Nothing survives a drop. Use for tests, caching, and temporary
    /// computation.
    pub fn in_memory() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for ledger configuration.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let ledger = Ledger::builder()
    ///     .store_backend(Arc::new(FileBackend::new("./data")?))
    ///     .snapshot_threshold(1000)
    ///     .build()?;
    /// ```
    pub fn builder() -> LedgerBuilder {
        LedgerBuilder::new()
    }

    /// Capture a snapshot of the event log immediately.
    ///
    /// Returns the id of the new snapshot. Fails when no snapshot
    /// store was configured.
    pub fn snapshot_now(&self) -> Result<u64> {
        match &self.snapshotter {
            Some(snapshotter) => snapshotter.snapshot_now(),
            None => Err(Error::backend("no snapshot store configured")),
        }
    }

    /// Gracefully shut the ledger down.
    ///
    /// Stops the snapshotter and drains any buffered store writes.
    /// Consumes the ledger; it cannot be used afterwards.
    pub fn close(mut self) {
        if let Some(mut snapshotter) = self.snapshotter.take() {
            snapshotter.shutdown();
        }
        self.store.shutdown();
        debug!("ledger closed");
    }
}

/// Builder for ledger configuration.
///
/// # Example
///
/// ```ignore
/// // Durable records, snapshot every 5 minutes, keep the last 5
/// let ledger = Ledger::builder()
///     .store_backend(Arc::new(FileBackend::new("./data")?))
///     .write_mode(WriteMode::Async)
///     .snapshot_store(Arc::new(BufferedStore::with_backend(
///         Arc::new(FileBackend::new("./snapshots")?),
///         WriteMode::Sync,
///     )))
///     .snapshot_interval(Duration::from_secs(300))
///     .snapshot_retention(5)
///     .build()?;
/// ```
pub struct LedgerBuilder {
    max_events: Option<u64>,
    store_backend: Option<Arc<dyn StoreBackend>>,
    write_mode: WriteMode,
    snapshot_store: Option<Arc<dyn Store>>,
    snapshot_interval: Option<Duration>,
    snapshot_threshold: Option<u64>,
    snapshot_retention: usize,
    snapshot_namespace: String,
}

impl LedgerBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        let defaults = SnapshotterConfig::default();
        Self {
            max_events: None,
            store_backend: None,
            write_mode: WriteMode::Sync,
            snapshot_store: None,
            snapshot_interval: None,
            snapshot_threshold: None,
            snapshot_retention: defaults.retention,
            snapshot_namespace: defaults.namespace,
        }
    }

    /// Cap the event log at `max_events` total events.
    pub fn max_events(mut self, max_events: u64) -> Self {
        self.max_events = Some(max_events);
        self
    }

    /// Attach a durable backend to the record store.
    ///
    /// The store loads existing records from it at build time and
    /// mirrors every write to it afterwards.
    pub fn store_backend(mut self, backend: Arc<dyn StoreBackend>) -> Self {
        self.store_backend = Some(backend);
        self
    }

    /// How record writes reach the backend: inline or via a
    /// background writer. Ignored without a backend.
    pub fn write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    /// Attach a snapshot store.
    ///
    /// Enables restore-at-open for the event log and starts the
    /// snapshotter. Without an interval or threshold, snapshots are
    /// only taken via [`Ledger::snapshot_now`].
    pub fn snapshot_store(mut self, store: Arc<dyn Store>) -> Self {
        self.snapshot_store = Some(store);
        self
    }

    /// Capture a snapshot on this recurring interval.
    pub fn snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = Some(interval);
        self
    }

    /// Capture a snapshot after this many appended events.
    pub fn snapshot_threshold(mut self, threshold: u64) -> Self {
        self.snapshot_threshold = Some(threshold);
        self
    }

    /// Keep at most this many snapshots (default 3).
    pub fn snapshot_retention(mut self, retention: usize) -> Self {
        self.snapshot_retention = retention;
        self
    }

    /// Key namespace for snapshots within the snapshot store
    /// (default `"snapshots"`).
    pub fn snapshot_namespace(mut self, namespace: &str) -> Self {
        self.snapshot_namespace = namespace.to_string();
        self
    }

    /// Assemble the ledger.
    ///
    /// Restores the event log from the snapshot store when one is
    /// attached, then starts the snapshotter against the running log.
    pub fn build(self) -> Result<Ledger> {
        let store = match self.store_backend {
            Some(backend) => BufferedStore::with_backend(backend, self.write_mode),
            None => BufferedStore::new(),
        };

        let log = Arc::new(InMemoryEventLog::with_config(EventLogConfig {
            max_events: self.max_events,
            snapshot_store: self.snapshot_store.clone(),
            snapshot_namespace: self.snapshot_namespace.clone(),
        }));

        let snapshotter = self.snapshot_store.map(|snapshot_store| {
            Snapshotter::start(
                Arc::clone(&log) as Arc<dyn ledger_log::EventLog>,
                snapshot_store,
                SnapshotterConfig {
                    capture_interval: self.snapshot_interval,
                    event_threshold: self.snapshot_threshold,
                    retention: self.snapshot_retention,
                    namespace: self.snapshot_namespace,
                    ..SnapshotterConfig::default()
                },
            )
        });

        debug!(
            restored_events = log.event_count(),
            snapshotter = snapshotter.is_some(),
            "ledger assembled"
        );

        Ok(Ledger {
            log,
            store,
            snapshotter,
        })
    }
}

impl Default for LedgerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
