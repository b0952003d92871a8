//! The event log contract and its in-memory backend.
//!
//! ## Numbering rule
//!
//! Two counters advance together, atomically, for a whole batch:
//! the per-stream version (producing `event_number`) and the log-wide
//! position (producing `global_position`). No other append may
//! interleave mid-batch. This is the compatibility contract across
//! backends: identical input sequences must yield numerically
//! identical results from any conforming implementation.
//!
//! ## Concurrency
//!
//! All mutation is serialized through one commit lock - the single
//! logical writer per log instance. Commit sequence under the lock:
//!
//! 1. Capacity check (`max_events`); reject with no state change
//! 2. Number the batch and insert events into the position map
//! 3. Update the stream index
//! 4. Publish the global position counter
//! 5. Deliver to subscribers, pruning dead ones
//!
//! Reads (`read_stream`, `read_all`, derived queries) never take the
//! commit lock; they hit the concurrent maps directly. Because events
//! are inserted before the counter is published, any position a
//! reader observes is fully present.

use chrono::Utc;
use dashmap::DashMap;
use ledger_core::{AppendEvent, Error, Event, Result, Snapshot, SnapshotMeta};
use ledger_store::Store;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::subscription::{EventNotification, EventSubscription, SubscriptionTarget};

/// Default bound on `read_all` results when the caller gives no limit.
pub const DEFAULT_READ_LIMIT: usize = 1000;

/// Direction for `read_stream`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadDirection {
    /// Ascending `event_number` (oldest first). The default.
    #[default]
    Forward,
    /// Descending `event_number` (newest first).
    Backward,
}

/// Options for `read_stream`.
#[derive(Debug, Clone, Default)]
pub struct ReadStreamOptions {
    /// Event-number bound: lower bound going forward, upper bound
    /// going backward. Defaults to the stream edge for the direction.
    pub from: Option<u64>,
    /// Maximum number of events returned. Unbounded when absent.
    pub limit: Option<usize>,
    /// Read direction.
    pub direction: ReadDirection,
}

impl ReadStreamOptions {
    /// Read a stream backward (newest first).
    pub fn backward() -> Self {
        Self {
            direction: ReadDirection::Backward,
            ..Default::default()
        }
    }
}

/// Options for `read_all`.
#[derive(Debug, Clone, Default)]
pub struct ReadAllOptions {
    /// Global-position lower bound (inclusive). Defaults to 1.
    pub from: Option<u64>,
    /// Maximum number of events returned. Defaults to
    /// [`DEFAULT_READ_LIMIT`] to bound memory.
    pub limit: Option<usize>,
}

/// The event log contract.
///
/// One coherent behavior implemented by interchangeable backends; the
/// trait is the injection seam. Object-safe so consumers can hold
/// `Arc<dyn EventLog>`.
pub trait EventLog: Send + Sync {
    /// Append a batch of events to a stream, atomically.
    ///
    /// Assigns `event_number = stream version + 1..=+N` and
    /// `global_position = log position + 1..=+N`. Either every event
    /// in the batch is numbered and stored, or none are. Returns
    /// [`Error::EventLogFull`] with no state change when a configured
    /// capacity would be exceeded.
    fn append(&self, stream_id: &str, events: Vec<AppendEvent>) -> Result<Vec<Event>>;

    /// Read events from one stream.
    ///
    /// A nonexistent stream yields `Ok(vec![])`, never an error.
    fn read_stream(&self, stream_id: &str, opts: ReadStreamOptions) -> Result<Vec<Event>>;

    /// Read events across all streams, ordered by `global_position`.
    fn read_all(&self, opts: ReadAllOptions) -> Result<Vec<Event>>;

    /// Register a subscriber for subsequently appended events.
    fn subscribe(&self, target: SubscriptionTarget) -> Result<EventSubscription>;

    /// True when the stream has at least one event.
    fn stream_exists(&self, stream_id: &str) -> bool;

    /// Current version of a stream; 0 for unknown streams.
    fn stream_version(&self, stream_id: &str) -> u64;

    /// Names of all streams with at least one event.
    fn list_streams(&self) -> Vec<String>;

    /// Number of distinct streams.
    fn stream_count(&self) -> usize;

    /// Total number of events in the log.
    fn event_count(&self) -> u64;
}

/// Configuration for [`InMemoryEventLog`].
#[derive(Clone)]
pub struct EventLogConfig {
    /// Capacity guard: appends that would push the log past this many
    /// events are rejected. Unbounded when absent.
    pub max_events: Option<u64>,
    /// Snapshot store consulted once at startup to rehydrate state.
    pub snapshot_store: Option<Arc<dyn Store>>,
    /// Key namespace within the snapshot store.
    pub snapshot_namespace: String,
}

impl EventLogConfig {
    /// Config with defaults: unbounded, no snapshot store, namespace
    /// `"snapshots"`.
    pub fn new() -> Self {
        Self {
            max_events: None,
            snapshot_store: None,
            snapshot_namespace: "snapshots".to_string(),
        }
    }
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default, Clone)]
struct StreamIndex {
    /// Current stream version (== number of events in the stream).
    version: u64,
    /// Global position of each event, indexed by `event_number - 1`.
    positions: Vec<u64>,
}

struct Subscriber {
    target: SubscriptionTarget,
    tx: mpsc::Sender<EventNotification>,
}

/// In-memory event log backend.
///
/// Events live in a position-keyed `DashMap` for lock-free reads; a
/// second map holds per-stream indexes. All writes funnel through one
/// commit lock.
pub struct InMemoryEventLog {
    /// Events keyed by `global_position`. Gapless from 1.
    events: DashMap<u64, Event>,
    /// Per-stream version and position index.
    streams: DashMap<String, StreamIndex>,
    /// Last committed global position. Published after events are
    /// inserted, so every observable position is fully present.
    global_position: AtomicU64,
    /// Serializes appends and subscriber delivery.
    commit_lock: Mutex<()>,
    /// Registered subscribers; pruned on failed delivery.
    subscribers: Mutex<Vec<Subscriber>>,
    max_events: Option<u64>,
}

impl InMemoryEventLog {
    /// Create an empty, unbounded log.
    pub fn new() -> Self {
        Self::with_config(EventLogConfig::new())
    }

    /// Create a log from configuration, restoring from the snapshot
    /// store when one is present.
    ///
    /// Restore is best-effort: absence of snapshot meta, absence of a
    /// body, an undecodable body, or an unreachable store all resolve
    /// to starting empty. None of them prevent startup.
    pub fn with_config(config: EventLogConfig) -> Self {
        let log = Self {
            events: DashMap::new(),
            streams: DashMap::new(),
            global_position: AtomicU64::new(0),
            commit_lock: Mutex::new(()),
            subscribers: Mutex::new(Vec::new()),
            max_events: config.max_events,
        };

        if let Some(store) = &config.snapshot_store {
            match Self::load_snapshot(store.as_ref(), &config.snapshot_namespace) {
                Ok(Some(snapshot)) => log.install_snapshot(snapshot),
                Ok(None) => debug!("no snapshot found; starting empty"),
                Err(e) => {
                    warn!(error = %e, "snapshot restore failed; starting empty");
                }
            }
        }

        log
    }

    /// Fetch the latest snapshot from the store, if any.
    fn load_snapshot(store: &dyn Store, namespace: &str) -> Result<Option<Snapshot>> {
        let meta_raw = match store.get(&format!("{namespace}/meta")) {
            Ok(raw) => raw,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        let meta: SnapshotMeta = serde_json::from_value(meta_raw)?;
        let body = match store.get(&format!("{namespace}/{}", meta.latest_id)) {
            Ok(raw) => raw,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(Some(serde_json::from_value(body)?))
    }

    /// Rehydrate state from a snapshot, equivalent to a full replay of
    /// its events from empty.
    fn install_snapshot(&self, snapshot: Snapshot) {
        let restored_position = snapshot.global_position;
        let event_count = snapshot.events.len();

        for event in snapshot.events {
            let mut index = self.streams.entry(event.stream_id.clone()).or_default();
            index.version += 1;
            index.positions.push(event.global_position);
            drop(index);
            self.events.insert(event.global_position, event);
        }
        self.global_position
            .store(restored_position, Ordering::Release);

        debug!(
            global_position = restored_position,
            events = event_count,
            snapshot_id = snapshot.id,
            "restored event log from snapshot"
        );
    }

    fn last_position(&self) -> u64 {
        self.global_position.load(Ordering::Acquire)
    }
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog for InMemoryEventLog {
    fn append(&self, stream_id: &str, events: Vec<AppendEvent>) -> Result<Vec<Event>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let _guard = self.commit_lock.lock();

        let batch_len = events.len() as u64;
        if let Some(max_events) = self.max_events {
            if self.events.len() as u64 + batch_len > max_events {
                return Err(Error::EventLogFull { max_events });
            }
        }

        let base_position = self.last_position();
        let base_version = self
            .streams
            .get(stream_id)
            .map(|index| index.version)
            .unwrap_or(0);
        let timestamp = Utc::now();

        let committed: Vec<Event> = events
            .into_iter()
            .enumerate()
            .map(|(i, event)| {
                let offset = i as u64 + 1;
                event.into_event(
                    stream_id,
                    base_version + offset,
                    base_position + offset,
                    timestamp,
                )
            })
            .collect();

        // Insert events before touching the index or counter so that
        // any position a reader can observe is already present.
        for event in &committed {
            self.events.insert(event.global_position, event.clone());
        }
        {
            let mut index = self.streams.entry(stream_id.to_string()).or_default();
            index.version = base_version + batch_len;
            index
                .positions
                .extend(committed.iter().map(|e| e.global_position));
        }
        self.global_position
            .store(base_position + batch_len, Ordering::Release);

        // Synchronous delivery inside the commit path keeps
        // per-subscriber order equal to append order. A closed
        // receiver just drops the registration.
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|subscriber| {
            for event in &committed {
                if subscriber.target.matches(&event.stream_id) {
                    let notification = EventNotification {
                        event: event.clone(),
                    };
                    if subscriber.tx.send(notification).is_err() {
                        debug!(stream_id, "pruning dead subscriber");
                        return false;
                    }
                }
            }
            true
        });

        Ok(committed)
    }

    fn read_stream(&self, stream_id: &str, opts: ReadStreamOptions) -> Result<Vec<Event>> {
        let Some(index) = self.streams.get(stream_id) else {
            return Ok(Vec::new());
        };
        let positions = index.positions.clone();
        let version = index.version;
        drop(index);

        let limit = opts.limit.unwrap_or(usize::MAX);
        let selected: Vec<u64> = match opts.direction {
            ReadDirection::Forward => {
                // Per-stream numbering is gapless from 1, so the event
                // numbered `n` sits at positions[n - 1].
                let start = opts.from.unwrap_or(1).max(1) as usize - 1;
                positions.into_iter().skip(start).take(limit).collect()
            }
            ReadDirection::Backward => {
                let end = opts.from.unwrap_or(version).min(version) as usize;
                positions[..end].iter().rev().take(limit).copied().collect()
            }
        };

        Ok(selected
            .into_iter()
            .filter_map(|position| self.events.get(&position).map(|e| e.clone()))
            .collect())
    }

    fn read_all(&self, opts: ReadAllOptions) -> Result<Vec<Event>> {
        let from = opts.from.unwrap_or(1).max(1);
        let limit = opts.limit.unwrap_or(DEFAULT_READ_LIMIT);
        let last = self.last_position();

        let mut out = Vec::new();
        for position in from..=last {
            if out.len() >= limit {
                break;
            }
            if let Some(event) = self.events.get(&position) {
                out.push(event.clone());
            }
        }
        Ok(out)
    }

    fn subscribe(&self, target: SubscriptionTarget) -> Result<EventSubscription> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().push(Subscriber { target, tx });
        Ok(EventSubscription::new(rx))
    }

    fn stream_exists(&self, stream_id: &str) -> bool {
        self.streams.contains_key(stream_id)
    }

    fn stream_version(&self, stream_id: &str) -> u64 {
        self.streams
            .get(stream_id)
            .map(|index| index.version)
            .unwrap_or(0)
    }

    fn list_streams(&self) -> Vec<String> {
        let mut names: Vec<String> = self.streams.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    fn stream_count(&self) -> usize {
        self.streams.len()
    }

    fn event_count(&self) -> u64 {
        self.events.len() as u64
    }
}
