//! Periodic full-state capture for the event log.
//!
//! The snapshotter is an independent worker communicating with the
//! log exclusively through its public read API, and with its snapshot
//! store through the unified store contract. Three triggers exist:
//!
//! - a recurring timer (`capture_interval`)
//! - an event-count threshold, observed via the snapshotter's own
//!   `All` subscription to the log
//! - an explicit [`Snapshotter::snapshot_now`] call
//!
//! All three funnel into one capture routine executed strictly
//! sequentially on the worker thread, so concurrent or back-to-back
//! firings simply produce another sequential snapshot and can never
//! corrupt a prior one. Capture failures are logged and never
//! propagated to the log.
//!
//! If the subscription cannot be established at startup (component
//! start order is not assumed), the worker retries on an interval
//! instead of failing permanently.

use chrono::Utc;
use ledger_core::{Result, Snapshot, SnapshotMeta};
use ledger_store::Store;
use std::collections::BTreeMap;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::log::{EventLog, ReadAllOptions, DEFAULT_READ_LIMIT};
use crate::subscription::SubscriptionTarget;

/// Worker poll granularity. Bounds trigger latency.
const TICK: Duration = Duration::from_millis(25);

/// Configuration for the [`Snapshotter`].
#[derive(Debug, Clone)]
pub struct SnapshotterConfig {
    /// Capture on this recurring interval, when set.
    pub capture_interval: Option<Duration>,
    /// Capture after this many observed events, when set.
    pub event_threshold: Option<u64>,
    /// Maximum number of snapshots kept; older bodies are deleted
    /// after each capture.
    pub retention: usize,
    /// Key namespace within the snapshot store.
    pub namespace: String,
    /// Delay between subscription attempts while the log is not yet
    /// available.
    pub subscribe_retry: Duration,
}

impl Default for SnapshotterConfig {
    fn default() -> Self {
        Self {
            capture_interval: None,
            event_threshold: None,
            retention: 3,
            namespace: "snapshots".to_string(),
            subscribe_retry: Duration::from_secs(1),
        }
    }
}

enum Command {
    CaptureNow(Sender<Result<u64>>),
    Shutdown,
}

/// Background snapshot worker for one event log.
///
/// Stops and joins its thread on [`Snapshotter::shutdown`] or drop.
pub struct Snapshotter {
    tx: Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

impl Snapshotter {
    /// Spawn the snapshot worker.
    pub fn start(
        log: Arc<dyn EventLog>,
        store: Arc<dyn Store>,
        config: SnapshotterConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<Command>();
        let handle = std::thread::Builder::new()
            .name("ledger-snapshotter".to_string())
            .spawn(move || {
                let worker = Worker { log, store, config };
                worker.run(rx);
            })
            .expect("failed to spawn snapshotter thread");
        Self {
            tx,
            handle: Some(handle),
        }
    }

    /// Capture a snapshot immediately.
    ///
    /// Routed through the worker's sequential command queue, so it
    /// serializes with timer- and threshold-triggered captures.
    /// Returns the new snapshot id.
    pub fn snapshot_now(&self) -> Result<u64> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(Command::CaptureNow(reply_tx))
            .map_err(|_| ledger_core::Error::backend("snapshotter is not running"))?;
        reply_rx
            .recv()
            .map_err(|_| ledger_core::Error::backend("snapshotter stopped mid-capture"))?
    }

    /// Stop the worker and join its thread. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.tx.send(Command::Shutdown);
            if handle.join().is_err() {
                warn!("snapshotter thread panicked during shutdown");
            }
        }
    }
}

impl Drop for Snapshotter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    log: Arc<dyn EventLog>,
    store: Arc<dyn Store>,
    config: SnapshotterConfig,
}

impl Worker {
    fn run(&self, rx: mpsc::Receiver<Command>) {
        // Component start order is not assumed: retry the subscription
        // until the log is reachable, serving control commands in the
        // meantime.
        let subscription = loop {
            match self.log.subscribe(SubscriptionTarget::All) {
                Ok(subscription) => break subscription,
                Err(e) => {
                    warn!(error = %e, "event log not available; retrying subscription");
                    match rx.recv_timeout(self.config.subscribe_retry) {
                        Ok(Command::CaptureNow(reply)) => {
                            let _ = reply.send(self.capture());
                        }
                        Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => return,
                        Err(RecvTimeoutError::Timeout) => {}
                    }
                }
            }
        };

        let mut events_since_capture: u64 = 0;
        let mut last_capture = Instant::now();

        loop {
            match rx.recv_timeout(TICK) {
                Ok(Command::CaptureNow(reply)) => {
                    let result = self.capture();
                    events_since_capture = 0;
                    last_capture = Instant::now();
                    let _ = reply.send(result);
                }
                Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => return,
                Err(RecvTimeoutError::Timeout) => {}
            }

            events_since_capture += subscription.drain().len() as u64;

            let threshold_hit = self
                .config
                .event_threshold
                .is_some_and(|threshold| events_since_capture >= threshold);
            let interval_hit = self
                .config
                .capture_interval
                .is_some_and(|interval| last_capture.elapsed() >= interval);

            if threshold_hit || interval_hit {
                if let Err(e) = self.capture() {
                    warn!(error = %e, "snapshot capture failed");
                }
                events_since_capture = 0;
                last_capture = Instant::now();
            }
        }
    }

    fn meta_key(&self) -> String {
        format!("{}/meta", self.config.namespace)
    }

    fn body_key(&self, id: u64) -> String {
        format!("{}/{}", self.config.namespace, id)
    }

    /// Capture the log's full current state as the next sequential
    /// snapshot, then prune bodies beyond the retention window.
    ///
    /// Idempotent with respect to concurrent triggers: every call just
    /// produces another sequential snapshot.
    fn capture(&self) -> Result<u64> {
        let mut meta = self.load_meta();
        let id = meta.latest_id + 1;

        // Page the whole log through the public read API. Positions,
        // versions, and the global position are derived from the
        // events actually read, so the body is internally consistent
        // even if appends race the capture.
        let mut events = Vec::new();
        let mut from = 1u64;
        loop {
            let page = self.log.read_all(ReadAllOptions {
                from: Some(from),
                limit: Some(DEFAULT_READ_LIMIT),
            })?;
            let got = page.len();
            events.extend(page);
            if got < DEFAULT_READ_LIMIT {
                break;
            }
            from += got as u64;
        }

        let mut stream_versions: BTreeMap<String, u64> = BTreeMap::new();
        for event in &events {
            *stream_versions.entry(event.stream_id.clone()).or_insert(0) += 1;
        }
        let global_position = events.last().map(|e| e.global_position).unwrap_or(0);

        let snapshot = Snapshot {
            id,
            global_position,
            stream_versions,
            events,
            captured_at: Utc::now(),
        };

        self.store
            .put(&self.body_key(id), serde_json::to_value(&snapshot)?)?;

        meta.record(id);
        for stale in meta.prune(self.config.retention) {
            if let Err(e) = self.store.delete(&self.body_key(stale)) {
                warn!(snapshot_id = stale, error = %e, "failed to delete pruned snapshot");
            }
        }
        self.store
            .put(&self.meta_key(), serde_json::to_value(&meta)?)?;

        debug!(
            snapshot_id = id,
            global_position = snapshot.global_position,
            retained = meta.snapshot_ids.len(),
            "captured snapshot"
        );
        Ok(id)
    }

    /// Current meta, or a fresh one when absent or undecodable.
    fn load_meta(&self) -> SnapshotMeta {
        match self.store.get(&self.meta_key()) {
            Ok(raw) => match serde_json::from_value(raw) {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(error = %e, "undecodable snapshot meta; starting a fresh sequence");
                    SnapshotMeta::default()
                }
            },
            Err(e) if e.is_not_found() => SnapshotMeta::default(),
            Err(e) => {
                warn!(error = %e, "snapshot meta unreadable; starting a fresh sequence");
                SnapshotMeta::default()
            }
        }
    }
}
