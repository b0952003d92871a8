//! Snapshot payload shapes for event log recovery.
//!
//! A [`Snapshot`] is a full point-in-time capture of one log
//! instance: the global position, every stream's version, and the
//! complete event list in global order - enough to rehydrate a log
//! without replaying from the beginning. [`SnapshotMeta`] tracks which
//! snapshot ids are currently retained.
//!
//! Both shapes are backend-agnostic JSON; `captured_at` serializes as
//! an ISO-8601 string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::event::Event;

/// A point-in-time capture of a log's full state.
///
/// Snapshots are append-only: created once by the snapshotter, never
/// mutated, and deleted only by retention pruning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Sequential snapshot id, scoped to one log instance.
    pub id: u64,
    /// Global position of the log at capture time.
    pub global_position: u64,
    /// Version of every stream at capture time.
    pub stream_versions: BTreeMap<String, u64>,
    /// Every event in the log, in global-position order.
    pub events: Vec<Event>,
    /// Capture timestamp.
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    /// Number of events captured.
    pub fn event_count(&self) -> u64 {
        self.events.len() as u64
    }
}

/// Tracks the latest snapshot id and the ascending list of retained
/// snapshot ids for one log instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Id of the most recent snapshot.
    pub latest_id: u64,
    /// Ids of all currently-retained snapshots, ascending. Bounded by
    /// the configured retention.
    pub snapshot_ids: Vec<u64>,
}

impl SnapshotMeta {
    /// Record a newly captured snapshot.
    pub fn record(&mut self, id: u64) {
        self.latest_id = id;
        self.snapshot_ids.push(id);
    }

    /// Ids that fall outside the retention window, oldest first.
    ///
    /// Removes them from `snapshot_ids`; the caller is responsible for
    /// deleting the corresponding bodies.
    pub fn prune(&mut self, retention: usize) -> Vec<u64> {
        if self.snapshot_ids.len() <= retention {
            return Vec::new();
        }
        let excess = self.snapshot_ids.len() - retention;
        self.snapshot_ids.drain(..excess).collect()
    }
}
