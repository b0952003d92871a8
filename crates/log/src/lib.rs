//! Append-only, stream-partitioned event log with snapshot recovery.
//!
//! ## Design
//!
//! - [`EventLog`]: the contract every log backend satisfies. Backends
//!   are interchangeable: identical input sequences must produce
//!   numerically identical `event_number`/`global_position`
//!   assignments.
//! - [`InMemoryEventLog`]: the reference backend. Appends are
//!   serialized through a single commit lock (one logical writer per
//!   log instance); reads go straight to concurrent maps and never
//!   block the writer.
//! - [`Snapshotter`]: a background worker that captures full log
//!   state on a timer, an event-count threshold, or an explicit call,
//!   with retention pruning. Restore happens at log startup from the
//!   same store.
//!
//! Subscribers receive every committed matching event exactly once, in
//! commit order, delivered synchronously inside the commit path. A
//! subscriber whose receiving end has been dropped is detected on the
//! next delivery attempt and pruned silently.

mod log;
mod snapshotter;
mod subscription;

pub use crate::log::{
    EventLog, EventLogConfig, InMemoryEventLog, ReadAllOptions, ReadDirection,
    ReadStreamOptions, DEFAULT_READ_LIMIT,
};
pub use snapshotter::{Snapshotter, SnapshotterConfig};
pub use subscription::{EventNotification, EventSubscription, SubscriptionTarget};
