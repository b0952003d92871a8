//! Core data model for the ledger persistence layer.
//!
//! This crate defines the fundamental types shared by every other crate
//! in the workspace:
//!
//! - [`Event`] / [`AppendEvent`]: immutable log entries and their
//!   append-time input form
//! - [`Record`]: the row type managed by the buffered store
//! - [`Filter`]: a pure, serializable predicate/ordering/pagination
//!   description evaluated against in-memory record collections
//! - [`Snapshot`] / [`SnapshotMeta`]: point-in-time log captures
//! - [`Error`] / [`Result`]: the shared error surface
//!
//! Everything here is pure data plus pure functions. No I/O, no locks,
//! no background work - those live in `ledger-store` and `ledger-log`.

pub mod error;
pub mod event;
pub mod filter;
pub mod record;
pub mod snapshot;

pub use error::{Error, Result};
pub use event::{AppendEvent, Event};
pub use filter::{Condition, Direction, Filter, Operator};
pub use record::Record;
pub use snapshot::{Snapshot, SnapshotMeta};

/// Re-export of the JSON value type used for all opaque payloads.
pub use serde_json::Value as JsonValue;
