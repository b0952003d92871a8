//! # Ledger
//!
//! Embedded persistence layer for multi-agent runtimes.
//!
//! Ledger combines three pieces behind one entry point:
//!
//! - an append-only, stream-partitioned **event log** with gapless
//!   per-stream numbering and a global total order
//! - a **buffered store** for JSON records: an authoritative in-memory
//!   cache with an optional durable backend and a filter/query layer
//! - a **snapshotter** that periodically captures full log state so a
//!   restarted log resumes where it left off
//!
//! ## Quick Start
//!
//! ```ignore
//! use ledgerdb::prelude::*;
//!
//! let ledger = Ledger::in_memory()?;
//!
//! // Append events to a stream
//! ledger.log.append("run:42", vec![
//!     AppendEvent::new("task_started", json!({"task": "plan"})),
//! ])?;
//!
//! // Store and query records
//! ledger.store.put("agent:1", json!({"role": "planner", "score": 9}))?;
//! let planners = ledger.store.query(
//!     &Filter::new().where_("role", Operator::Eq, json!("planner")),
//! )?;
//!
//! // Graceful shutdown
//! ledger.close();
//! ```
//!
//! ## Components
//!
//! - [`Ledger`] / [`LedgerBuilder`] - assembly and lifecycle
//! - [`InMemoryEventLog`] - the [`EventLog`] reference backend
//! - [`BufferedStore`] - the [`Store`] implementation, with
//!   [`StoreBackend`] as the durability seam
//! - [`Snapshotter`] - background snapshot capture with retention
//! - [`Filter`] - predicate, ordering, and pagination for queries

#![warn(missing_docs)]

mod error;
mod ledger;

pub mod prelude;

// Re-export main entry points
pub use crate::ledger::{Ledger, LedgerBuilder};
pub use error::{Error, Result};

// Re-export component types
pub use ledger_core::{
    AppendEvent, Condition, Direction, Event, Filter, JsonValue, Operator,
    Record, Snapshot, SnapshotMeta,
};
pub use ledger_log::{
    EventLog, EventLogConfig, EventNotification, EventSubscription,
    InMemoryEventLog, ReadAllOptions, ReadDirection, ReadStreamOptions,
    Snapshotter, SnapshotterConfig, SubscriptionTarget, DEFAULT_READ_LIMIT,
};
pub use ledger_store::{
    AggregateOp, BufferedStore, FileBackend, MemoryBackend, Store,
    StoreBackend, WriteMode,
};
