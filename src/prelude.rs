//! Convenient imports for Ledger.
//!
//! Re-exports the commonly used types so most programs need a single
//! import:
//!
//! ```ignore
//! use ledgerdb::prelude::*;
//!
//! let ledger = Ledger::in_memory()?;
//! ledger.store.put("key", json!({"n": 1}))?;
//! ```

// Main entry point
pub use crate::ledger::{Ledger, LedgerBuilder};

// Error handling
pub use crate::error::{Error, Result};

// Events and streams
pub use ledger_core::{AppendEvent, Event};
pub use ledger_log::{
    EventLog, ReadAllOptions, ReadDirection, ReadStreamOptions, SubscriptionTarget,
};

// Records and queries
pub use ledger_core::{Direction, Filter, JsonValue, Operator, Record};
pub use ledger_store::{AggregateOp, FileBackend, Store, StoreBackend, WriteMode};

// Re-export serde_json for convenience
pub use serde_json::json;
