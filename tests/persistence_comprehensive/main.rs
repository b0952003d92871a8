//! Persistence Comprehensive Test Suite
//!
//! End-to-end tests through the `Ledger` facade, exercising the event
//! log, the buffered store, and the snapshotter as one assembled
//! system rather than in isolation.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run the whole suite
//! cargo test --test persistence_comprehensive
//!
//! # Run one area
//! cargo test --test persistence_comprehensive event_log::
//! ```

use ledgerdb::prelude::*;
use ledgerdb::BufferedStore;
use std::sync::Arc;

// Test modules
pub mod durability;
pub mod snapshots;
pub mod store_queries;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// Install the test-writer subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A fully in-memory ledger with no backends attached.
pub fn in_memory_ledger() -> Ledger {
    init_tracing();
    Ledger::in_memory().expect("failed to build in-memory ledger")
}

/// A store suitable for holding snapshots in tests.
pub fn snapshot_store() -> Arc<dyn Store> {
    Arc::new(BufferedStore::new())
}

/// Append `n` single-event batches of type `event_type` to a stream.
pub fn append_batches(ledger: &Ledger, stream: &str, event_type: &str, n: usize) -> Vec<Event> {
    let mut out = Vec::new();
    for i in 0..n {
        let appended = ledger
            .log
            .append(stream, vec![AppendEvent::new(event_type, json!({ "seq": i }))])
            .expect("append failed");
        out.extend(appended);
    }
    out
}
