//! Error handling for the facade.
//!
//! Every component shares one error enum, so the facade simply
//! re-exports it.

pub use ledger_core::{Error, Result};
