//! Error types for the ledger persistence core.
//!
//! Errors fall into two classes with very different handling rules:
//!
//! - **Capacity errors** ([`Error::EventLogFull`]) are explicit,
//!   synchronous, and never auto-retried. The caller decides whether
//!   to retry or escalate.
//! - **Backend/environment errors** ([`Error::Backend`], [`Error::Io`])
//!   are logged at their origin and never allowed to take down the
//!   in-memory state, which stays authoritative. They only surface
//!   through APIs whose sole job is backend access.
//!
//! [`Error::NotFound`] is the canonical miss shape for every store
//! lookup; backends substituted behind the store contract must
//! preserve it exactly.

use thiserror::Error;

/// Result type alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the ledger persistence core.
#[derive(Debug, Error)]
pub enum Error {
    /// The event log has reached its configured capacity.
    ///
    /// Returned by `append` when storing the batch would exceed
    /// `max_events`. No state is changed. Never auto-retried.
    #[error("event log full: capacity of {max_events} events reached")]
    EventLogFull {
        /// The configured capacity that was exceeded.
        max_events: u64,
    },

    /// Key or entity not found.
    #[error("not found: {key}")]
    NotFound {
        /// The key that was looked up.
        key: String,
    },

    /// A durable backend failed.
    ///
    /// Carries a human-readable description. The in-memory cache/log
    /// remains authoritative when this occurs.
    #[error("backend error: {0}")]
    Backend(String),

    /// Payload (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Construct a `NotFound` error for a key.
    pub fn not_found(key: impl Into<String>) -> Self {
        Error::NotFound { key: key.into() }
    }

    /// Construct a `Backend` error from any displayable cause.
    pub fn backend(cause: impl std::fmt::Display) -> Self {
        Error::Backend(cause.to_string())
    }

    /// True if this error is the canonical miss shape.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
