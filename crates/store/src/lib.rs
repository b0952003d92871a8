//! Buffered store: an authoritative in-memory cache paired with an
//! optional pluggable durable backend.
//!
//! ## Design
//!
//! - [`BufferedStore`]: DashMap cache, lock-free reads, writes
//!   propagated to the backend either synchronously or through a
//!   background writer thread
//! - [`Store`]: the unified contract other subsystems consume
//! - [`StoreBackend`]: the durable side, injected at construction
//! - [`MemoryBackend`] / [`FileBackend`]: reference backends
//!
//! A successful `put` is a cache-commit guarantee only. Backend
//! failures are logged and never surfaced through the API; the cache
//! stays authoritative and keeps serving reads regardless of backend
//! health.

mod backend;
mod buffered;
mod file;

pub use backend::{MemoryBackend, StoreBackend};
pub use buffered::{AggregateOp, BufferedStore, Store, WriteMode};
pub use file::FileBackend;
