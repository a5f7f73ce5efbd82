//! # Cache Module
//!
//! The in-memory cache the front end reads from, and its durable snapshot.
//!
//! ## Contained Modules:
//!
//! - **`entry`**: `CacheEntry` (`{data, error}`) and `CacheSnapshot`.
//! - **`store`**: `CacheStore`, the single owner of entries, with per-key
//!   attempt ordering.
//! - **`snapshot`**: The `SnapshotStore` trait, `StoreError` and an in-memory
//!   implementation.
//! - **`persister`**: Serialises snapshot writes so they reach the durable
//!   store in order.

pub mod entry;
pub mod persister;
pub mod snapshot;
pub mod store;

pub use entry::{CacheEntry, CacheSnapshot};
pub use persister::{PersistOutcome, Persister};
pub use snapshot::{MemorySnapshotStore, SnapshotStore, StoreError};
pub use store::{AttemptId, CacheStore, CommitOutcome, FailureOutcome};
