//! # Snapshot Store Seam
//!
//! The durable side of the cache. Production uses the Redis implementation in
//! `connections::cache_redis`; `MemorySnapshotStore` backs tests and runs
//! without Redis.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;

use super::entry::CacheSnapshot;

/// Durable store failures. Logged by the caller; the in-memory cache keeps
/// serving.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(String),

    #[error("snapshot (de)serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("snapshot store unavailable: {0}")]
    Unavailable(String),
}

/// Where cache snapshots are kept between restarts.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Reads the last persisted snapshot, `None` if nothing was ever stored.
    async fn load(&self) -> Result<Option<CacheSnapshot>, StoreError>;

    /// Replaces the persisted snapshot.
    async fn persist(&self, snapshot: &CacheSnapshot) -> Result<(), StoreError>;
}

/// Process-local snapshot store.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    stored: Mutex<Option<CacheSnapshot>>,
    failing: AtomicBool,
    persists: AtomicUsize,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `snapshot`, as after a previous run.
    pub fn with_snapshot(snapshot: CacheSnapshot) -> Self {
        Self {
            stored: Mutex::new(Some(snapshot)),
            ..Self::default()
        }
    }

    /// Makes every later call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// The currently stored snapshot.
    pub fn stored(&self) -> Option<CacheSnapshot> {
        self.stored.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of successful persist calls.
    pub fn persist_count(&self) -> usize {
        self.persists.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store set to fail".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Result<Option<CacheSnapshot>, StoreError> {
        self.check()?;
        Ok(self.stored())
    }

    async fn persist(&self, snapshot: &CacheSnapshot) -> Result<(), StoreError> {
        self.check()?;
        *self.stored.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        self.persists.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
