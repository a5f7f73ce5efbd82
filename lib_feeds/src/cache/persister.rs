//! # Snapshot Persister
//!
//! Writes cache snapshots to the durable store one at a time. The async mutex
//! is held across "take snapshot" and "write", so the store receives
//! snapshots in generation order and an older snapshot can never land after a
//! newer one.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::snapshot::{SnapshotStore, StoreError};
use super::store::CacheStore;

/// What a persist call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The snapshot at this generation was written.
    Written(u64),
    /// Nothing changed since the last successful write.
    UpToDate,
}

pub struct Persister {
    cache: Arc<CacheStore>,
    store: Arc<dyn SnapshotStore>,
    last_written: Mutex<Option<u64>>,
}

impl Persister {
    pub fn new(cache: Arc<CacheStore>, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            cache,
            store,
            last_written: Mutex::new(None),
        }
    }

    /// Loads the durable snapshot into the cache. Returns the number of
    /// entries restored.
    pub async fn restore(&self) -> Result<usize, StoreError> {
        match self.store.load().await? {
            Some(snapshot) => {
                let count = snapshot.entries.len();
                self.cache.load_snapshot(snapshot);
                Ok(count)
            }
            None => Ok(0),
        }
    }

    /// Writes the current cache state if it changed since the last write.
    pub async fn persist(&self) -> Result<PersistOutcome, StoreError> {
        let mut last_written = self.last_written.lock().await;
        let (generation, snapshot) = self.cache.snapshot();
        if last_written.is_some_and(|written| written >= generation) {
            return Ok(PersistOutcome::UpToDate);
        }
        self.store.persist(&snapshot).await?;
        *last_written = Some(generation);
        Ok(PersistOutcome::Written(generation))
    }

    /// [`Persister::persist`], logging instead of returning the error.
    pub async fn persist_logged(&self) {
        match self.persist().await {
            Ok(PersistOutcome::Written(generation)) => {
                tracing::debug!(generation, "Cache snapshot persisted");
            }
            Ok(PersistOutcome::UpToDate) => {}
            Err(e) => {
                tracing::error!(error = %e, "Failed to persist cache snapshot; serving from memory");
            }
        }
    }
}
