//! # Redis Cache Implementation
//!
//! Async Redis access for the feed server: the durable cache snapshot (two
//! plain string keys) and read-only JSON values written by other services.
//!
//! The connection is opened on first use. If Redis is down at that point the
//! call fails and the next call tries again; once connected, the
//! `ConnectionManager` handles reconnects itself.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::cache::{CacheEntry, CacheSnapshot, SnapshotStore, StoreError};

/// Key holding the JSON map of source key to cache entry.
pub const DATA_STORE_KEY: &str = "dataStore";
/// Key holding the ISO timestamp of the last successful update, `""` if none.
pub const LAST_UPDATE_KEY: &str = "lastUpdateTime";

impl From<RedisError> for StoreError {
    fn from(e: RedisError) -> Self {
        StoreError::Redis(e.to_string())
    }
}

/// A `SnapshotStore` backed by Redis.
pub struct RedisSnapshotStore {
    client: Client,
    /// Set by the first successful connect; empty until then.
    conn: OnceCell<ConnectionManager>,
}

impl RedisSnapshotStore {
    /// Parses the URL without touching the network.
    ///
    /// # Arguments
    /// * `url` - The redis URL (e.g., "redis://127.0.0.1/").
    pub fn open(url: &str) -> Result<Self, StoreError> {
        Ok(Self {
            client: Client::open(url)?,
            conn: OnceCell::new(),
        })
    }

    /// Opens the store and connects straight away.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let store = Self::open(url)?;
        store.ensure_connected().await?;
        Ok(store)
    }

    /// Connects if no connection exists yet.
    pub async fn ensure_connected(&self) -> Result<(), StoreError> {
        self.connection().await.map(|_| ())
    }

    /// True once a connection has been established.
    pub fn is_connected(&self) -> bool {
        self.conn.initialized()
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let conn = ConnectionManager::new(self.client.clone()).await?;
                tracing::info!("Connected to Redis");
                Ok::<_, StoreError>(conn)
            })
            .await?;
        Ok(conn.clone())
    }

    /// Reads a JSON value stored by another service. `Ok(None)` when the key
    /// does not exist.
    pub async fn get_json(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn.get(key).await?;
        raw.map(|s| serde_json::from_str(&s)).transpose().map_err(StoreError::from)
    }
}

#[async_trait]
impl SnapshotStore for RedisSnapshotStore {
    async fn load(&self) -> Result<Option<CacheSnapshot>, StoreError> {
        let mut conn = self.connection().await?;
        let entries: Option<String> = conn.get(DATA_STORE_KEY).await?;
        let last_update: Option<String> = conn.get(LAST_UPDATE_KEY).await?;

        let Some(raw) = entries else {
            return Ok(None);
        };
        let entries: BTreeMap<String, CacheEntry> = serde_json::from_str(&raw)?;
        Ok(Some(CacheSnapshot {
            entries,
            last_update_time: last_update.as_deref().and_then(parse_last_update),
        }))
    }

    async fn persist(&self, snapshot: &CacheSnapshot) -> Result<(), StoreError> {
        let entries = serde_json::to_string(&snapshot.entries)?;
        let last_update = snapshot
            .last_update_time
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_default();

        let mut conn = self.connection().await?;
        // Both keys change together or not at all.
        let () = redis::pipe()
            .atomic()
            .set(DATA_STORE_KEY, entries)
            .ignore()
            .set(LAST_UPDATE_KEY, last_update)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

fn parse_last_update(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!(value = raw, error = %e, "Ignoring unreadable {}", LAST_UPDATE_KEY);
            None
        }
    }
}
