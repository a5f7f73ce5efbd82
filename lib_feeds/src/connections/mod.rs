//! # Connections Module
//!
//! This module handles persistent connections to external services, currently
//! the Redis instance holding the cache snapshot and the dashboard extras.

/// Module for the Redis snapshot store and extras reader.
pub mod cache_redis;

pub use cache_redis::{RedisSnapshotStore, DATA_STORE_KEY, LAST_UPDATE_KEY};
