//! Cache values and the persisted snapshot shape.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the front end serves for one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Latest successful summary, `null` when there has never been one.
    pub data: Option<Value>,
    /// True when the entry does not hold a successful summary.
    pub error: bool,
}

impl CacheEntry {
    /// A freshly computed summary.
    pub fn success(data: Value) -> Self {
        Self {
            data: Some(data),
            error: false,
        }
    }

    /// The `{data: null, error: true}` placeholder.
    pub fn placeholder() -> Self {
        Self {
            data: None,
            error: true,
        }
    }

    /// True if this entry holds a successful summary.
    pub fn is_success(&self) -> bool {
        !self.error
    }
}

/// Full cache state written to and read from the durable store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub entries: BTreeMap<String, CacheEntry>,
    pub last_update_time: Option<DateTime<Utc>>,
}
