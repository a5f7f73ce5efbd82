//! # Cache Store
//!
//! Owns every `CacheEntry`. Lifecycle: construct, load the durable snapshot
//! once, then mutate per key while serving reads.
//!
//! Each key carries two attempt counters. `begin_attempt` hands out the next
//! number before a fetch starts; `commit_success` only applies when its attempt
//! is newer than the last committed one, so a slow retry that finishes after a
//! newer success is dropped. All mutations take a short `std::sync::Mutex`
//! that is never held across an `.await`.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::entry::{CacheEntry, CacheSnapshot};

/// Per-key attempt number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttemptId(pub u64);

/// Result of [`CacheStore::commit_success`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied,
    /// A newer attempt already committed; nothing changed.
    Stale,
}

/// Result of [`CacheStore::record_failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// A previous successful summary is still served.
    KeptPrevious,
    /// No successful summary exists; the error placeholder is served.
    Placeholder,
}

#[derive(Debug, Default)]
struct Slot {
    entry: Option<CacheEntry>,
    issued: u64,
    committed: u64,
}

#[derive(Debug, Default)]
struct Inner {
    slots: BTreeMap<String, Slot>,
    last_update: Option<DateTime<Utc>>,
    generation: u64,
}

/// In-memory map of source key to cache entry.
#[derive(Debug, Default)]
pub struct CacheStore {
    inner: Mutex<Inner>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hands out the next attempt number for `key`.
    pub fn begin_attempt(&self, key: &str) -> AttemptId {
        let mut inner = self.lock();
        let slot = inner.slots.entry(key.to_string()).or_default();
        slot.issued += 1;
        AttemptId(slot.issued)
    }

    /// Stores a successful summary unless a newer attempt already committed.
    pub fn commit_success(&self, key: &str, attempt: AttemptId, data: Value, at: DateTime<Utc>) -> CommitOutcome {
        let mut inner = self.lock();
        let slot = inner.slots.entry(key.to_string()).or_default();
        if attempt.0 <= slot.committed {
            return CommitOutcome::Stale;
        }
        slot.committed = attempt.0;
        slot.issued = slot.issued.max(attempt.0);
        slot.entry = Some(CacheEntry::success(data));
        inner.last_update = Some(at);
        inner.generation += 1;
        CommitOutcome::Applied
    }

    /// Records a failed attempt. A previous success is left untouched;
    /// otherwise the error placeholder is written.
    pub fn record_failure(&self, key: &str, _attempt: AttemptId) -> FailureOutcome {
        let mut inner = self.lock();
        let slot = inner.slots.entry(key.to_string()).or_default();
        if slot.entry.as_ref().is_some_and(CacheEntry::is_success) {
            return FailureOutcome::KeptPrevious;
        }
        slot.entry = Some(CacheEntry::placeholder());
        inner.generation += 1;
        FailureOutcome::Placeholder
    }

    /// True once an attempt newer than `attempt` has committed for `key`.
    pub fn committed_after(&self, key: &str, attempt: AttemptId) -> bool {
        self.lock()
            .slots
            .get(key)
            .map_or(false, |slot| slot.committed > attempt.0)
    }

    /// Copy of one entry.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.lock().slots.get(key).and_then(|slot| slot.entry.clone())
    }

    /// Copy of every entry that has a value.
    pub fn get_all(&self) -> BTreeMap<String, CacheEntry> {
        self.lock()
            .slots
            .iter()
            .filter_map(|(k, slot)| slot.entry.clone().map(|e| (k.clone(), e)))
            .collect()
    }

    /// Overwrites one entry directly, bypassing attempt ordering.
    pub fn set(&self, key: &str, entry: CacheEntry) {
        let mut inner = self.lock();
        inner.slots.entry(key.to_string()).or_default().entry = Some(entry);
        inner.generation += 1;
    }

    /// Instant of the most recent successful commit (or the loaded one).
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.lock().last_update
    }

    /// Seeds entries from a persisted snapshot. Attempt counters are left
    /// alone so loaded values are replaced by the next successful fetch.
    pub fn load_snapshot(&self, snapshot: CacheSnapshot) {
        let mut inner = self.lock();
        for (key, entry) in snapshot.entries {
            inner.slots.entry(key).or_default().entry = Some(entry);
        }
        if snapshot.last_update_time.is_some() {
            inner.last_update = snapshot.last_update_time;
        }
    }

    /// Consistent copy of the whole cache plus its generation counter.
    pub fn snapshot(&self) -> (u64, CacheSnapshot) {
        let inner = self.lock();
        let entries = inner
            .slots
            .iter()
            .filter_map(|(k, slot)| slot.entry.clone().map(|e| (k.clone(), e)))
            .collect();
        (
            inner.generation,
            CacheSnapshot {
                entries,
                last_update_time: inner.last_update,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn t(min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, min, 0).unwrap()
    }

    #[test]
    fn failure_without_prior_success_writes_placeholder() {
        let store = CacheStore::new();
        let a = store.begin_attempt("chess");
        assert_eq!(store.record_failure("chess", a), FailureOutcome::Placeholder);
        assert_eq!(store.get("chess"), Some(CacheEntry::placeholder()));
    }

    #[test]
    fn failure_after_success_keeps_entry() {
        let store = CacheStore::new();
        let a1 = store.begin_attempt("chess");
        store.commit_success("chess", a1, json!({"highestRating": 1500}), t(0));
        let before = store.get("chess");

        let a2 = store.begin_attempt("chess");
        assert_eq!(store.record_failure("chess", a2), FailureOutcome::KeptPrevious);
        assert_eq!(store.get("chess"), before);
        assert_eq!(store.get("chess").map(|e| e.error), Some(false));
    }

    #[test]
    fn stale_commit_is_rejected() {
        let store = CacheStore::new();
        let old = store.begin_attempt("k5");
        let new = store.begin_attempt("k5");

        assert_eq!(store.commit_success("k5", new, json!("new"), t(1)), CommitOutcome::Applied);
        assert_eq!(store.commit_success("k5", old, json!("old"), t(2)), CommitOutcome::Stale);
        assert_eq!(store.get("k5").and_then(|e| e.data), Some(json!("new")));
        assert_eq!(store.last_update(), Some(t(1)));
    }

    #[test]
    fn committed_after_tracks_newer_successes() {
        let store = CacheStore::new();
        let failed = store.begin_attempt("cod");
        store.record_failure("cod", failed);
        assert!(!store.committed_after("cod", failed));

        let retry = store.begin_attempt("cod");
        store.commit_success("cod", retry, json!(1), t(0));
        assert!(store.committed_after("cod", failed));
        assert!(!store.committed_after("cod", retry));
    }

    #[test]
    fn loaded_entries_survive_until_next_commit() {
        let store = CacheStore::new();
        let mut snap = CacheSnapshot::default();
        snap.entries.insert("typing".into(), CacheEntry::success(json!({"maxWPM": "120 wpm"})));
        snap.entries.insert("cod".into(), CacheEntry::placeholder());
        snap.last_update_time = Some(t(5));
        store.load_snapshot(snap.clone());

        assert_eq!(store.get_all(), snap.entries);
        assert_eq!(store.last_update(), Some(t(5)));

        let a = store.begin_attempt("typing");
        assert_eq!(store.record_failure("typing", a), FailureOutcome::KeptPrevious);
        let b = store.begin_attempt("typing");
        store.commit_success("typing", b, json!({"maxWPM": "130 wpm"}), t(9));
        assert_eq!(store.get("typing").and_then(|e| e.data), Some(json!({"maxWPM": "130 wpm"})));
    }

    #[test]
    fn snapshot_generation_moves_on_every_change() {
        let store = CacheStore::new();
        let (g0, s0) = store.snapshot();
        assert!(s0.entries.is_empty());

        store.set("x", CacheEntry::placeholder());
        let (g1, _) = store.snapshot();
        let a = store.begin_attempt("y");
        store.commit_success("y", a, json!(2), t(0));
        let (g2, s2) = store.snapshot();

        assert!(g0 < g1 && g1 < g2);
        assert_eq!(s2.entries.len(), 2);
        assert_eq!(s2.last_update_time, Some(t(0)));
    }
}
