//! # Fetch/Retry Unit
//!
//! One unit per configured source. A refresh takes an attempt number from the
//! cache, pulls the raw table, types it, validates the header, runs the
//! source's processor and commits the summary. A failed refresh leaves any
//! previous success in place and hands the source to its own retry loop.
//!
//! ## Retry loop
//! - At most one loop per source is pending at a time (`retry_pending`).
//! - The loop sleeps a fixed delay, then retries until an attempt for the key
//!   commits, whether its own or one from a full refresh cycle.
//! - It stops early when the shutdown token is cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::cache::{AttemptId, CacheStore, CommitOutcome, FailureOutcome, Persister};
use crate::configs::SourceConfig;
use crate::processors::{ProcessContext, SourceProcessor};
use crate::retrieve::{FetchError, TableSource};
use crate::tabular::RowTyper;

/// Everything the units of one process share.
pub struct IngestContext {
    pub tables: Arc<dyn TableSource>,
    pub cache: Arc<CacheStore>,
    pub persister: Arc<Persister>,
    pub typer: RowTyper,
    /// Display zone handed to processors.
    pub tz: Tz,
    /// Pause between retries of a failing source.
    pub retry_delay: Duration,
    pub shutdown: CancellationToken,
}

pub struct FetchUnit {
    source: SourceConfig,
    processor: Arc<dyn SourceProcessor>,
    ctx: Arc<IngestContext>,
    retry_pending: AtomicBool,
}

impl FetchUnit {
    pub fn new(source: SourceConfig, processor: Arc<dyn SourceProcessor>, ctx: Arc<IngestContext>) -> Arc<Self> {
        Arc::new(Self {
            source,
            processor,
            ctx,
            retry_pending: AtomicBool::new(false),
        })
    }

    pub fn key(&self) -> &str {
        &self.source.key
    }

    pub fn source(&self) -> &SourceConfig {
        &self.source
    }

    /// True while a retry loop for this source is scheduled or running.
    pub fn retry_pending(&self) -> bool {
        self.retry_pending.load(Ordering::Acquire)
    }

    /// Fetches and summarises the source without touching the cache.
    pub async fn fetch_summary(&self) -> Result<Value, FetchError> {
        let table = self.ctx.tables.fetch_table(&self.source.location).await?;
        if table.is_empty() {
            return Err(FetchError::EmptySource);
        }

        let report = self.ctx.typer.type_table(&table);
        if !report.issues.is_empty() {
            tracing::warn!(
                source_key = %self.source.key,
                issues = report.issues.len(),
                first = %report.issues[0],
                "Some cells could not be typed"
            );
        }

        self.processor.validate_header(&table)?;
        let summary = self
            .processor
            .process(&report.records, &ProcessContext::current(self.ctx.tz))?;
        Ok(summary)
    }

    /// One refresh. On failure the source's retry loop is scheduled.
    pub async fn refresh(self: &Arc<Self>) -> Result<CommitOutcome, FetchError> {
        let (attempt, result) = self.try_once().await;
        if result.is_err() {
            self.schedule_retry(attempt);
        }
        result
    }

    async fn try_once(&self) -> (AttemptId, Result<CommitOutcome, FetchError>) {
        let key = self.source.key.as_str();
        let attempt = self.ctx.cache.begin_attempt(key);

        match self.fetch_summary().await {
            Ok(summary) => {
                let outcome = self.ctx.cache.commit_success(key, attempt, summary, Utc::now());
                match outcome {
                    CommitOutcome::Applied => {
                        tracing::info!(source_key = key, attempt = attempt.0, "Source updated");
                        self.ctx.persister.persist_logged().await;
                    }
                    CommitOutcome::Stale => {
                        tracing::debug!(source_key = key, attempt = attempt.0, "Newer result already committed; dropping");
                    }
                }
                (attempt, Ok(outcome))
            }
            Err(e) => {
                match self.ctx.cache.record_failure(key, attempt) {
                    FailureOutcome::KeptPrevious => {
                        tracing::warn!(source_key = key, error = %e, "Fetch failed; keeping last good data");
                    }
                    FailureOutcome::Placeholder => {
                        tracing::error!(source_key = key, error = %e, "Fetch failed and no previous data exists");
                    }
                }
                (attempt, Err(e))
            }
        }
    }

    fn schedule_retry(self: &Arc<Self>, failed: AttemptId) {
        if self.ctx.shutdown.is_cancelled() {
            return;
        }
        if self.retry_pending.swap(true, Ordering::AcqRel) {
            tracing::debug!(source_key = %self.source.key, "Retry already pending");
            return;
        }

        tracing::info!(
            source_key = %self.source.key,
            delay_secs = self.ctx.retry_delay.as_secs(),
            "Scheduling retry"
        );
        let unit = Arc::clone(self);
        tokio::spawn(async move {
            unit.retry_loop(failed).await;
            unit.retry_pending.store(false, Ordering::Release);
        });
    }

    async fn retry_loop(&self, mut last_failed: AttemptId) {
        let key = self.source.key.as_str();
        loop {
            tokio::select! {
                _ = self.ctx.shutdown.cancelled() => {
                    tracing::debug!(source_key = key, "Retry loop cancelled");
                    return;
                }
                _ = tokio::time::sleep(self.ctx.retry_delay) => {}
            }

            if self.ctx.cache.committed_after(key, last_failed) {
                tracing::debug!(source_key = key, "Recovered by another attempt; retry loop done");
                return;
            }

            let (attempt, result) = self.try_once().await;
            match result {
                Ok(_) => {
                    tracing::info!(source_key = key, "Retry succeeded");
                    return;
                }
                Err(_) => last_failed = attempt,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::cache::{CacheEntry, MemorySnapshotStore};
    use crate::processors::processor_for;
    use crate::retrieve::SourceLocation;
    use crate::tabular::RawTable;

    /// Hands out queued results, then keeps repeating the last one.
    struct Scripted {
        results: Mutex<VecDeque<Result<RawTable, ()>>>,
        calls: Mutex<usize>,
    }

    impl Scripted {
        fn new(results: Vec<Result<RawTable, ()>>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl TableSource for Scripted {
        async fn fetch_table(&self, _: &SourceLocation) -> Result<RawTable, FetchError> {
            *self.calls.lock().unwrap() += 1;
            let mut q = self.results.lock().unwrap();
            let next = if q.len() > 1 { q.pop_front() } else { q.front().cloned() };
            match next {
                Some(Ok(table)) => Ok(table),
                _ => Err(FetchError::Status { status: 503, body: "down".into() }),
            }
        }
    }

    fn dobble_table() -> RawTable {
        RawTable::from_grid(vec![
            vec!["unix".into(), "score".into(), "testTime".into()],
            vec!["1710406800".into(), "30".into(), "60".into()],
        ])
    }

    fn unit(tables: Arc<Scripted>, cache: Arc<CacheStore>) -> (Arc<FetchUnit>, Arc<MemorySnapshotStore>) {
        let store = Arc::new(MemorySnapshotStore::new());
        let persister = Arc::new(Persister::new(cache.clone(), store.clone()));
        let ctx = Arc::new(IngestContext {
            tables,
            cache,
            persister,
            typer: RowTyper::default(),
            tz: chrono_tz::Europe::London,
            retry_delay: Duration::from_secs(300),
            shutdown: CancellationToken::new(),
        });
        let source = SourceConfig::new("dobble", SourceLocation::new("id", "60!A1:Z"), "dobble");
        let processor = processor_for("dobble").unwrap();
        (FetchUnit::new(source, processor, ctx), store)
    }

    #[tokio::test]
    async fn success_commits_and_persists() {
        let cache = Arc::new(CacheStore::new());
        let (unit, store) = unit(Scripted::new(vec![Ok(dobble_table())]), cache.clone());

        assert_eq!(unit.refresh().await.unwrap(), CommitOutcome::Applied);
        assert_eq!(cache.get("dobble").map(|e| e.error), Some(false));
        assert_eq!(store.persist_count(), 1);
        assert!(!unit.retry_pending());
    }

    #[tokio::test]
    async fn empty_source_is_a_failure() {
        let cache = Arc::new(CacheStore::new());
        let (unit, _) = unit(Scripted::new(vec![Ok(RawTable::default())]), cache.clone());

        assert!(matches!(unit.refresh().await, Err(FetchError::EmptySource)));
        assert_eq!(cache.get("dobble"), Some(CacheEntry::placeholder()));
        assert!(unit.retry_pending());
        unit.ctx.shutdown.cancel();
    }

    #[tokio::test]
    async fn missing_column_is_a_processor_error() {
        let cache = Arc::new(CacheStore::new());
        let table = RawTable::from_grid(vec![vec!["Nope".into()], vec!["1".into()]]);
        let (unit, _) = unit(Scripted::new(vec![Ok(table)]), cache);

        assert!(matches!(unit.fetch_summary().await, Err(FetchError::Processor(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_loop_recovers_after_delay() {
        let cache = Arc::new(CacheStore::new());
        let tables = Scripted::new(vec![Err(()), Err(()), Ok(dobble_table())]);
        let (unit, _) = unit(tables.clone(), cache.clone());

        assert!(unit.refresh().await.is_err());
        assert!(unit.retry_pending());

        // Second failure at +300s, success at +600s.
        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(tables.calls(), 2);
        assert_eq!(cache.get("dobble"), Some(CacheEntry::placeholder()));

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(tables.calls(), 3);
        assert_eq!(cache.get("dobble").map(|e| e.error), Some(false));
        assert!(!unit.retry_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn only_one_retry_loop_per_source() {
        let cache = Arc::new(CacheStore::new());
        let tables = Scripted::new(vec![Err(())]);
        let (unit, _) = unit(tables.clone(), cache);

        assert!(unit.refresh().await.is_err());
        assert!(unit.refresh().await.is_err());
        assert_eq!(tables.calls(), 2);

        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(tables.calls(), 3);

        unit.ctx.shutdown.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!unit.retry_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn retry_loop_stops_when_cycle_succeeds() {
        let cache = Arc::new(CacheStore::new());
        let tables = Scripted::new(vec![Err(()), Ok(dobble_table())]);
        let (unit, _) = unit(tables.clone(), cache.clone());

        assert!(unit.refresh().await.is_err());
        // A full cycle lands before the retry fires.
        assert!(unit.refresh().await.is_ok());
        assert_eq!(tables.calls(), 2);

        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(tables.calls(), 2);
        assert!(!unit.retry_pending());
        assert_eq!(cache.get("dobble").and_then(|e| e.data).map(|d| d["numTests"].clone()), Some(json!(1)));
    }
}
