//! # Refresh Orchestrator
//!
//! Drives the whole ingestion lifecycle:
//! `Idle -> LoadingSnapshot -> InitialFetch -> Steady`.
//!
//! The snapshot is loaded before anything is fetched so the front end can
//! serve the last good data immediately. Every refresh cycle fans out one
//! `FetchUnit::refresh` per source, concurrently, and waits for all of them.
//! The current phase is published on a `watch` channel.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::fetch_unit::{FetchUnit, IngestContext};
use crate::cache::Persister;
use crate::configs::{ConfigError, SourceConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    LoadingSnapshot,
    InitialFetch,
    Steady,
}

/// Outcome of one full refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub succeeded: Vec<String>,
    /// Failed keys with the reason.
    pub failed: Vec<(String, String)>,
}

impl CycleReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Orchestrator {
    units: Vec<Arc<FetchUnit>>,
    persister: Arc<Persister>,
    refresh_period: Duration,
    shutdown: CancellationToken,
    phase: watch::Sender<Phase>,
}

impl Orchestrator {
    /// Builds one unit per source, resolving each processor kind.
    pub fn new(
        sources: Vec<SourceConfig>,
        ctx: Arc<IngestContext>,
        refresh_period: Duration,
    ) -> Result<Self, ConfigError> {
        let units = sources
            .into_iter()
            .map(|source| {
                let processor = source.resolve_processor()?;
                Ok(FetchUnit::new(source, processor, ctx.clone()))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let (phase, _) = watch::channel(Phase::Idle);
        Ok(Self {
            units,
            persister: ctx.persister.clone(),
            refresh_period,
            shutdown: ctx.shutdown.clone(),
            phase,
        })
    }

    pub fn units(&self) -> &[Arc<FetchUnit>] {
        &self.units
    }

    pub fn unit(&self, key: &str) -> Option<&Arc<FetchUnit>> {
        self.units.iter().find(|u| u.key() == key)
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Receiver that sees every phase change.
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    fn enter(&self, phase: Phase) {
        tracing::info!(?phase, "Orchestrator phase change");
        self.phase.send_replace(phase);
    }

    /// Seeds the cache from the durable store. A store failure is logged and
    /// the process starts cold.
    pub async fn load_snapshot(&self) {
        self.enter(Phase::LoadingSnapshot);
        match self.persister.restore().await {
            Ok(0) => tracing::info!("No cache snapshot found; starting cold"),
            Ok(count) => tracing::info!(entries = count, "Cache loaded from snapshot"),
            Err(e) => tracing::error!(error = %e, "Failed to load cache snapshot; starting cold"),
        }
    }

    /// Refreshes every source concurrently and waits for all of them.
    pub async fn refresh_all(&self) -> CycleReport {
        let results = join_all(self.units.iter().map(|unit| async move {
            (unit.key().to_string(), unit.refresh().await)
        }))
        .await;

        let mut report = CycleReport::default();
        for (key, result) in results {
            match result {
                Ok(_) => report.succeeded.push(key),
                Err(e) => report.failed.push((key, e.to_string())),
            }
        }

        // Placeholders written by failures are persisted here; successes
        // already persisted themselves.
        self.persister.persist_logged().await;

        tracing::info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Refresh cycle complete"
        );
        report
    }

    /// Runs until the shutdown token is cancelled.
    pub async fn run(&self) {
        self.load_snapshot().await;
        if self.shutdown.is_cancelled() {
            return;
        }

        self.enter(Phase::InitialFetch);
        tokio::select! {
            _ = self.shutdown.cancelled() => return,
            _ = self.refresh_all() => {}
        }

        self.enter(Phase::Steady);
        let mut ticker = tokio::time::interval(self.refresh_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; the initial fetch already covered it.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Orchestrator stopping");
                    return;
                }
                _ = ticker.tick() => {
                    self.refresh_all().await;
                }
            }
        }
    }
}
