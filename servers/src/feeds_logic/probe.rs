//! One-shot `--test-source <key>` mode: fetch and summarise a single source,
//! print the result and exit.

use std::sync::Arc;

use anyhow::{Result, bail};
use lib_feeds::cache::{CacheStore, MemorySnapshotStore, Persister};
use lib_feeds::configs::SourceConfig;
use lib_feeds::ingestors::{FetchUnit, IngestContext};
use lib_feeds::tabular::RowTyper;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::config::Settings;
use super::startup;

/// Picks `key` out of `sources`, or fails listing what is available.
pub fn select_source(sources: Vec<SourceConfig>, key: &str) -> Result<SourceConfig> {
    let available: Vec<String> = sources.iter().map(|s| s.key.clone()).collect();
    match sources.into_iter().find(|s| s.key == key) {
        Some(source) => Ok(source),
        None if available.is_empty() => bail!("unknown source '{}'; no sources are configured", key),
        None => bail!("unknown source '{}'; available: {}", key, available.join(", ")),
    }
}

/// Fetches one source without touching any durable store.
pub async fn run(settings: &Settings, key: &str) -> Result<Value> {
    let source = select_source(startup::sources(settings)?, key)?;
    tracing::info!(%source, "Testing single source");

    let processor = source.resolve_processor()?;
    let cache = Arc::new(CacheStore::new());
    let ctx = Arc::new(IngestContext {
        tables: startup::table_source(settings)?,
        persister: Arc::new(Persister::new(cache.clone(), Arc::new(MemorySnapshotStore::new()))),
        cache,
        typer: RowTyper::default(),
        tz: settings.tz,
        retry_delay: settings.retry_delay,
        shutdown: CancellationToken::new(),
    });

    let summary = FetchUnit::new(source, processor, ctx).fetch_summary().await?;
    Ok(summary)
}
