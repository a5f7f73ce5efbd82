use std::sync::Arc;

use anyhow::{Context, Result};
use lib_feeds::cache::{CacheStore, MemorySnapshotStore, Persister, SnapshotStore};
use lib_feeds::configs::{SourceConfig, default_sources, load_sources_file};
use lib_feeds::connections::RedisSnapshotStore;
use lib_feeds::ingestors::{IngestContext, Orchestrator};
use lib_feeds::retrieve::{SheetsSource, TableSource};
use lib_feeds::tabular::RowTyper;
use tokio_util::sync::CancellationToken;

use super::config::Settings;
use super::downstream::{self, AppState, ExtrasSource};

/// Built-in table with ids from the environment, or the configured sources file.
pub fn sources(settings: &Settings) -> Result<Vec<SourceConfig>> {
    let sources = match &settings.sources_file {
        Some(path) => load_sources_file(path)?,
        None => default_sources(|var| std::env::var(var).ok()),
    };
    if sources.is_empty() {
        tracing::warn!("No sources configured; only the durable snapshot will be served");
    }
    Ok(sources)
}

pub fn table_source(settings: &Settings) -> Result<Arc<dyn TableSource>> {
    let sheets = SheetsSource::new(
        &settings.sheets_base_url,
        settings.sheets_api_key.clone(),
        settings.sheets_token.clone(),
    )
    .context("building spreadsheet client")?;
    Ok(Arc::new(sheets))
}

/// Opens the Redis store when configured. If Redis is down at startup the
/// store is kept anyway and reconnects on the next load, persist or extras
/// read. Only a malformed URL falls back to an in-memory snapshot.
async fn open_redis(settings: &Settings) -> Option<Arc<RedisSnapshotStore>> {
    let url = settings.redis_url.as_deref()?;
    let store = match RedisSnapshotStore::open(url) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "Invalid Redis URL; keeping the cache in memory only");
            return None;
        }
    };
    if let Err(e) = store.ensure_connected().await {
        tracing::warn!(error = %e, "Redis unavailable at startup; serving from memory until it comes back");
    }
    Some(Arc::new(store))
}

/// Runs the orchestrator and the HTTP front end until `shutdown` is cancelled.
pub async fn run(settings: Settings, shutdown: CancellationToken) -> Result<()> {
    let sources = sources(&settings)?;
    let tables = table_source(&settings)?;
    let redis = open_redis(&settings).await;

    let snapshot_store: Arc<dyn SnapshotStore> = match &redis {
        Some(store) => store.clone(),
        None => Arc::new(MemorySnapshotStore::new()),
    };
    let extras: Option<Arc<dyn ExtrasSource>> = match (&redis, settings.include_solar) {
        (Some(store), true) => Some(store.clone()),
        (None, true) => {
            tracing::warn!("Solar extras requested but no Redis store is configured");
            None
        }
        _ => None,
    };

    let cache = Arc::new(CacheStore::new());
    let persister = Arc::new(Persister::new(cache.clone(), snapshot_store));
    let ctx = Arc::new(IngestContext {
        tables,
        cache: cache.clone(),
        persister,
        typer: RowTyper::default(),
        tz: settings.tz,
        retry_delay: settings.retry_delay,
        shutdown: shutdown.clone(),
    });
    let orchestrator = Orchestrator::new(sources, ctx, settings.refresh_period)?;
    tracing::info!(
        sources = orchestrator.units().len(),
        refresh_secs = settings.refresh_period.as_secs(),
        "Orchestrator ready"
    );

    let app = downstream::router(AppState { cache, extras }, settings.dev_cors);

    // Either side stopping takes the other one down.
    let server = async {
        let served = downstream::run(settings.port, app, shutdown.clone()).await;
        shutdown.cancel();
        served
    };
    let ingest = async {
        orchestrator.run().await;
        shutdown.cancel();
    };
    let (served, ()) = tokio::join!(server, ingest);
    served
}
