//! # Activity Feed Server
//!
//! Pulls every configured spreadsheet source on a fixed period, summarises
//! each one with its processor, and serves the results as JSON. The last good
//! cache is snapshotted to Redis so a restart serves data straight away.
//!
//! ## Routes:
//! - `GET /{key}`: one source's `{data, error}` entry.
//! - `GET /all`: every entry, plus solar and server stats when enabled.
//! - `GET /status`, `GET /updated`: last update time.
//! - `GET /health`: liveness.
//!
//! `--test-source <key>` fetches one source, prints its summary and exits.

use anyhow::Result;
use lib_feeds::loggers::init_tracing;
use tokio::signal;
use tokio_util::sync::CancellationToken;

mod feeds_logic;
use feeds_logic::{config, probe, startup};

const APP_NAME: &str = "server_feeds";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let settings = config::load_config()?.resolve()?;
    let _log_guard = init_tracing(&settings.log_dir, &settings.log_level, APP_NAME)?;

    if let Some(key) = settings.test_source.clone() {
        let summary = probe::run(&settings, &key).await?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    let server = tokio::spawn(startup::run(settings, shutdown.clone()));

    tokio::select! {
        _ = wait_for_signal() => {}
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();

    server.await??;
    tracing::info!("Shutdown complete.");
    Ok(())
}

async fn wait_for_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term_signal) => {
                term_signal.recv().await;
                tracing::info!("SIGTERM received, initiating shutdown.");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = terminate => {}
    }
}
