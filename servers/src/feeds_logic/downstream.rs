use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::SecondsFormat;
use lib_feeds::cache::{CacheStore, StoreError};
use lib_feeds::connections::RedisSnapshotStore;
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

const SOLAR_KEY: &str = "vedirect:latest";
const SERVER_STATS_KEY: &str = "server_stats";

/// Read-only JSON values written by other services, shown next to the feeds.
#[async_trait]
pub trait ExtrasSource: Send + Sync {
    async fn get_json(&self, key: &str) -> Result<Option<Value>, StoreError>;
}

#[async_trait]
impl ExtrasSource for RedisSnapshotStore {
    async fn get_json(&self, key: &str) -> Result<Option<Value>, StoreError> {
        RedisSnapshotStore::get_json(self, key).await
    }
}

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheStore>,
    /// `Some` when `/all` should carry the solar and server stats extras.
    pub extras: Option<Arc<dyn ExtrasSource>>,
}

#[derive(Debug)]
pub enum AppError {
    /// No cache entry under the requested key.
    NotFound(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(key) => write!(f, "no data for key '{}'", key),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound(key) => {
                tracing::debug!(key = %key, "Unknown cache key requested");
                (StatusCode::NOT_FOUND, Json(json!({ "error": "Data not found" }))).into_response()
            }
        }
    }
}

pub fn router(state: AppState, dev_cors: bool) -> Router {
    let app = Router::new()
        .route("/all", get(all_handler))
        .route("/status", get(status_handler))
        .route("/updated", get(updated_handler))
        .route("/health", get(health_handler))
        .route("/{key}", get(key_handler))
        .with_state(state);

    if dev_cors {
        tracing::info!("CORS enabled for any origin");
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Serves the router until `shutdown` is cancelled.
pub async fn run(port: u16, app: Router, shutdown: CancellationToken) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Downstream server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            tracing::info!("Downstream server shutting down.");
        })
        .await?;
    Ok(())
}

async fn key_handler(State(state): State<AppState>, Path(key): Path<String>) -> Result<Response, AppError> {
    match state.cache.get(&key) {
        Some(entry) => Ok(Json(entry).into_response()),
        None => Err(AppError::NotFound(key)),
    }
}

async fn all_handler(State(state): State<AppState>) -> Json<Map<String, Value>> {
    let mut result: Map<String, Value> = state
        .cache
        .get_all()
        .into_iter()
        .map(|(key, entry)| (key, serde_json::to_value(entry).unwrap_or(Value::Null)))
        .collect();

    if let Some(extras) = &state.extras {
        let solar = match extras.get_json(SOLAR_KEY).await {
            Ok(Some(raw)) => json!({ "V": raw["V"].clone(), "I": raw["I"].clone(), "PPV": raw["PPV"].clone() }),
            Ok(None) => Value::Null,
            Err(e) => {
                tracing::error!(error = %e, "Error fetching solar data");
                json!({ "error": true, "message": "Failed to fetch solar data" })
            }
        };
        let server_stats = match extras.get_json(SERVER_STATS_KEY).await {
            Ok(raw) => raw.unwrap_or(Value::Null),
            Err(e) => {
                tracing::error!(error = %e, "Error fetching server stats");
                json!({ "error": true, "message": "Failed to fetch server stats" })
            }
        };
        result.insert("solar".into(), solar);
        result.insert("serverStats".into(), server_stats);
    }

    Json(result)
}

async fn status_handler(State(state): State<AppState>) -> Json<Value> {
    let last = state.cache.last_update();
    Json(json!({
        "lastUpdateTime": last.map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
        "updated": last.is_some(),
    }))
}

async fn updated_handler(State(state): State<AppState>) -> String {
    match state.cache.last_update() {
        Some(ts) => format!("Last updated at: {}", ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => "Data has not been updated yet".to_string(),
    }
}

async fn health_handler() -> &'static str {
    "OK"
}
