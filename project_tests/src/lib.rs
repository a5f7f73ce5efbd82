//! # Shared Test Fixtures
//!
//! Building blocks for the integration tests under `tests/`:
//! - `MockSheets`: an in-process `TableSource` whose per-spreadsheet answers
//!   can be changed while a test runs.
//! - `Harness`: a cache, memory snapshot store, persister and orchestrator
//!   wired the way the server wires them.
//! - `spawn_fake_sheets`: a local HTTP server speaking the spreadsheet values
//!   protocol, for tests that go through the real HTTP client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use lib_feeds::cache::{CacheSnapshot, CacheStore, MemorySnapshotStore, Persister};
use lib_feeds::configs::SourceConfig;
use lib_feeds::ingestors::{IngestContext, Orchestrator};
use lib_feeds::retrieve::{FetchError, SourceLocation, TableSource};
use lib_feeds::tabular::{RawTable, RowTyper};
use serde_json::{Value, json};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Builds a table from string literals; the first row is the header.
pub fn grid(rows: &[&[&str]]) -> RawTable {
    RawTable::from_grid(
        rows.iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect(),
    )
}

/// A small chess sheet with one game.
pub fn chess_table() -> RawTable {
    grid(&[
        &["startTime", "myRating", "myResult", "myAccuracy", "gameLength"],
        &["1710441000", "1500", "win", "85", "600"],
    ])
}

/// A small spotify sheet with two days.
pub fn spotify_table() -> RawTable {
    grid(&[
        &["Date", "Value"],
        &["13/03/2024", "40"],
        &["14/03/2024", "25"],
    ])
}

#[derive(Clone)]
enum Answer {
    Table(RawTable),
    Fail,
    /// Waits for the gate, then serves the table.
    Gated(RawTable, Arc<Notify>),
}

/// `TableSource` keyed by spreadsheet id. Unknown ids fail.
#[derive(Default)]
pub struct MockSheets {
    answers: Mutex<HashMap<String, Answer>>,
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
}

impl MockSheets {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, id: &str, table: RawTable) {
        self.set(id, Answer::Table(table));
    }

    pub fn fail(&self, id: &str) {
        self.set(id, Answer::Fail);
    }

    /// The next call for `id` blocks until the returned gate is notified.
    pub fn gate(&self, id: &str, table: RawTable) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.set(id, Answer::Gated(table, gate.clone()));
        gate
    }

    fn set(&self, id: &str, answer: Answer) {
        self.answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), answer);
    }

    pub fn calls(&self, id: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TableSource for MockSheets {
    async fn fetch_table(&self, location: &SourceLocation) -> Result<RawTable, FetchError> {
        let id = location.spreadsheet_id.as_str();
        self.total.fetch_add(1, Ordering::SeqCst);
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id.to_string())
            .or_default() += 1;

        let answer = self
            .answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned();
        match answer {
            Some(Answer::Table(table)) => Ok(table),
            Some(Answer::Gated(table, gate)) => {
                gate.notified().await;
                Ok(table)
            }
            Some(Answer::Fail) | None => Err(FetchError::Status {
                status: 503,
                body: format!("{} unavailable", id),
            }),
        }
    }
}

/// Source whose spreadsheet id equals its key.
pub fn source(key: &str, processor: &str) -> SourceConfig {
    SourceConfig::new(key, SourceLocation::new(key, "Sheet1!A1:Z"), processor)
}

/// Everything a server process would build, over a `MockSheets`.
pub struct Harness {
    pub sheets: Arc<MockSheets>,
    pub cache: Arc<CacheStore>,
    pub store: Arc<MemorySnapshotStore>,
    pub persister: Arc<Persister>,
    pub shutdown: CancellationToken,
    pub orchestrator: Arc<Orchestrator>,
}

impl Harness {
    pub fn new(sources: Vec<SourceConfig>) -> Self {
        Self::with_snapshot(sources, None)
    }

    pub fn with_snapshot(sources: Vec<SourceConfig>, snapshot: Option<CacheSnapshot>) -> Self {
        let sheets = MockSheets::new();
        let cache = Arc::new(CacheStore::new());
        let store = Arc::new(match snapshot {
            Some(snapshot) => MemorySnapshotStore::with_snapshot(snapshot),
            None => MemorySnapshotStore::new(),
        });
        let persister = Arc::new(Persister::new(cache.clone(), store.clone()));
        let shutdown = CancellationToken::new();
        let ctx = Arc::new(IngestContext {
            tables: sheets.clone(),
            cache: cache.clone(),
            persister: persister.clone(),
            typer: RowTyper::default(),
            tz: chrono_tz::Europe::London,
            retry_delay: Duration::from_secs(300),
            shutdown: shutdown.clone(),
        });
        let orchestrator = Orchestrator::new(sources, ctx, Duration::from_secs(30 * 60))
            .unwrap_or_else(|e| panic!("bad test sources: {}", e));

        Self {
            sheets,
            cache,
            store,
            persister,
            shutdown,
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Data of one cache entry, if any.
    pub fn data(&self, key: &str) -> Option<Value> {
        self.cache.get(key).and_then(|e| e.data)
    }

    /// Error flag of one cache entry, if any.
    pub fn error(&self, key: &str) -> Option<bool> {
        self.cache.get(key).map(|e| e.error)
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

type Grids = Arc<HashMap<String, Vec<Vec<Value>>>>;

#[derive(serde::Deserialize)]
struct KeyQuery {
    key: Option<String>,
}

/// Serves `GET /v4/spreadsheets/{id}/values/{range}` on a random local port.
///
/// Known ids answer with their grid; `"empty"` answers without `values`;
/// `"whoami"` answers with the request's `Authorization` header as a one-cell
/// table; anything else is a 404. When `required_key` is set, requests without a
/// matching `key` query parameter get a 403. Returns the base URL to hand to
/// `SheetsSource::new` and a token that stops the server.
pub async fn spawn_fake_sheets(
    grids: HashMap<String, Vec<Vec<Value>>>,
    required_key: Option<String>,
) -> (String, CancellationToken) {
    let state = (Arc::new(grids), required_key);
    let app = Router::new()
        .route("/v4/spreadsheets/{id}/values/{range}", get(values_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap_or_else(|e| panic!("cannot bind fake sheets server: {}", e));
    let addr = listener
        .local_addr()
        .unwrap_or_else(|e| panic!("no local addr: {}", e));
    let token = CancellationToken::new();
    let stop = token.clone();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move { stop.cancelled().await })
            .await;
    });
    (format!("http://{}/v4", addr), token)
}

async fn values_handler(
    State((grids, required_key)): State<(Grids, Option<String>)>,
    Path((id, range)): Path<(String, String)>,
    Query(query): Query<KeyQuery>,
    headers: HeaderMap,
) -> axum::response::Response {
    if required_key.is_some() && query.key != required_key {
        return (StatusCode::FORBIDDEN, "bad key").into_response();
    }
    if id == "whoami" {
        let auth = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        return Json(json!({ "range": range, "values": [["authorization"], [auth]] })).into_response();
    }
    if id == "empty" {
        return Json(json!({ "range": range, "majorDimension": "ROWS" })).into_response();
    }
    match grids.get(&id) {
        Some(values) => Json(json!({ "range": range, "values": values })).into_response(),
        None => (StatusCode::NOT_FOUND, format!("spreadsheet {} not found", id)).into_response(),
    }
}
