//! # Data Retrieval Module
//!
//! HTTP plumbing and the upstream table sources the ingestors pull from.
//!
//! ## Contained Modules:
//!
//! - **`ky_http`**: A generic HTTP `ApiClient` built on `reqwest` and
//!   `reqwest-middleware`, retrying transient failures with exponential
//!   backoff.
//! - **`sheets`**: The `TableSource` seam, its `FetchError` taxonomy and the
//!   spreadsheet values implementation built on `ApiClient`.

/// Generic HTTP API client with retry middleware.
pub mod ky_http;
/// Spreadsheet values source.
pub mod sheets;

pub use ky_http::{ApiClient, ApiResponse, HttpError};
pub use sheets::{FetchError, SheetsSource, SourceLocation, TableSource, DEFAULT_SHEETS_BASE_URL};
