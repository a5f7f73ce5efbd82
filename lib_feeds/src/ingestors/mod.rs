//! # Data Ingestors Module
//!
//! Moves data from the upstream table sources into the cache.
//!
//! ## Contained Modules:
//! - **`fetch_unit`**: One `FetchUnit` per source: fetch, type, process,
//!   commit, and an isolated self-scheduling retry loop on failure.
//! - **`orchestrator`**: The `Orchestrator` lifecycle (snapshot load, initial
//!   fetch, periodic full refresh) and its `CycleReport`.

/// Per-source fetch and retry.
pub mod fetch_unit;
/// Lifecycle and periodic refresh.
pub mod orchestrator;

pub use fetch_unit::{FetchUnit, IngestContext};
pub use orchestrator::{CycleReport, Orchestrator, Phase};
