//! # lib_feeds
//!
//! Shared library behind the activity dashboard feed server. Spreadsheet ranges
//! are pulled on a schedule, typed row by row, summarised by one processor per
//! source and kept in a cache that survives restarts through a durable snapshot.
//!
//! Every top-level folder is gated behind a cargo feature of the same name so
//! a binary can pull in only the parts it needs.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Raw spreadsheet tables and the row typer.
#[cfg(feature = "tabular")]
pub mod tabular;

/// Reusable statistics and date formatting helpers.
#[cfg(feature = "analytics")]
pub mod analytics;

/// Per-source summary processors and their registry.
#[cfg(feature = "processors")]
pub mod processors;

/// In-memory cache store, snapshots and persistence.
#[cfg(feature = "cache")]
pub mod cache;

/// Durable store drivers (Redis).
#[cfg(feature = "connections")]
pub mod connections;

/// HTTP retrieval and the spreadsheet values source.
#[cfg(feature = "retrieve")]
pub mod retrieve;

/// Fetch/retry units and the refresh orchestrator.
#[cfg(feature = "ingestors")]
pub mod ingestors;

/// Source table configuration.
#[cfg(feature = "configs")]
pub mod configs;

/// Tracing subscriber setup.
#[cfg(feature = "loggers")]
pub mod loggers;
