//! # Configs Module
//!
//! Static configuration built once at process start.
//!
//! ## Contained Modules:
//!
//! - **`sources`**: The table of sources to track (key, spreadsheet location,
//!   processor kind), either the built-in table with ids taken from the
//!   environment or a JSON sources file, plus display time zone parsing.

pub mod sources;

pub use sources::{
    default_sources, load_sources_file, parse_timezone, ConfigError, SourceConfig, DEFAULT_TIMEZONE,
};
