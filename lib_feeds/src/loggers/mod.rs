//! # Loggers Module
//!
//! Process-wide `tracing` setup shared by the binaries.
//!
//! ## Contained Modules:
//!
//! - **`setup`**: Installs a subscriber writing to stdout and to a per-run log
//!   file, after pruning older run logs.

pub mod setup;

pub use setup::{cleanup_old_logs, init_tracing, log_file_name};
