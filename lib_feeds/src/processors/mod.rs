//! # Source Processors Module
//!
//! One summariser per data source, all implementing `SourceProcessor`, and the
//! static registry that maps a processor kind to an instance.
//!
//! ## Contained Modules:
//!
//! - **`processor`**: The `SourceProcessor` trait, `ProcessContext`,
//!   `ProcessorError` and helpers shared by the implementations.
//! - **`registry`**: `processor_for(kind)` and the list of known kinds.
//! - **`five_k`**, **`parkrun`**, **`driving`**, **`spotify`**, **`chess`**,
//!   **`duolingo`**, **`climbing`**, **`cod`**, **`dobble`**, **`typing`**,
//!   **`strength`**: the processors themselves.

pub mod processor;
pub mod registry;

pub mod chess;
pub mod climbing;
pub mod cod;
pub mod dobble;
pub mod driving;
pub mod duolingo;
pub mod five_k;
pub mod parkrun;
pub mod spotify;
pub mod strength;
pub mod typing;

pub use processor::{ProcessContext, ProcessorError, SourceProcessor};
pub use registry::{processor_for, KNOWN_KINDS};
