//! # Tabular Module
//!
//! Everything between "the upstream handed us a grid of strings" and "a
//! processor gets typed records".
//!
//! ## Contained Modules:
//!
//! - **`raw_table`**: The header + rows grid as returned by a spreadsheet
//!   values call, normalised so every data row has the header's width.
//! - **`row_typer`**: Cell coercion (booleans, numbers, nested JSON metrics)
//!   and derived fields, producing one `TypedRecord` per data row.

/// The raw header + rows grid.
pub mod raw_table;
/// Cell coercion into typed records.
pub mod row_typer;

pub use raw_table::RawTable;
pub use row_typer::{CellValue, RowTyper, TypedRecord, TypingIssue, TypingReport};
