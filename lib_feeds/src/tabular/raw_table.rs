//! # Raw Table
//!
//! The untyped grid fetched from a spreadsheet range. Row 0 of the upstream
//! grid is the header, the remaining rows are data. Spreadsheet APIs trim
//! trailing empty cells, so data rows are padded to the header width here and
//! anything past the last header column is dropped.

use serde_json::Value;

/// An upstream table: header names plus equally wide data rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Builds a table from a header row and data rows.
    ///
    /// Short rows are padded with empty strings, long rows are truncated.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Builds a table from a full grid whose first row is the header.
    ///
    /// An empty grid yields an empty table (no header, no rows).
    pub fn from_grid(grid: Vec<Vec<String>>) -> Self {
        let mut iter = grid.into_iter();
        match iter.next() {
            Some(headers) => Self::new(headers, iter.collect()),
            None => Self::default(),
        }
    }

    /// Builds a table from JSON cells, as returned by the spreadsheet values
    /// endpoint. Non-string cells are rendered to their textual form.
    pub fn from_json_grid(grid: Vec<Vec<Value>>) -> Self {
        let grid = grid
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect();
        Self::from_grid(grid)
    }

    /// Header names, in column order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows (header excluded).
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// True when the upstream returned nothing at all, not even a header.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if `name` is one of the header columns.
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }
}

fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn pads_short_rows_and_truncates_long_ones() {
        let table = RawTable::new(
            strings(&["a", "b", "c"]),
            vec![strings(&["1"]), strings(&["1", "2", "3", "4"])],
        );
        assert_eq!(table.rows()[0], strings(&["1", "", ""]));
        assert_eq!(table.rows()[1], strings(&["1", "2", "3"]));
    }

    #[test]
    fn empty_grid_is_empty_table() {
        let table = RawTable::from_grid(Vec::new());
        assert!(table.is_empty());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn header_only_grid_is_not_empty() {
        let table = RawTable::from_grid(vec![strings(&["a"])]);
        assert!(!table.is_empty());
        assert_eq!(table.len(), 0);
        assert!(table.has_column("a"));
    }

    #[test]
    fn json_cells_are_rendered_as_text() {
        let table = RawTable::from_json_grid(vec![
            vec![json!("n"), json!("flag")],
            vec![json!(12.5), json!(true)],
            vec![Value::Null],
        ]);
        assert_eq!(table.rows()[0], strings(&["12.5", "true"]));
        assert_eq!(table.rows()[1], strings(&["", ""]));
    }
}
