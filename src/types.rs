//! Core data model types for ingestion.
//!
//! Every loader produces a [`Frame`]: ordered column names plus row-major, nullable string
//! cells. Typing is left to whatever consumes the staging tables.

use std::collections::BTreeSet;

/// A single nullable text cell.
pub type Cell = Option<String>;

/// In-memory tabular frame.
///
/// Rows are stored as `Vec<Vec<Cell>>` in the same order as [`Frame::columns`]; every row has
/// exactly one cell per column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    /// Column names in order.
    pub columns: Vec<String>,
    /// Row-major cell storage.
    pub rows: Vec<Vec<Cell>>,
}

impl Frame {
    /// Create a frame, padding short rows with nulls and truncating long ones so every row
    /// matches the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Number of rows in the frame.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in the frame.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the index of a column by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate the cells of column `idx` top to bottom.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(idx).and_then(|c| c.as_deref()))
    }

    /// Keep only the columns for which `keep` returns `true`.
    ///
    /// Returns the names of the removed columns, in their original order.
    pub fn retain_columns<F>(&mut self, mut keep: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        let mask: Vec<bool> = self.columns.iter().map(|c| keep(c)).collect();
        if mask.iter().all(|k| *k) {
            return Vec::new();
        }

        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.columns.len());
        for (name, k) in self.columns.drain(..).zip(mask.iter()) {
            if *k {
                kept.push(name);
            } else {
                removed.push(name);
            }
        }
        self.columns = kept;

        for row in &mut self.rows {
            let mut i = 0;
            row.retain(|_| {
                let k = mask[i];
                i += 1;
                k
            });
        }
        removed
    }

    /// Replace every column name. `names` must have one entry per column.
    pub(crate) fn set_columns(&mut self, names: Vec<String>) {
        debug_assert_eq!(names.len(), self.columns.len());
        self.columns = names;
    }
}

/// Static configuration for one logical staging table.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct TableSpec {
    /// Destination table name.
    pub name: String,
    /// Glob patterns, relative to the data root, that supply this table's files.
    pub patterns: Vec<String>,
    /// Pinned canonical column names. `None` disables drift checking.
    #[serde(default, rename = "expected_columns")]
    pub expected_schema: Option<BTreeSet<String>>,
}

impl TableSpec {
    /// Create a table spec without an expected schema.
    pub fn new<P, S>(name: impl Into<String>, patterns: P) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            patterns: patterns.into_iter().map(Into::into).collect(),
            expected_schema: None,
        }
    }

    /// Pin the expected (already canonical) column set.
    pub fn with_expected<C, S>(mut self, columns: C) -> Self
    where
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected_schema = Some(columns.into_iter().map(Into::into).collect());
        self
    }
}

/// One unexpected column seen in one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftRecord {
    pub table_name: String,
    pub file_name: String,
    pub unknown_column_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(s: &str) -> Cell {
        Some(s.to_string())
    }

    #[test]
    fn new_normalizes_row_width() {
        let f = Frame::new(
            vec!["a".into(), "b".into()],
            vec![vec![cell("1")], vec![cell("1"), cell("2"), cell("3")]],
        );
        assert_eq!(f.rows[0], vec![cell("1"), None]);
        assert_eq!(f.rows[1], vec![cell("1"), cell("2")]);
    }

    #[test]
    fn retain_columns_drops_cells_in_step() {
        let mut f = Frame::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![vec![cell("1"), cell("2"), cell("3")]],
        );
        let removed = f.retain_columns(|c| c != "b");
        assert_eq!(removed, vec!["b".to_string()]);
        assert_eq!(f.columns, vec!["a", "c"]);
        assert_eq!(f.rows[0], vec![cell("1"), cell("3")]);
    }
}
