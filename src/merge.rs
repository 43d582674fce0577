//! Union of per-file frames for one table.

use std::collections::HashMap;

use crate::error::{IngestionError, IngestionResult};
use crate::types::{Cell, Frame};

/// Concatenate `frames` row-wise, aligning columns by name.
///
/// The result has every column seen in any input (first-appearance order); rows from a frame
/// that lacks a column get null there. Row order follows input order.
pub fn merge(frames: Vec<Frame>) -> IngestionResult<Frame> {
    if frames.is_empty() {
        return Err(IngestionError::EmptyInput);
    }

    let mut columns: Vec<String> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();
    for f in &frames {
        for c in &f.columns {
            if !position.contains_key(c) {
                position.insert(c.clone(), columns.len());
                columns.push(c.clone());
            }
        }
    }

    let width = columns.len();
    let total: usize = frames.iter().map(Frame::row_count).sum();
    let mut rows: Vec<Vec<Cell>> = Vec::with_capacity(total);
    for f in frames {
        let targets: Vec<usize> = f.columns.iter().map(|c| position[c]).collect();
        for row in f.rows {
            let mut out: Vec<Cell> = vec![None; width];
            for (cell, &t) in row.into_iter().zip(targets.iter()) {
                out[t] = cell;
            }
            rows.push(out);
        }
    }

    Ok(Frame::new(columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(s: &str) -> Cell {
        Some(s.to_string())
    }

    #[test]
    fn outer_union_fills_missing_with_null() {
        let a = Frame::new(vec!["id".into(), "name".into()], vec![vec![cell("1"), cell("a")]]);
        let b = Frame::new(vec!["price".into(), "id".into()], vec![vec![cell("9"), cell("2")]]);
        let m = merge(vec![a, b]).unwrap();
        assert_eq!(m.columns, vec!["id", "name", "price"]);
        assert_eq!(m.rows, vec![vec![cell("1"), cell("a"), None], vec![cell("2"), None, cell("9")]]);
    }

    #[test]
    fn zero_frames_is_empty_input() {
        assert!(matches!(merge(Vec::new()), Err(IngestionError::EmptyInput)));
    }
}
