#![cfg(feature = "excel")]

use std::path::Path;

use calamine::{open_workbook_auto, Data, ExcelDateTime, Reader};
use chrono::{DurationRound, TimeDelta};

use crate::error::{IngestionError, IngestionResult};
use crate::types::{Cell, Frame};

use super::{header_names, non_empty, text_cell};

/// Load a spreadsheet (`.xlsx`, `.xls`, `.ods`, etc.) into a [`Frame`].
///
/// Behavior:
/// - Picks `sheet_name` if provided; otherwise uses the first sheet in the workbook
/// - Detects the first non-empty row as the header row
/// - Skips rows that are entirely empty
/// - Renders every cell as text; whole-number floats lose their `.0`
/// - Date cells render as `%Y-%m-%d %H:%M:%S` (rounded to the second)
/// - String cells holding a null marker (`NA`, `#N/A`, ...) are null, as in delimited text
pub fn load_excel_from_path(path: impl AsRef<Path>, sheet_name: Option<&str>) -> IngestionResult<Frame> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet = match sheet_name {
        Some(s) => s.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| IngestionError::malformed("workbook has no sheets"))?,
    };

    let range = workbook.worksheet_range(&sheet)?;
    sheet_range_to_frame(&sheet, &range)
}

fn sheet_range_to_frame(sheet: &str, range: &calamine::Range<Data>) -> IngestionResult<Frame> {
    let mut rows_iter = range
        .rows()
        .filter(|row| row.iter().any(|c| !matches!(c, Data::Empty)));

    let header = rows_iter.next().ok_or_else(|| {
        IngestionError::malformed(format!("sheet '{sheet}' has no non-empty rows (no header row found)"))
    })?;
    let header_cells: Vec<String> = header.iter().map(cell_to_text).collect();
    let columns = header_names(header_cells.iter().map(String::as_str));

    let rows: Vec<Vec<Cell>> = rows_iter
        .map(|row| row.iter().map(data_cell).collect())
        .collect();

    Ok(Frame::new(columns, rows))
}

fn data_cell(c: &Data) -> Cell {
    match c {
        Data::String(s) => text_cell(s),
        other => non_empty(cell_to_text(other)),
    }
}

fn cell_to_text(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.is_finite() && f.abs() < 1e15 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => datetime_text(dt),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
        Data::Empty => String::new(),
    }
}

/// Excel serial date as wall-clock text; durations and out-of-range serials keep the serial.
fn datetime_text(dt: &ExcelDateTime) -> String {
    if dt.is_duration() {
        return dt.to_string();
    }
    match dt.as_datetime() {
        Some(ndt) => ndt
            .duration_round(TimeDelta::seconds(1))
            .unwrap_or(ndt)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => dt.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use calamine::Range;

    use super::*;

    fn text(s: &str) -> Data {
        Data::String(s.to_string())
    }

    #[test]
    fn null_markers_in_string_cells_are_null() {
        let mut range = Range::new((0, 0), (2, 1));
        range.set_value((0, 0), text("order_id"));
        range.set_value((0, 1), text("delay"));
        range.set_value((1, 0), text("O1"));
        range.set_value((1, 1), text("NA"));
        range.set_value((2, 0), text("O2"));
        range.set_value((2, 1), Data::Float(3.0));

        let f = sheet_range_to_frame("Sheet1", &range).unwrap();
        assert_eq!(f.columns, vec!["order_id", "delay"]);
        assert_eq!(f.rows[0], vec![Some("O1".to_string()), None]);
        assert_eq!(f.rows[1], vec![Some("O2".to_string()), Some("3".to_string())]);
    }

    #[test]
    fn leading_blank_rows_are_skipped_before_the_header() {
        let mut range = Range::new((0, 0), (2, 0));
        range.set_value((1, 0), text("id"));
        range.set_value((2, 0), Data::Int(7));

        let f = sheet_range_to_frame("Sheet1", &range).unwrap();
        assert_eq!(f.columns, vec!["id"]);
        assert_eq!(f.rows, vec![vec![Some("7".to_string())]]);
    }
}
