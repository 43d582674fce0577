//! Bulk loading into a provisioned table.
//!
//! Two strategies:
//!
//! - [`LoadStrategy::Copy`] serializes the frame in PostgreSQL's COPY text format
//!   (tab-separated, backslash-escaped, `\N` for null, no quoting) and streams it in one go.
//! - [`LoadStrategy::RowInsert`] issues parameterized multi-row `INSERT`s inside one
//!   transaction.
//!
//! [`bulk_load`] runs the chosen strategy. A failed COPY is rolled back and the same frame is
//! retried with row inserts against the same table; a failed row insert is final.

use std::fmt;

use crate::error::{IngestionError, IngestionResult};
use crate::ingestion::SourceFormat;
use crate::store::{quote_ident, quoted_list, StagingStore};
use crate::types::{Cell, Frame};

/// Rows per `INSERT` statement unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// PostgreSQL's limit on bind parameters per statement.
pub const MAX_BIND_PARAMETERS: usize = 65_535;

/// Null marker in the COPY payload.
pub const COPY_NULL: &str = "\\N";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrategy {
    Copy,
    RowInsert,
}

impl LoadStrategy {
    /// COPY when any contributing file was a binary serialized table, row inserts otherwise.
    pub fn for_formats<I>(formats: I) -> Self
    where
        I: IntoIterator<Item = SourceFormat>,
    {
        if formats.into_iter().any(SourceFormat::is_binary) {
            Self::Copy
        } else {
            Self::RowInsert
        }
    }
}

impl fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy => f.write_str("copy"),
            Self::RowInsert => f.write_str("row-insert"),
        }
    }
}

/// Result of [`bulk_load`].
#[derive(Debug)]
pub struct BulkLoadReport {
    /// Strategy tried first.
    pub strategy: LoadStrategy,
    /// Set when COPY was tried and failed (the fallback then ran).
    pub copy_error: Option<IngestionError>,
    /// Rows written by the strategy that finished, or the terminal row-insert failure.
    pub result: IngestionResult<u64>,
}

impl BulkLoadReport {
    pub fn fell_back(&self) -> bool {
        self.copy_error.is_some()
    }
}

/// Load `frame` into the already-provisioned `table`.
pub fn bulk_load<S>(
    store: &mut S,
    table: &str,
    frame: &Frame,
    strategy: LoadStrategy,
    batch_size: usize,
) -> BulkLoadReport
where
    S: StagingStore + ?Sized,
{
    let copy_error = match strategy {
        LoadStrategy::RowInsert => None,
        LoadStrategy::Copy => match copy_frame(store, table, frame) {
            Ok(rows) => {
                return BulkLoadReport {
                    strategy,
                    copy_error: None,
                    result: Ok(rows),
                };
            }
            Err(e) => {
                tracing::warn!(table, error = %e, "COPY failed, falling back to row inserts");
                Some(e)
            }
        },
    };

    BulkLoadReport {
        strategy,
        copy_error,
        result: insert_frame(store, table, frame, batch_size),
    }
}

/// Stream `frame` into `table` with COPY.
pub fn copy_frame<S>(store: &mut S, table: &str, frame: &Frame) -> IngestionResult<u64>
where
    S: StagingStore + ?Sized,
{
    let payload = encode_copy_text(frame);
    store
        .copy_in(table, &frame.columns, &payload)
        .map_err(|source| IngestionError::BulkLoadFailure {
            table: table.to_string(),
            source,
        })
}

/// Insert `frame` into `table` with batched multi-row inserts.
pub fn insert_frame<S>(store: &mut S, table: &str, frame: &Frame, batch_size: usize) -> IngestionResult<u64>
where
    S: StagingStore + ?Sized,
{
    let per_statement = rows_per_statement(batch_size, frame.column_count());
    store
        .insert_rows(table, &frame.columns, &frame.rows, per_statement)
        .map_err(|source| IngestionError::RowInsertFailure {
            table: table.to_string(),
            source,
        })
}

/// Rows per statement: `batch_size`, capped so no statement exceeds [`MAX_BIND_PARAMETERS`].
pub fn rows_per_statement(batch_size: usize, column_count: usize) -> usize {
    let cap = MAX_BIND_PARAMETERS / column_count.max(1);
    batch_size.clamp(1, cap.max(1))
}

/// `COPY "t" ("a", "b") FROM STDIN` in text format with an explicit null marker.
pub fn copy_statement(table: &str, columns: &[String]) -> String {
    format!(
        "COPY {} ({}) FROM STDIN WITH (FORMAT text, DELIMITER E'\\t', NULL '{}')",
        quote_ident(table),
        quoted_list(columns),
        COPY_NULL
    )
}

/// `INSERT INTO "t" ("a", "b") VALUES ($1, $2), ($3, $4), ...` for `rows` rows.
pub fn insert_statement(table: &str, columns: &[String], rows: usize) -> String {
    let width = columns.len();
    let values = (0..rows)
        .map(|r| {
            let params = (1..=width)
                .map(|c| format!("${}", r * width + c))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({params})")
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_ident(table),
        quoted_list(columns),
        values
    )
}

/// Serialize `frame` in COPY text format, one line per row.
pub fn encode_copy_text(frame: &Frame) -> Vec<u8> {
    let mut out = String::new();
    for row in &frame.rows {
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                out.push('\t');
            }
            match cell {
                None => out.push_str(COPY_NULL),
                Some(v) => escape_into(&mut out, v),
            }
        }
        out.push('\n');
    }
    out.into_bytes()
}

fn escape_into(out: &mut String, v: &str) {
    for c in v.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
}

/// Parse a COPY text payload back into rows of `width` cells.
pub fn decode_copy_text(payload: &[u8], width: usize) -> Result<Vec<Vec<Cell>>, String> {
    let text = std::str::from_utf8(payload).map_err(|e| format!("invalid utf-8 in copy data: {e}"))?;
    if text.is_empty() {
        return Ok(Vec::new());
    }
    let body = text.strip_suffix('\n').unwrap_or(text);

    let mut rows = Vec::new();
    for (n, line) in body.split('\n').enumerate() {
        let fields: Vec<Cell> = line.split('\t').map(unescape_field).collect::<Result<_, _>>()?;
        if fields.len() != width {
            return Err(format!(
                "extra or missing data at line {}: expected {width} fields, got {}",
                n + 1,
                fields.len()
            ));
        }
        rows.push(fields);
    }
    Ok(rows)
}

fn unescape_field(field: &str) -> Result<Cell, String> {
    if field == COPY_NULL {
        return Ok(None);
    }
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some(other) => out.push(other),
            None => return Err("trailing backslash in copy data".to_string()),
        }
    }
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(rows: Vec<Vec<Cell>>) -> Frame {
        Frame::new(vec!["a".into(), "b".into()], rows)
    }

    #[test]
    fn copy_text_escapes_delimiters_and_marks_nulls() {
        let f = frame(vec![vec![Some("x\ty".into()), None], vec![Some("back\\slash\n".into()), Some("".into())]]);
        let encoded = String::from_utf8(encode_copy_text(&f)).unwrap();
        assert_eq!(encoded, "x\\ty\t\\N\nback\\\\slash\\n\t\n");
    }

    #[test]
    fn decode_restores_encoded_rows() {
        let f = frame(vec![
            vec![Some("x\ty".into()), None],
            vec![Some("\\N literal".into()), Some("".into())],
        ]);
        let decoded = decode_copy_text(&encode_copy_text(&f), 2).unwrap();
        assert_eq!(decoded, f.rows);
    }

    #[test]
    fn decode_rejects_wrong_width() {
        assert!(decode_copy_text(b"1\t2\t3\n", 2).is_err());
    }

    #[test]
    fn insert_statement_numbers_parameters_row_major() {
        let cols = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            insert_statement("t", &cols, 2),
            "INSERT INTO \"t\" (\"a\", \"b\") VALUES ($1, $2), ($3, $4)"
        );
    }

    #[test]
    fn rows_per_statement_respects_parameter_limit() {
        assert_eq!(rows_per_statement(500, 4), 500);
        assert_eq!(rows_per_statement(500, 200), 327);
        assert_eq!(rows_per_statement(0, 3), 1);
        assert_eq!(rows_per_statement(500, 100_000), 1);
    }

    #[test]
    fn copy_chosen_for_any_binary_source() {
        use SourceFormat::*;
        assert_eq!(LoadStrategy::for_formats([DelimitedText, Parquet]), LoadStrategy::Copy);
        assert_eq!(LoadStrategy::for_formats([DelimitedText, HtmlTable]), LoadStrategy::RowInsert);
        assert_eq!(LoadStrategy::for_formats([]), LoadStrategy::RowInsert);
    }
}
