//! Delimited-text loading.
//!
//! Files arrive comma- or tab-separated with no reliable hint which; a few use something else
//! entirely. Comma is tried first, then tab, and the first strict parse that yields more than
//! one column wins. Otherwise the delimiter is sniffed and the file is read in flexible mode.

use std::fs;
use std::path::Path;

use crate::error::{IngestionError, IngestionResult};
use crate::types::{Cell, Frame};

use super::{header_names, text_cell};

/// Delimiters tried strictly, in order.
const PREFERRED_DELIMITERS: [u8; 2] = [b',', b'\t'];

/// Candidates considered when sniffing.
const SNIFF_CANDIDATES: [u8; 5] = [b',', b'\t', b';', b'|', b':'];

/// Lines inspected when sniffing.
const SNIFF_LINES: usize = 20;

/// Load a delimited text file into a [`Frame`].
pub fn load_csv_from_path(path: impl AsRef<Path>) -> IngestionResult<Frame> {
    let bytes = fs::read(path)?;
    load_csv_from_bytes(&bytes)
}

/// Load delimited text from an in-memory buffer.
pub fn load_csv_from_bytes(input: &[u8]) -> IngestionResult<Frame> {
    for delimiter in PREFERRED_DELIMITERS {
        match read_delimited(input, delimiter, false) {
            Ok(frame) if frame.column_count() > 1 => return Ok(frame),
            Ok(_) => continue,
            Err(e) => {
                tracing::trace!(delimiter = %(delimiter as char).escape_default(), error = %e, "strict parse rejected");
            }
        }
    }

    let delimiter = sniff_delimiter(input);
    read_delimited(input, delimiter, true)
}

fn read_delimited(input: &[u8], delimiter: u8, flexible: bool) -> IngestionResult<Frame> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(flexible)
        .from_reader(input);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(IngestionError::malformed("delimited file has no header row"));
    }
    let columns = header_names(headers.iter());

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(text_cell).collect());
    }

    Ok(Frame::new(columns, rows))
}

/// Pick the candidate delimiter that appears a consistent, non-zero number of times per line.
///
/// Falls back to the most frequent candidate, then to comma.
pub fn sniff_delimiter(input: &[u8]) -> u8 {
    let text = String::from_utf8_lossy(input);
    let lines: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();
    if lines.is_empty() {
        return b',';
    }

    let mut consistent: Option<(u8, usize)> = None;
    let mut frequent: Option<(u8, usize)> = None;
    for candidate in SNIFF_CANDIDATES {
        let counts: Vec<usize> = lines
            .iter()
            .map(|l| l.bytes().filter(|b| *b == candidate).count())
            .collect();
        let first = counts[0];
        let total: usize = counts.iter().sum();

        if first > 0 && counts.iter().all(|c| *c == first) && consistent.is_none_or(|(_, n)| first > n) {
            consistent = Some((candidate, first));
        }
        if total > 0 && frequent.is_none_or(|(_, n)| total > n) {
            frequent = Some((candidate, total));
        }
    }

    consistent.or(frequent).map(|(d, _)| d).unwrap_or(b',')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_wins_when_it_splits() {
        let f = load_csv_from_bytes(b"a,b\n1,2\n").unwrap();
        assert_eq!(f.columns, vec!["a", "b"]);
        assert_eq!(f.rows, vec![vec![Some("1".to_string()), Some("2".to_string())]]);
    }

    #[test]
    fn tab_used_when_comma_gives_one_column() {
        let f = load_csv_from_bytes(b"a\tb\n1\t2,5\n").unwrap();
        assert_eq!(f.columns, vec!["a", "b"]);
        assert_eq!(f.rows[0][1].as_deref(), Some("2,5"));
    }

    #[test]
    fn sniffs_semicolon() {
        assert_eq!(sniff_delimiter(b"a;b;c\n1;2;3\n"), b';');
        let f = load_csv_from_bytes(b"a;b;c\n1;2;3\n").unwrap();
        assert_eq!(f.columns, vec!["a", "b", "c"]);
    }

    #[test]
    fn ragged_rows_are_tolerated_after_sniffing() {
        let f = load_csv_from_bytes(b"a|b|c\n1|2\n1|2|3|4\n").unwrap();
        assert_eq!(f.column_count(), 3);
        assert_eq!(f.rows[0], vec![Some("1".into()), Some("2".into()), None]);
        assert_eq!(f.rows[1].len(), 3);
    }

    #[test]
    fn empty_and_na_fields_are_null() {
        let f = load_csv_from_bytes(b"a,b\n,NA\n").unwrap();
        assert_eq!(f.rows[0], vec![None, None]);
    }

    #[test]
    fn blank_header_gets_positional_name() {
        let f = load_csv_from_bytes(b",name\n0,Ada\n").unwrap();
        assert_eq!(f.columns, vec!["Unnamed: 0", "name"]);
    }

    #[test]
    fn empty_input_is_malformed() {
        assert!(load_csv_from_bytes(b"").is_err());
    }
}
