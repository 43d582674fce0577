//! Arrow IPC (Feather v2) loading.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use arrow::array::Array;
use arrow::ipc::reader::FileReader;
use arrow::util::display::{ArrayFormatter, FormatOptions};

use crate::error::IngestionResult;
use crate::types::{Cell, Frame};

use super::non_empty;

/// Load an Arrow IPC file into a [`Frame`].
///
/// Each record batch is rendered cell by cell with Arrow's display formatter, so dates,
/// timestamps and decimals come out in their canonical text form.
pub fn load_arrow_ipc_from_path(path: impl AsRef<Path>) -> IngestionResult<Frame> {
    let file = File::open(path)?;
    let reader = FileReader::try_new(BufReader::new(file), None)?;

    let columns: Vec<String> = reader
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();

    let options = FormatOptions::default();
    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for batch in reader {
        let batch = batch?;
        let formatters = batch
            .columns()
            .iter()
            .map(|a| ArrayFormatter::try_new(a.as_ref(), &options))
            .collect::<Result<Vec<_>, _>>()?;

        for i in 0..batch.num_rows() {
            let row = batch
                .columns()
                .iter()
                .zip(formatters.iter())
                .map(|(array, fmt)| {
                    if array.is_null(i) {
                        None
                    } else {
                        non_empty(fmt.value(i).to_string())
                    }
                })
                .collect();
            rows.push(row);
        }
    }

    Ok(Frame::new(columns, rows))
}
