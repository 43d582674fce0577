//! Parquet loading.

use std::collections::HashMap;
use std::path::Path;

use parquet::file::reader::{ChunkReader, FileReader};
use parquet::file::serialized_reader::SerializedFileReader;
use parquet::record::Field;

use crate::error::IngestionResult;
use crate::types::{Cell, Frame};

use super::non_empty;

/// Load a Parquet file into a [`Frame`].
///
/// Notes:
/// - Columns are the top-level fields of the file schema, so zero-row files still have columns
/// - Uses the Parquet record API (`RowIter`); every value is rendered through its `Display`
pub fn load_parquet_from_path(path: impl AsRef<Path>) -> IngestionResult<Frame> {
    let reader = SerializedFileReader::try_from(path.as_ref())?;
    let columns = parquet_top_level_columns(&reader);

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for row_res in reader.into_iter() {
        let row = row_res?;

        let by_name: HashMap<&str, &Field> = row
            .get_column_iter()
            .map(|(name, field)| (name.as_str(), field))
            .collect();

        rows.push(
            columns
                .iter()
                .map(|c| by_name.get(c.as_str()).and_then(|f| parquet_cell(f)))
                .collect(),
        );
    }

    Ok(Frame::new(columns, rows))
}

fn parquet_top_level_columns<R: ChunkReader + 'static>(reader: &SerializedFileReader<R>) -> Vec<String> {
    reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .root_schema()
        .get_fields()
        .iter()
        .map(|t| t.name().to_string())
        .collect()
}

fn parquet_cell(f: &Field) -> Cell {
    match f {
        Field::Null => None,
        Field::Str(s) => non_empty(s.as_str()),
        Field::Bytes(b) => non_empty(String::from_utf8_lossy(b.data())),
        other => Some(other.to_string()),
    }
}
