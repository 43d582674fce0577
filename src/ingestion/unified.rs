//! Unified loading entrypoint.
//!
//! Most callers should use [`load_frame`], which detects the [`SourceFormat`] from the file
//! extension and loads the file into a text-only [`Frame`]. Use [`load_frame_as`] when the
//! format is already known.

use std::fmt;
use std::path::Path;

use crate::columns::is_index_artifact;
use crate::error::{IngestionError, IngestionResult};
use crate::types::Frame;

use super::{arrow_ipc, csv, html, json, parquet, pickle};

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// Comma/tab/otherwise delimited text.
    DelimitedText,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Spreadsheet,
    /// JSON records, column-oriented JSON, or NDJSON.
    JsonRecords,
    /// Python pickle of plain records/columns.
    Pickle,
    /// Arrow IPC file (Feather v2).
    ArrowIpc,
    /// Apache Parquet.
    Parquet,
    /// First `<table>` of an HTML document.
    HtmlTable,
}

impl SourceFormat {
    /// Every supported format.
    pub const ALL: [SourceFormat; 7] = [
        Self::DelimitedText,
        Self::Spreadsheet,
        Self::JsonRecords,
        Self::Pickle,
        Self::ArrowIpc,
        Self::Parquet,
        Self::HtmlTable,
    ];

    /// File extensions (lower-case, without the dot) that select this format.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::DelimitedText => &["csv", "tsv", "txt"],
            Self::Spreadsheet => &["xlsx", "xls", "xlsm", "xlsb", "ods"],
            Self::JsonRecords => &["json", "ndjson", "jsonl"],
            Self::Pickle => &["pkl", "pickle"],
            Self::ArrowIpc => &["feather", "arrow", "ipc"],
            Self::Parquet => &["parquet", "pq"],
            Self::HtmlTable => &["html", "htm"],
        }
    }

    /// Parse a source format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.extensions().contains(&ext.as_str()))
    }

    /// Detect the format of `path` from its extension.
    ///
    /// Fails with [`IngestionError::UnsupportedFormat`] when the extension is missing or unknown.
    pub fn detect(path: &Path) -> IngestionResult<Self> {
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        Self::from_extension(ext).ok_or_else(|| IngestionError::UnsupportedFormat {
            extension: ext.to_string(),
        })
    }

    /// Binary serialized-table formats. Tables fed by any of these load through COPY first.
    pub fn is_binary(self) -> bool {
        matches!(self, Self::Pickle | Self::ArrowIpc | Self::Parquet)
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DelimitedText => "delimited-text",
            Self::Spreadsheet => "spreadsheet",
            Self::JsonRecords => "json-records",
            Self::Pickle => "pickle",
            Self::ArrowIpc => "arrow-ipc",
            Self::Parquet => "parquet",
            Self::HtmlTable => "html-table",
        };
        f.write_str(s)
    }
}

/// Load `path`, detecting its format from the extension.
///
/// # Examples
///
/// ```no_run
/// use staging_ingest::ingestion::load_frame;
///
/// # fn main() -> Result<(), staging_ingest::IngestionError> {
/// let frame = load_frame("data/Marketing Department/campaign_data.csv")?;
/// println!("columns={:?} rows={}", frame.columns, frame.row_count());
/// # Ok(())
/// # }
/// ```
pub fn load_frame(path: impl AsRef<Path>) -> IngestionResult<Frame> {
    let path = path.as_ref();
    let format = SourceFormat::detect(path)?;
    load_frame_as(path, format)
}

/// Load `path` as `format`.
///
/// Any decoding error is wrapped in [`IngestionError::LoadFailure`] carrying the path. Index
/// artifact columns are dropped from the result.
pub fn load_frame_as(path: impl AsRef<Path>, format: SourceFormat) -> IngestionResult<Frame> {
    let path = path.as_ref();
    let result = match format {
        SourceFormat::DelimitedText => csv::load_csv_from_path(path),
        SourceFormat::Spreadsheet => load_spreadsheet_dispatch(path),
        SourceFormat::JsonRecords => json::load_json_from_path(path),
        SourceFormat::Pickle => pickle::load_pickle_from_path(path),
        SourceFormat::ArrowIpc => arrow_ipc::load_arrow_ipc_from_path(path),
        SourceFormat::Parquet => parquet::load_parquet_from_path(path),
        SourceFormat::HtmlTable => html::load_html_table_from_path(path),
    };

    let mut frame = result.map_err(|e| IngestionError::LoadFailure {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;

    let dropped = frame.retain_columns(|c| !is_index_artifact(c));
    if !dropped.is_empty() {
        tracing::debug!(path = %path.display(), ?dropped, "dropped index artifact columns");
    }
    Ok(frame)
}

#[cfg_attr(not(feature = "excel"), allow(unused_variables))]
fn load_spreadsheet_dispatch(path: &Path) -> IngestionResult<Frame> {
    #[cfg(feature = "excel")]
    {
        super::excel::load_excel_from_path(path, None)
    }

    #[cfg(not(feature = "excel"))]
    {
        Err(IngestionError::malformed(
            "spreadsheet loading not enabled (enable cargo feature 'excel')",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_disjoint() {
        let mut seen = std::collections::HashSet::new();
        for f in SourceFormat::ALL {
            for ext in f.extensions() {
                assert!(seen.insert(*ext), "extension {ext} claimed twice");
                assert_eq!(SourceFormat::from_extension(ext), Some(f));
            }
        }
    }

    #[test]
    fn detection_is_case_insensitive() {
        assert_eq!(
            SourceFormat::detect(Path::new("a/B.PARQUET")).unwrap(),
            SourceFormat::Parquet
        );
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = SourceFormat::detect(Path::new("notes.docx")).unwrap_err();
        assert!(matches!(err, IngestionError::UnsupportedFormat { ref extension } if extension == "docx"));
    }

    #[cfg(feature = "excel")]
    #[test]
    fn spreadsheet_dispatch_reaches_the_workbook_reader() {
        let err = load_frame_as("missing/product_list.xlsx", SourceFormat::Spreadsheet).unwrap_err();
        assert!(matches!(
            err,
            IngestionError::LoadFailure { ref source, .. } if matches!(**source, IngestionError::Excel(_))
        ));
    }

    #[cfg(not(feature = "excel"))]
    #[test]
    fn spreadsheet_without_feature_is_malformed() {
        let err = load_frame_as("missing/product_list.xlsx", SourceFormat::Spreadsheet).unwrap_err();
        assert!(matches!(
            err,
            IngestionError::LoadFailure { ref source, .. } if matches!(**source, IngestionError::Malformed { .. })
        ));
    }

    #[test]
    fn only_serialized_tables_are_binary() {
        let binary: Vec<_> = SourceFormat::ALL.into_iter().filter(|f| f.is_binary()).collect();
        assert_eq!(
            binary,
            vec![SourceFormat::Pickle, SourceFormat::ArrowIpc, SourceFormat::Parquet]
        );
    }
}
