use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

/// Convenience result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Error type returned across the ingestion pipeline.
///
/// Format-library errors convert in via `#[from]`; the pipeline then wraps them into one of the
/// structured variants (`LoadFailure`, `ProvisionFailure`, ...) that decide how far a failure
/// is allowed to propagate.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Spreadsheet decoding error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// Delimited-text decoding error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Parquet decoding error.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Arrow IPC (Feather) decoding error.
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// JSON decoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Pickle decoding error.
    #[error("pickle error: {0}")]
    Pickle(#[from] serde_pickle::Error),

    /// The file decoded, but its content is not a table we can represent.
    #[error("malformed input: {message}")]
    Malformed { message: String },

    /// The file extension does not map to any supported source format.
    #[error("unsupported file format '{extension}'")]
    UnsupportedFormat { extension: String },

    /// A supported file could not be read or parsed.
    #[error("failed to load {}: {source}", path.display())]
    LoadFailure {
        path: PathBuf,
        #[source]
        source: Box<IngestionError>,
    },

    /// Persisting drift records failed. Never aborts ingestion.
    #[error("failed to record schema drift for table '{table}': {source}")]
    DriftAuditFailure {
        table: String,
        #[source]
        source: StoreError,
    },

    /// Dropping/recreating the destination table failed.
    #[error("failed to provision table '{table}': {source}")]
    ProvisionFailure {
        table: String,
        #[source]
        source: StoreError,
    },

    /// The streaming COPY path failed; callers fall back to row inserts.
    #[error("bulk copy into '{table}' failed: {source}")]
    BulkLoadFailure {
        table: String,
        #[source]
        source: StoreError,
    },

    /// Batched row inserts failed; the table is left empty.
    #[error("row insert into '{table}' failed: {source}")]
    RowInsertFailure {
        table: String,
        #[source]
        source: StoreError,
    },

    /// Merge was called with no frames.
    #[error("no frames to merge")]
    EmptyInput,

    /// Invalid or unreadable configuration.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Could not open the store session.
    #[error("failed to connect to store: {0}")]
    Connect(#[source] StoreError),
}

impl IngestionError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
