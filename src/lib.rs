//! `staging-ingest` loads departmental data files into PostgreSQL staging tables.
//!
//! A run walks a catalogue of [`types::TableSpec`]s. For each table it expands the table's
//! file patterns, loads every matching file into a text-only [`types::Frame`], quarantines
//! columns outside the table's expected schema, normalizes column names, merges the frames,
//! recreates the table and bulk loads the merged rows.
//!
//! ## What you can ingest
//!
//! **File formats (auto-detected by extension):**
//!
//! - **Delimited text**: `.csv`, `.tsv`, `.txt` (comma, then tab, then a sniffed delimiter)
//! - **Excel/workbooks** (Cargo feature `excel`, on by default): `.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`
//! - **JSON**: `.json`, `.ndjson`, `.jsonl` (records, column-oriented objects, or one object per line)
//! - **Pickle**: `.pkl`, `.pickle` (lists of dicts or dicts of columns)
//! - **Arrow IPC / Feather v2**: `.feather`, `.arrow`, `.ipc`
//! - **Parquet**: `.parquet`, `.pq`
//! - **HTML**: `.html`, `.htm` (first `<table>`)
//!
//! Every cell is carried as text. Empty strings and explicit nulls become `None`.
//!
//! ## Quick example: load one file
//!
//! ```no_run
//! use staging_ingest::ingestion::load_frame;
//!
//! # fn main() -> Result<(), staging_ingest::IngestionError> {
//! let frame = load_frame("data/Operations Department/order_delays.html")?;
//! println!("columns={:?} rows={}", frame.columns, frame.row_count());
//! # Ok(())
//! # }
//! ```
//!
//! ## Running a whole catalogue against an in-memory store
//!
//! ```no_run
//! use staging_ingest::pipeline::{run_ingestion, IngestOptions};
//! use staging_ingest::store::MemoryStore;
//! use staging_ingest::types::TableSpec;
//!
//! let specs = vec![TableSpec::new("staging_orders", ["orders/*.csv"]).with_expected(["order_id", "user_id"])];
//! let mut store = MemoryStore::new();
//! let options = IngestOptions {
//!     data_root: "data".into(),
//!     ..Default::default()
//! };
//! let report = run_ingestion(&specs, &mut store, &options);
//! for table in &report.tables {
//!     println!("{} -> {}", table.table, table.outcome);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: format loaders, the unified entrypoint and run observers
//! - [`columns`]: column-name sanitizing and de-duplication
//! - [`drift`]: schema-drift quarantine
//! - [`merge`]: outer union of per-file frames
//! - [`provision`]: table (re)creation
//! - [`load`]: COPY and row-insert bulk loading
//! - [`store`]: the [`store::StagingStore`] boundary with PostgreSQL and in-memory implementations
//! - [`pipeline`]: run orchestration
//! - [`config`]: environment settings and the table catalogue
//! - [`error`]: error types

pub mod columns;
pub mod config;
pub mod drift;
pub mod error;
pub mod ingestion;
pub mod load;
pub mod merge;
pub mod pipeline;
pub mod provision;
pub mod store;
pub mod types;

pub use error::{IngestionError, IngestionResult};
