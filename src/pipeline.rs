//! Run orchestration.
//!
//! [`run_ingestion`] walks the table catalogue in order. Per table: discover files, then for
//! each file load → drift audit → normalize column names, then merge, provision and bulk load.
//! A failing file is skipped; a failing table is reported. Neither stops the run.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::columns::normalize_frame_columns;
use crate::drift;
use crate::error::IngestionError;
use crate::ingestion::{
    load_frame_as, severity_for_error, IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats,
    SourceFormat,
};
use crate::load::{bulk_load, LoadStrategy, DEFAULT_BATCH_SIZE};
use crate::merge::merge;
use crate::provision::{provision, ForceText};
use crate::store::StagingStore;
use crate::types::{Frame, TableSpec};

/// What happened to one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No file matched the table's patterns; nothing was touched.
    NoFiles,
    /// Files matched but none produced a usable frame; nothing was touched.
    NoUsableFiles,
    /// Dropping/recreating the table failed.
    ProvisionFailed,
    LoadedViaCopy { rows: u64 },
    LoadedViaCopyThenFallback { rows: u64 },
    LoadedViaRowInsert { rows: u64 },
    /// Row inserts failed (directly or as the COPY fallback); the table is empty.
    RowInsertFailed,
}

impl LoadOutcome {
    /// Rows now in the table, if it was loaded.
    pub fn rows(&self) -> Option<u64> {
        match self {
            Self::LoadedViaCopy { rows }
            | Self::LoadedViaCopyThenFallback { rows }
            | Self::LoadedViaRowInsert { rows } => Some(*rows),
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.rows().is_some()
    }
}

impl fmt::Display for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFiles => f.write_str("no-files"),
            Self::NoUsableFiles => f.write_str("no-usable-files"),
            Self::ProvisionFailed => f.write_str("provision-failed"),
            Self::LoadedViaCopy { rows } => write!(f, "loaded-via-copy ({rows} rows)"),
            Self::LoadedViaCopyThenFallback { rows } => write!(f, "loaded-via-copy-then-fallback ({rows} rows)"),
            Self::LoadedViaRowInsert { rows } => write!(f, "loaded-via-row-insert ({rows} rows)"),
            Self::RowInsertFailed => f.write_str("row-insert-failed"),
        }
    }
}

/// Summary of one table's processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub table: String,
    pub outcome: LoadOutcome,
    pub files_matched: usize,
    pub files_loaded: usize,
    pub files_failed: usize,
    pub drift_records: usize,
    /// Columns of the provisioned table (empty when nothing was provisioned).
    pub columns: Vec<String>,
}

impl TableReport {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            outcome: LoadOutcome::NoFiles,
            files_matched: 0,
            files_loaded: 0,
            files_failed: 0,
            drift_records: 0,
            columns: Vec::new(),
        }
    }
}

/// Summary of a whole run, tables in catalogue order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub tables: Vec<TableReport>,
}

impl RunReport {
    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == name)
    }

    pub fn total_rows(&self) -> u64 {
        self.tables.iter().filter_map(|t| t.outcome.rows()).sum()
    }

    pub fn loaded_tables(&self) -> usize {
        self.tables.iter().filter(|t| t.outcome.is_loaded()).count()
    }
}

/// Options controlling a run.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct IngestOptions {
    /// Directory the table patterns are relative to.
    pub data_root: PathBuf,
    /// Rows per `INSERT` statement.
    pub batch_size: usize,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for IngestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestOptions")
            .field("data_root", &self.data_root)
            .field("batch_size", &self.batch_size)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("."),
            batch_size: DEFAULT_BATCH_SIZE,
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

impl IngestOptions {
    /// Log a failure, then hand it to the observer (alerting at or above the threshold).
    fn report_failure(&self, ctx: &IngestionContext, error: &IngestionError) {
        let sev = severity_for_error(error);
        let path = ctx
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        match sev {
            IngestionSeverity::Info => {
                tracing::info!(table = %ctx.table, %path, %error, "step skipped")
            }
            IngestionSeverity::Warning => {
                tracing::warn!(table = %ctx.table, %path, %error, "step failed, continuing")
            }
            IngestionSeverity::Error | IngestionSeverity::Critical => {
                tracing::error!(table = %ctx.table, %path, severity = ?sev, %error, "step failed")
            }
        }

        if let Some(obs) = self.observer.as_ref() {
            obs.on_failure(ctx, sev, error);
            if sev >= self.alert_at_or_above {
                obs.on_alert(ctx, sev, error);
            }
        }
    }
}

/// Ingest every table in `specs`, in order, through one store session.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use staging_ingest::config::{default_table_specs, Settings};
/// use staging_ingest::ingestion::TracingObserver;
/// use staging_ingest::pipeline::{run_ingestion, IngestOptions};
/// use staging_ingest::store::PgStore;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = Settings::from_env()?;
/// let mut store = PgStore::connect(&settings.store)?;
/// let options = IngestOptions {
///     data_root: settings.data_root.clone(),
///     observer: Some(Arc::new(TracingObserver)),
///     ..Default::default()
/// };
/// let report = run_ingestion(&default_table_specs(), &mut store, &options);
/// println!("loaded {} tables", report.loaded_tables());
/// # Ok(())
/// # }
/// ```
pub fn run_ingestion<S>(specs: &[TableSpec], store: &mut S, options: &IngestOptions) -> RunReport
where
    S: StagingStore + ?Sized,
{
    tracing::info!(data_root = %options.data_root.display(), tables = specs.len(), "starting ingestion run");
    let tables = specs
        .iter()
        .map(|spec| ingest_table(spec, store, options))
        .collect();
    RunReport { tables }
}

/// Ingest one table. Never fails: the outcome is in the returned report.
pub fn ingest_table<S>(spec: &TableSpec, store: &mut S, options: &IngestOptions) -> TableReport
where
    S: StagingStore + ?Sized,
{
    let _span = tracing::info_span!("table", name = %spec.name).entered();
    let mut report = TableReport::new(&spec.name);

    let files = discover_files(&options.data_root, &spec.patterns);
    report.files_matched = files.len();
    if files.is_empty() {
        tracing::info!("no files found");
        return finish(report, options);
    }

    let mut frames: Vec<Frame> = Vec::with_capacity(files.len());
    let mut formats: Vec<SourceFormat> = Vec::with_capacity(files.len());
    for path in &files {
        match load_one_file(spec, path, store, options, &mut report) {
            Some((format, frame)) => {
                formats.push(format);
                frames.push(frame);
                report.files_loaded += 1;
            }
            None => report.files_failed += 1,
        }
    }

    let merged = match merge(frames) {
        Ok(m) if m.column_count() > 0 => m,
        Ok(_) => {
            tracing::warn!("merged frame has no columns, skipping table");
            report.outcome = LoadOutcome::NoUsableFiles;
            return finish(report, options);
        }
        Err(e) => {
            tracing::warn!(error = %e, "no usable files");
            report.outcome = LoadOutcome::NoUsableFiles;
            return finish(report, options);
        }
    };
    preview(&merged);

    let table_ctx = IngestionContext::table(&spec.name);
    let definition = match provision(store, &spec.name, &merged, &ForceText::All) {
        Ok(d) => d,
        Err(e) => {
            options.report_failure(&table_ctx, &e);
            report.outcome = LoadOutcome::ProvisionFailed;
            return finish(report, options);
        }
    };
    report.columns = definition.column_names();

    let strategy = LoadStrategy::for_formats(formats);
    tracing::info!(%strategy, rows = merged.row_count(), "loading");
    let load = bulk_load(store, &spec.name, &merged, strategy, options.batch_size);
    if let Some(copy_error) = &load.copy_error {
        options.report_failure(&table_ctx, copy_error);
    }

    report.outcome = match (&load.result, load.fell_back(), strategy) {
        (Ok(rows), true, _) => LoadOutcome::LoadedViaCopyThenFallback { rows: *rows },
        (Ok(rows), false, LoadStrategy::Copy) => LoadOutcome::LoadedViaCopy { rows: *rows },
        (Ok(rows), false, LoadStrategy::RowInsert) => LoadOutcome::LoadedViaRowInsert { rows: *rows },
        (Err(e), _, _) => {
            options.report_failure(&table_ctx, e);
            LoadOutcome::RowInsertFailed
        }
    };
    finish(report, options)
}

fn load_one_file<S>(
    spec: &TableSpec,
    path: &Path,
    store: &mut S,
    options: &IngestOptions,
    report: &mut TableReport,
) -> Option<(SourceFormat, Frame)>
where
    S: StagingStore + ?Sized,
{
    let format = match SourceFormat::detect(path) {
        Ok(f) => f,
        Err(e) => {
            options.report_failure(&IngestionContext::file(&spec.name, path, None), &e);
            return None;
        }
    };
    let ctx = IngestionContext::file(&spec.name, path, Some(format));
    tracing::debug!(path = %path.display(), %format, "loading file");

    let frame = match load_frame_as(path, format) {
        Ok(f) => f,
        Err(e) => {
            options.report_failure(&ctx, &e);
            return None;
        }
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let audit = drift::audit(frame, spec, &file_name, store);
    if !audit.records.is_empty() {
        report.drift_records += audit.records.len();
        if let Some(obs) = options.observer.as_ref() {
            obs.on_drift(&ctx, &audit.unknown_columns());
        }
    }
    if let Some(e) = &audit.persist_error {
        options.report_failure(&ctx, e);
    }

    let mut frame = audit.frame;
    normalize_frame_columns(&mut frame);

    if let Some(obs) = options.observer.as_ref() {
        obs.on_success(
            &ctx,
            IngestionStats {
                rows: frame.row_count(),
                columns: frame.column_count(),
            },
        );
    }
    Some((format, frame))
}

fn finish(report: TableReport, options: &IngestOptions) -> TableReport {
    if let Some(obs) = options.observer.as_ref() {
        obs.on_table_finished(&report);
    }
    report
}

fn preview(frame: &Frame) {
    tracing::debug!(columns = ?frame.columns, rows = frame.row_count(), "merged frame");
    if let Some(first) = frame.rows.first() {
        let pairs: Vec<String> = frame
            .columns
            .iter()
            .zip(first.iter())
            .map(|(c, v)| format!("{c}={}", v.as_deref().unwrap_or("NULL")))
            .collect();
        tracing::debug!(first_row = %pairs.join(", "), "merged frame first row");
    }
}

/// Expand `patterns` under `data_root` into existing files.
///
/// `**` recurses. Metacharacters in `data_root` itself are escaped. Matches are kept in
/// pattern order (each pattern's matches sorted by path), directories are skipped and a file
/// matched by several patterns appears once.
pub fn discover_files(data_root: &Path, patterns: &[String]) -> Vec<PathBuf> {
    let root = glob::Pattern::escape(&data_root.to_string_lossy());
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut files = Vec::new();

    for pattern in patterns {
        let full = format!("{}/{}", root.trim_end_matches('/'), pattern.trim_start_matches('/'));
        let entries = match glob::glob(&full) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "invalid file pattern, skipping");
                continue;
            }
        };
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => {
                    if seen.insert(path.clone()) {
                        files.push(path);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "unreadable path while expanding pattern"),
            }
        }
    }
    tracing::debug!(matched = files.len(), "expanded file patterns");
    files
}
