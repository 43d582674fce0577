use std::error::Error as StdError;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::IngestionError;
use crate::pipeline::TableReport;

use super::unified::SourceFormat;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal, processing continued).
    Warning,
    /// Error-level event (a file or table failed).
    Error,
    /// Critical error (typically I/O or store connectivity).
    Critical,
}

/// Where an event happened: always a table, optionally one of its files.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    /// Destination staging table.
    pub table: String,
    /// Source file, for file-level events.
    pub path: Option<PathBuf>,
    /// Detected format of `path`, once known.
    pub format: Option<SourceFormat>,
}

impl IngestionContext {
    /// Context for a table-level event.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            path: None,
            format: None,
        }
    }

    /// Context for a file-level event.
    pub fn file(table: impl Into<String>, path: impl AsRef<Path>, format: Option<SourceFormat>) -> Self {
        Self {
            table: table.into(),
            path: Some(path.as_ref().to_path_buf()),
            format,
        }
    }

    fn path_display(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    fn format_display(&self) -> String {
        self.format
            .map(|f| f.to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

/// Minimal stats reported when a file loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionStats {
    /// Rows read from the file.
    pub rows: usize,
    /// Columns kept after drift stripping.
    pub columns: usize,
}

/// Observer interface for run events.
///
/// Implementors can record metrics, logs, or trigger alerts. Every method has a no-op default.
pub trait IngestionObserver: Send + Sync {
    /// Called when a file has been loaded, audited and normalized.
    fn on_success(&self, _ctx: &IngestionContext, _stats: IngestionStats) {}

    /// Called when a file or table step fails.
    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &IngestionError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.on_failure(ctx, severity, error)
    }

    /// Called when a file carried columns outside the table's expected schema.
    fn on_drift(&self, _ctx: &IngestionContext, _unknown_columns: &[String]) {}

    /// Called once per table after its outcome is known.
    fn on_table_finished(&self, _report: &TableReport) {}
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }

    fn on_drift(&self, ctx: &IngestionContext, unknown_columns: &[String]) {
        for o in &self.observers {
            o.on_drift(ctx, unknown_columns);
        }
    }

    fn on_table_finished(&self, report: &TableReport) {
        for o in &self.observers {
            o.on_table_finished(report);
        }
    }
}

/// Emits run events as `tracing` events.
///
/// Failures are logged by the pipeline itself and are not repeated here.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl IngestionObserver for TracingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        tracing::info!(
            table = %ctx.table,
            path = %ctx.path_display(),
            format = %ctx.format_display(),
            rows = stats.rows,
            columns = stats.columns,
            "loaded file"
        );
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        tracing::error!(
            table = %ctx.table,
            path = %ctx.path_display(),
            format = %ctx.format_display(),
            ?severity,
            %error,
            "ALERT"
        );
    }

    fn on_drift(&self, ctx: &IngestionContext, unknown_columns: &[String]) {
        tracing::warn!(
            table = %ctx.table,
            path = %ctx.path_display(),
            ?unknown_columns,
            "schema drift detected, columns quarantined"
        );
    }

    fn on_table_finished(&self, report: &TableReport) {
        tracing::info!(
            table = %report.table,
            outcome = %report.outcome,
            files_loaded = report.files_loaded,
            files_failed = report.files_failed,
            drift_records = report.drift_records,
            "table finished"
        );
    }
}

/// Appends run events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{} {line}", timestamp());
        }
    }
}

impl IngestionObserver for FileObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.append_line(&format!(
            "ok table={} format={} path={} rows={} columns={}",
            ctx.table,
            ctx.format_display(),
            ctx.path_display(),
            stats.rows,
            stats.columns
        ));
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(&format!(
            "fail severity={:?} table={} format={} path={} err={}",
            severity,
            ctx.table,
            ctx.format_display(),
            ctx.path_display(),
            error
        ));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(&format!(
            "ALERT severity={:?} table={} format={} path={} err={}",
            severity,
            ctx.table,
            ctx.format_display(),
            ctx.path_display(),
            error
        ));
    }

    fn on_drift(&self, ctx: &IngestionContext, unknown_columns: &[String]) {
        self.append_line(&format!(
            "drift table={} path={} columns={}",
            ctx.table,
            ctx.path_display(),
            unknown_columns.join(",")
        ));
    }

    fn on_table_finished(&self, report: &TableReport) {
        self.append_line(&format!(
            "table table={} outcome={} files_loaded={} files_failed={}",
            report.table, report.outcome, report.files_loaded, report.files_failed
        ));
    }
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Classify an error for alerting.
pub fn severity_for_error(e: &IngestionError) -> IngestionSeverity {
    match e {
        IngestionError::Io(_) | IngestionError::Config { .. } | IngestionError::Connect(_) => {
            IngestionSeverity::Critical
        }
        IngestionError::LoadFailure { source, .. } => severity_for_error(source),
        IngestionError::UnsupportedFormat { .. } => IngestionSeverity::Warning,
        IngestionError::DriftAuditFailure { .. } | IngestionError::BulkLoadFailure { .. } => {
            IngestionSeverity::Warning
        }
        IngestionError::EmptyInput => IngestionSeverity::Info,
        IngestionError::Malformed { .. }
        | IngestionError::ProvisionFailure { .. }
        | IngestionError::RowInsertFailure { .. } => IngestionSeverity::Error,
        // Best-effort: format errors often wrap IO, but not always in a structured way.
        // If we can detect IO in the source chain, treat it as Critical.
        other => {
            if error_chain_contains_io(other) {
                IngestionSeverity::Critical
            } else {
                IngestionSeverity::Error
            }
        }
    }
}

fn error_chain_contains_io(e: &(dyn StdError + 'static)) -> bool {
    let mut cur: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = cur {
        if err.is::<std::io::Error>() {
            return true;
        }
        cur = err.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_failure_takes_severity_of_its_cause() {
        let io = IngestionError::LoadFailure {
            path: PathBuf::from("x.csv"),
            source: Box::new(IngestionError::Io(std::io::Error::other("gone"))),
        };
        assert_eq!(severity_for_error(&io), IngestionSeverity::Critical);

        let bad = IngestionError::LoadFailure {
            path: PathBuf::from("x.json"),
            source: Box::new(IngestionError::Malformed { message: "nope".into() }),
        };
        assert_eq!(severity_for_error(&bad), IngestionSeverity::Error);
    }

    #[test]
    fn recoverable_store_failures_are_warnings() {
        let e = IngestionError::BulkLoadFailure {
            table: "t".into(),
            source: crate::store::StoreError::Rejected("x".into()),
        };
        assert_eq!(severity_for_error(&e), IngestionSeverity::Warning);
    }
}
