use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use staging_ingest::ingestion::{
    CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats,
};
use staging_ingest::pipeline::{ingest_table, IngestOptions, LoadOutcome, TableReport};
use staging_ingest::store::MemoryStore;
use staging_ingest::types::TableSpec;
use staging_ingest::IngestionError;

#[derive(Default)]
struct RecordingObserver {
    loaded: Mutex<Vec<(String, IngestionStats)>>,
    failures: Mutex<Vec<IngestionSeverity>>,
    alerts: Mutex<Vec<IngestionSeverity>>,
    drift: Mutex<Vec<Vec<String>>>,
    finished: Mutex<Vec<LoadOutcome>>,
}

impl IngestionObserver for RecordingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        let name = ctx
            .path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.loaded.lock().unwrap().push((name, stats));
    }

    fn on_failure(&self, _ctx: &IngestionContext, severity: IngestionSeverity, _error: &IngestionError) {
        self.failures.lock().unwrap().push(severity);
    }

    fn on_alert(&self, _ctx: &IngestionContext, severity: IngestionSeverity, _error: &IngestionError) {
        self.alerts.lock().unwrap().push(severity);
    }

    fn on_drift(&self, _ctx: &IngestionContext, unknown_columns: &[String]) {
        self.drift.lock().unwrap().push(unknown_columns.to_vec());
    }

    fn on_table_finished(&self, report: &TableReport) {
        self.finished.lock().unwrap().push(report.outcome);
    }
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn observer_sees_file_and_table_events() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ops/order_data_1.csv", "order_id,user_id,extra\nO1,U1,x\nO2,U2,y\n");
    write(dir.path(), "ops/order_data_2.json", "[1]");

    let obs = Arc::new(RecordingObserver::default());
    let opts = IngestOptions {
        data_root: dir.path().to_path_buf(),
        observer: Some(obs.clone()),
        alert_at_or_above: IngestionSeverity::Critical,
        ..Default::default()
    };
    let spec = TableSpec::new("staging_order_data", ["ops/order_data_*"]).with_expected(["order_id", "user_id"]);
    let mut store = MemoryStore::new();

    ingest_table(&spec, &mut store, &opts);

    let loaded = obs.loaded.lock().unwrap().clone();
    assert_eq!(
        loaded,
        vec![("order_data_1.csv".to_string(), IngestionStats { rows: 2, columns: 2 })]
    );
    assert_eq!(obs.drift.lock().unwrap().clone(), vec![vec!["extra".to_string()]]);
    // Malformed json is an Error: reported, not alerted at a Critical threshold.
    assert_eq!(obs.failures.lock().unwrap().clone(), vec![IngestionSeverity::Error]);
    assert!(obs.alerts.lock().unwrap().is_empty());
    assert_eq!(
        obs.finished.lock().unwrap().clone(),
        vec![LoadOutcome::LoadedViaRowInsert { rows: 2 }]
    );
}

#[test]
fn failures_at_threshold_are_alerted() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a/first.csv", "id\n1\n");

    let obs = Arc::new(RecordingObserver::default());
    let opts = IngestOptions {
        data_root: dir.path().to_path_buf(),
        observer: Some(obs.clone()),
        alert_at_or_above: IngestionSeverity::Error,
        ..Default::default()
    };
    let mut store = MemoryStore::new().with_failing_insert("staging_first");

    let report = ingest_table(&TableSpec::new("staging_first", ["a/*.csv"]), &mut store, &opts);
    assert_eq!(report.outcome, LoadOutcome::RowInsertFailed);
    assert_eq!(obs.failures.lock().unwrap().clone(), vec![IngestionSeverity::Error]);
    assert_eq!(obs.alerts.lock().unwrap().clone(), vec![IngestionSeverity::Error]);
}

#[test]
fn copy_fallback_is_reported_as_warning() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ops/line_items.pkl");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let rows = vec![std::collections::BTreeMap::from([("order_id", "O1"), ("product_id", "P1")])];
    fs::write(&path, serde_pickle::to_vec(&rows, serde_pickle::SerOptions::new()).unwrap()).unwrap();

    let obs = Arc::new(RecordingObserver::default());
    let opts = IngestOptions {
        data_root: dir.path().to_path_buf(),
        observer: Some(obs.clone()),
        alert_at_or_above: IngestionSeverity::Error,
        ..Default::default()
    };
    let mut store = MemoryStore::new().with_failing_copy();

    let report = ingest_table(&TableSpec::new("staging_line_items", ["ops/*.pkl"]), &mut store, &opts);
    assert_eq!(report.outcome, LoadOutcome::LoadedViaCopyThenFallback { rows: 1 });
    assert_eq!(obs.failures.lock().unwrap().clone(), vec![IngestionSeverity::Warning]);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn file_observer_appends_lines() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "data/a/first.csv", "id\n1\n");
    let log = dir.path().join("events.log");

    let file_obs: Arc<dyn IngestionObserver> = Arc::new(FileObserver::new(&log));
    let opts = IngestOptions {
        data_root: dir.path().join("data"),
        observer: Some(Arc::new(CompositeObserver::new(vec![file_obs]))),
        ..Default::default()
    };
    let mut store = MemoryStore::new();
    ingest_table(&TableSpec::new("staging_first", ["a/*.csv"]), &mut store, &opts);

    let contents = fs::read_to_string(&log).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("ok table=staging_first format=delimited-text"));
    assert!(lines[1].contains("table table=staging_first outcome=loaded-via-row-insert (1 rows)"));
}
