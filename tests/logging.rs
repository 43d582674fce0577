use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use staging_ingest::pipeline::{ingest_table, IngestOptions, LoadOutcome};
use staging_ingest::store::MemoryStore;
use staging_ingest::types::TableSpec;

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn capture<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buf = SharedBuf::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, buf.contents())
}

#[test]
fn failed_file_is_logged_without_an_observer() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "mkt/a.csv", "campaign_id,discount\nC1,10%\n");
    write(dir.path(), "mkt/b.json", "{broken");
    let spec = TableSpec::new("staging_campaign_data", ["mkt/*"]);
    let options = IngestOptions {
        data_root: dir.path().to_path_buf(),
        ..Default::default()
    };
    let mut store = MemoryStore::new();

    let (report, logs) = capture(|| ingest_table(&spec, &mut store, &options));
    assert_eq!(report.files_failed, 1);
    assert_eq!(report.outcome, LoadOutcome::LoadedViaRowInsert { rows: 1 });

    let line = logs
        .lines()
        .find(|l| l.contains("b.json"))
        .unwrap_or_else(|| panic!("no log line for b.json in:\n{logs}"));
    assert!(line.contains("ERROR"), "{line}");
    assert!(line.contains("staging_campaign_data"), "{line}");
}

#[test]
fn copy_fallback_is_logged_as_warning() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ops/line_items.pkl");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let rows = vec![std::collections::BTreeMap::from([("order_id", "O1")])];
    fs::write(&path, serde_pickle::to_vec(&rows, serde_pickle::SerOptions::new()).unwrap()).unwrap();
    let spec = TableSpec::new("staging_line_items", ["ops/*.pkl"]);
    let options = IngestOptions {
        data_root: dir.path().to_path_buf(),
        ..Default::default()
    };
    let mut store = MemoryStore::new().with_failing_copy();

    let (report, logs) = capture(|| ingest_table(&spec, &mut store, &options));
    assert_eq!(report.outcome, LoadOutcome::LoadedViaCopyThenFallback { rows: 1 });
    assert!(
        logs.lines()
            .any(|l| l.contains("WARN") && l.contains("COPY failed") && l.contains("staging_line_items")),
        "{logs}"
    );
}
