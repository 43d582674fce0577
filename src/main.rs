use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use staging_ingest::config::Settings;
use staging_ingest::ingestion::{CompositeObserver, FileObserver, IngestionObserver, IngestionSeverity, TracingObserver};
use staging_ingest::pipeline::{run_ingestion, IngestOptions};
use staging_ingest::store::PgStore;
use staging_ingest::IngestionError;

fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real deployments set the variables directly.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let settings = Settings::from_env().context("reading settings")?;
    let specs = settings.table_specs().context("loading table catalogue")?;
    tracing::info!(store = ?settings.store, tables = specs.len(), "configuration loaded");

    let mut store = PgStore::connect(&settings.store)
        .map_err(IngestionError::Connect)
        .with_context(|| format!("connecting to {}:{}", settings.store.host, settings.store.port))?;

    let mut observers: Vec<Arc<dyn IngestionObserver>> = vec![Arc::new(TracingObserver)];
    if let Some(path) = &settings.event_log {
        observers.push(Arc::new(FileObserver::new(path)));
    }

    let options = IngestOptions {
        data_root: settings.data_root.clone(),
        batch_size: settings.batch_size,
        observer: Some(Arc::new(CompositeObserver::new(observers))),
        alert_at_or_above: IngestionSeverity::Error,
    };

    let report = run_ingestion(&specs, &mut store, &options);
    tracing::info!(
        tables = report.tables.len(),
        loaded = report.loaded_tables(),
        rows = report.total_rows(),
        "ingestion finished"
    );
    Ok(())
}
