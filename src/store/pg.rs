use std::fmt;
use std::io::Write;

use postgres::types::ToSql;
use postgres::{Client, Config, NoTls};

use crate::config::StoreSettings;
use crate::drift::drift_insert_sql;
use crate::load::{copy_statement, insert_statement};
use crate::provision::TableDefinition;
use crate::types::{Cell, DriftRecord};

use super::{StagingStore, StoreResult};

/// [`StagingStore`] backed by one synchronous PostgreSQL connection.
///
/// Every operation opens a transaction on the shared client; dropping a `Transaction` without
/// committing rolls it back, so any `?` exit leaves the database untouched.
pub struct PgStore {
    client: Client,
}

impl PgStore {
    /// Open a connection using `settings`.
    pub fn connect(settings: &StoreSettings) -> StoreResult<Self> {
        let client = Config::new()
            .host(&settings.host)
            .port(settings.port)
            .dbname(&settings.database)
            .user(&settings.user)
            .password(&settings.password)
            .application_name("staging-ingest")
            .connect(NoTls)?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl fmt::Debug for PgStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgStore")
            .field("closed", &self.client.is_closed())
            .finish()
    }
}

impl StagingStore for PgStore {
    fn recreate_table(&mut self, table: &TableDefinition) -> StoreResult<()> {
        let mut tx = self.client.transaction()?;
        tx.batch_execute(&table.create_sql())?;
        tx.commit()?;
        Ok(())
    }

    fn copy_in(&mut self, table: &str, columns: &[String], payload: &[u8]) -> StoreResult<u64> {
        let mut tx = self.client.transaction()?;
        let statement = copy_statement(table, columns);
        let mut writer = tx.copy_in(statement.as_str())?;
        writer.write_all(payload)?;
        let rows = writer.finish()?;
        tx.commit()?;
        Ok(rows)
    }

    fn insert_rows(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Cell>],
        rows_per_statement: usize,
    ) -> StoreResult<u64> {
        let mut tx = self.client.transaction()?;
        let mut written = 0u64;
        for chunk in rows.chunks(rows_per_statement.max(1)) {
            let statement = insert_statement(table, columns, chunk.len());
            let params: Vec<&(dyn ToSql + Sync)> = chunk
                .iter()
                .flat_map(|row| row.iter().map(|cell| cell as &(dyn ToSql + Sync)))
                .collect();
            written += tx.execute(statement.as_str(), &params)?;
        }
        tx.commit()?;
        Ok(written)
    }

    fn append_drift_records(&mut self, records: &[DriftRecord]) -> StoreResult<()> {
        let mut tx = self.client.transaction()?;
        let statement = tx.prepare(&drift_insert_sql())?;
        for r in records {
            tx.execute(
                &statement,
                &[&r.table_name, &r.file_name, &r.unknown_column_name],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}
