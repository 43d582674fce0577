//! The store boundary.
//!
//! A [`StagingStore`] is the single session object for a run. The orchestrator, provisioner,
//! drift auditor and bulk loader all receive it by `&mut` reference; nothing holds it globally.
//! Each method is its own transaction: it either commits everything it was given or rolls
//! everything back and returns the error.

mod memory;
mod pg;

use thiserror::Error;

use crate::provision::TableDefinition;
use crate::types::{Cell, DriftRecord};

pub use self::memory::{MemoryStore, MemoryTable, StoreCall};
pub use self::pg::PgStore;

/// Convenience result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error returned by a [`StagingStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database rejected a statement or the connection failed.
    #[error("postgres error: {0}")]
    Postgres(#[from] ::postgres::Error),

    /// Writing to the COPY stream failed.
    #[error("copy stream error: {0}")]
    Io(#[from] std::io::Error),

    /// The store refused the operation for a reason of its own.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Operations the pipeline needs from a relational store.
pub trait StagingStore {
    /// Drop (`CASCADE`) and recreate `table`, committing immediately.
    fn recreate_table(&mut self, table: &TableDefinition) -> StoreResult<()>;

    /// Stream a COPY text payload into `columns` of `table` in one transaction.
    ///
    /// Returns the number of rows written.
    fn copy_in(&mut self, table: &str, columns: &[String], payload: &[u8]) -> StoreResult<u64>;

    /// Insert `rows` into `columns` of `table` in one transaction, at most
    /// `rows_per_statement` rows per `INSERT`.
    fn insert_rows(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Cell>],
        rows_per_statement: usize,
    ) -> StoreResult<u64>;

    /// Persist drift records in their own transaction.
    fn append_drift_records(&mut self, records: &[DriftRecord]) -> StoreResult<()>;
}

impl<S: StagingStore + ?Sized> StagingStore for &mut S {
    fn recreate_table(&mut self, table: &TableDefinition) -> StoreResult<()> {
        (**self).recreate_table(table)
    }

    fn copy_in(&mut self, table: &str, columns: &[String], payload: &[u8]) -> StoreResult<u64> {
        (**self).copy_in(table, columns, payload)
    }

    fn insert_rows(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Cell>],
        rows_per_statement: usize,
    ) -> StoreResult<u64> {
        (**self).insert_rows(table, columns, rows, rows_per_statement)
    }

    fn append_drift_records(&mut self, records: &[DriftRecord]) -> StoreResult<()> {
        (**self).append_drift_records(records)
    }
}

/// Double-quote an SQL identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Comma-separated list of quoted identifiers.
pub fn quoted_list(names: &[String]) -> String {
    names.iter().map(|n| quote_ident(n)).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("staging_user_data"), "\"staging_user_data\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
