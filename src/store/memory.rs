use std::collections::{BTreeMap, HashSet};

use crate::drift::DRIFT_AUDIT_TABLE;
use crate::load::decode_copy_text;
use crate::provision::{ColumnDef, TableDefinition};
use crate::types::{Cell, DriftRecord};

use super::{StagingStore, StoreError, StoreResult};

/// One call made against a [`MemoryStore`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    RecreateTable(String),
    CopyIn(String),
    InsertRows(String),
    AppendDriftRecords(usize),
}

/// A table held by a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryTable {
    pub columns: Vec<ColumnDef>,
    pub rows: Vec<Vec<Cell>>,
}

impl MemoryTable {
    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// In-process [`StagingStore`] with the same commit/rollback behaviour as [`super::PgStore`].
///
/// Faults can be injected per operation so the fallback and isolation paths can be driven
/// deterministically. Every call is journaled.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, MemoryTable>,
    drift_log: Vec<DriftRecord>,
    journal: Vec<StoreCall>,
    fail_copy: bool,
    fail_insert: HashSet<String>,
    fail_recreate: HashSet<String>,
    audit_table_missing: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every COPY.
    pub fn with_failing_copy(mut self) -> Self {
        self.fail_copy = true;
        self
    }

    /// Reject row inserts into `table`.
    pub fn with_failing_insert(mut self, table: impl Into<String>) -> Self {
        self.fail_insert.insert(table.into());
        self
    }

    /// Reject DDL for `table`.
    pub fn with_failing_recreate(mut self, table: impl Into<String>) -> Self {
        self.fail_recreate.insert(table.into());
        self
    }

    /// Behave as if `audit_schema_drift` does not exist.
    pub fn without_audit_table(mut self) -> Self {
        self.audit_table_missing = true;
        self
    }

    pub fn table(&self, name: &str) -> Option<&MemoryTable> {
        self.tables.get(name)
    }

    pub fn drift_records(&self) -> &[DriftRecord] {
        &self.drift_log
    }

    pub fn journal(&self) -> &[StoreCall] {
        &self.journal
    }

    /// Calls made against `table`, in order.
    pub fn calls_for(&self, table: &str) -> Vec<&StoreCall> {
        self.journal
            .iter()
            .filter(|c| match c {
                StoreCall::RecreateTable(t) | StoreCall::CopyIn(t) | StoreCall::InsertRows(t) => t == table,
                StoreCall::AppendDriftRecords(_) => false,
            })
            .collect()
    }

    fn check_target(&self, table: &str, columns: &[String]) -> StoreResult<()> {
        let existing = self
            .tables
            .get(table)
            .ok_or_else(|| StoreError::Rejected(format!("relation \"{table}\" does not exist")))?;
        for c in columns {
            if !existing.columns.iter().any(|d| &d.name == c) {
                return Err(StoreError::Rejected(format!(
                    "column \"{c}\" of relation \"{table}\" does not exist"
                )));
            }
        }
        if columns.len() != existing.columns.len() {
            return Err(StoreError::Rejected(format!(
                "expected {} columns for \"{table}\", got {}",
                existing.columns.len(),
                columns.len()
            )));
        }
        Ok(())
    }

    fn commit_rows(&mut self, table: &str, columns: &[String], rows: Vec<Vec<Cell>>) -> u64 {
        let Some(target) = self.tables.get_mut(table) else {
            return 0;
        };
        // Reorder into table column order.
        let positions: Vec<usize> = target
            .columns
            .iter()
            .filter_map(|d| columns.iter().position(|c| c == &d.name))
            .collect();
        let n = rows.len() as u64;
        for row in rows {
            target
                .rows
                .push(positions.iter().map(|&i| row.get(i).cloned().flatten()).collect());
        }
        n
    }
}

impl StagingStore for MemoryStore {
    fn recreate_table(&mut self, table: &TableDefinition) -> StoreResult<()> {
        self.journal.push(StoreCall::RecreateTable(table.name.clone()));
        if self.fail_recreate.contains(&table.name) {
            return Err(StoreError::Rejected(format!("DDL for \"{}\" refused", table.name)));
        }
        let mut seen = HashSet::new();
        for c in &table.columns {
            if !seen.insert(c.name.as_str()) {
                return Err(StoreError::Rejected(format!(
                    "column \"{}\" specified more than once",
                    c.name
                )));
            }
        }
        self.tables.insert(
            table.name.clone(),
            MemoryTable {
                columns: table.columns.clone(),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    fn copy_in(&mut self, table: &str, columns: &[String], payload: &[u8]) -> StoreResult<u64> {
        self.journal.push(StoreCall::CopyIn(table.to_string()));
        if self.fail_copy {
            return Err(StoreError::Rejected("COPY refused".to_string()));
        }
        self.check_target(table, columns)?;
        let rows = decode_copy_text(payload, columns.len()).map_err(StoreError::Rejected)?;
        Ok(self.commit_rows(table, columns, rows))
    }

    fn insert_rows(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Cell>],
        rows_per_statement: usize,
    ) -> StoreResult<u64> {
        self.journal.push(StoreCall::InsertRows(table.to_string()));
        if rows_per_statement == 0 {
            return Err(StoreError::Rejected("rows_per_statement must be > 0".to_string()));
        }
        if self.fail_insert.contains(table) {
            return Err(StoreError::Rejected(format!("insert into \"{table}\" violates a constraint")));
        }
        self.check_target(table, columns)?;
        if let Some(bad) = rows.iter().position(|r| r.len() != columns.len()) {
            return Err(StoreError::Rejected(format!("row {bad} has the wrong number of values")));
        }
        Ok(self.commit_rows(table, columns, rows.to_vec()))
    }

    fn append_drift_records(&mut self, records: &[DriftRecord]) -> StoreResult<()> {
        self.journal.push(StoreCall::AppendDriftRecords(records.len()));
        if self.audit_table_missing {
            return Err(StoreError::Rejected(format!(
                "relation \"{DRIFT_AUDIT_TABLE}\" does not exist"
            )));
        }
        self.drift_log.extend_from_slice(records);
        Ok(())
    }
}
