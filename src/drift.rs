//! Schema-drift quarantine.
//!
//! A table with a pinned schema accepts only its expected columns. Anything else found in a
//! file is recorded in `audit_schema_drift` and stripped from the frame before it reaches the
//! merge. Recording is best-effort; stripping is not.

use std::collections::BTreeSet;

use crate::columns::sanitize;
use crate::error::IngestionError;
use crate::store::{quote_ident, StagingStore};
use crate::types::{DriftRecord, Frame, TableSpec};

/// Audit table that receives [`DriftRecord`]s. Must exist before the run.
pub const DRIFT_AUDIT_TABLE: &str = "audit_schema_drift";

/// Parameterized insert of one [`DriftRecord`] into [`DRIFT_AUDIT_TABLE`].
pub fn drift_insert_sql() -> String {
    format!(
        "INSERT INTO {} (table_name, file_name, unknown_column_name) VALUES ($1, $2, $3)",
        quote_ident(DRIFT_AUDIT_TABLE)
    )
}

/// Result of auditing one file's frame.
#[derive(Debug)]
pub struct DriftAudit {
    /// The frame with every unexpected column removed.
    pub frame: Frame,
    /// One record per unexpected (sanitized) column name.
    pub records: Vec<DriftRecord>,
    /// Set when the records could not be persisted.
    pub persist_error: Option<IngestionError>,
}

impl DriftAudit {
    fn clean(frame: Frame) -> Self {
        Self {
            frame,
            records: Vec::new(),
            persist_error: None,
        }
    }

    pub fn unknown_columns(&self) -> Vec<String> {
        self.records.iter().map(|r| r.unknown_column_name.clone()).collect()
    }
}

/// Sanitized column names of `frame` missing from `expected`, in first-appearance order.
pub fn unknown_columns(frame: &Frame, expected: &BTreeSet<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for c in &frame.columns {
        let s = sanitize(c);
        if !expected.contains(&s) && !out.contains(&s) {
            out.push(s);
        }
    }
    out
}

/// Check `frame` (from `source_file`) against `spec`'s expected schema.
///
/// No-op when the table has no expected schema. Otherwise unexpected columns are reported to
/// `store` and removed; a store failure is returned in [`DriftAudit::persist_error`] and does
/// not stop the removal.
pub fn audit<S>(mut frame: Frame, spec: &TableSpec, source_file: &str, store: &mut S) -> DriftAudit
where
    S: StagingStore + ?Sized,
{
    let Some(expected) = spec.expected_schema.as_ref() else {
        return DriftAudit::clean(frame);
    };

    let extra = unknown_columns(&frame, expected);
    if extra.is_empty() {
        return DriftAudit::clean(frame);
    }

    let records: Vec<DriftRecord> = extra
        .iter()
        .map(|c| DriftRecord {
            table_name: spec.name.clone(),
            file_name: source_file.to_string(),
            unknown_column_name: c.clone(),
        })
        .collect();

    let persist_error = store
        .append_drift_records(&records)
        .err()
        .map(|source| IngestionError::DriftAuditFailure {
            table: spec.name.clone(),
            source,
        });

    let dropped = frame.retain_columns(|c| !extra.contains(&sanitize(c)));
    tracing::debug!(table = %spec.name, file = source_file, ?dropped, "dropped drifted columns");

    DriftAudit {
        frame,
        records,
        persist_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn frame(cols: &[&str]) -> Frame {
        Frame::new(
            cols.iter().map(|c| c.to_string()).collect(),
            vec![cols.iter().map(|c| Some(format!("v-{c}"))).collect()],
        )
    }

    #[test]
    fn unknown_columns_are_sanitized_and_deduplicated() {
        let expected: BTreeSet<String> = ["id".to_string()].into();
        let f = frame(&["ID", "Extra Col", "extra-col"]);
        assert_eq!(unknown_columns(&f, &expected), vec!["extra_col"]);
    }

    #[test]
    fn insert_targets_the_audit_table() {
        assert_eq!(
            drift_insert_sql(),
            "INSERT INTO \"audit_schema_drift\" (table_name, file_name, unknown_column_name) VALUES ($1, $2, $3)"
        );
    }

    #[test]
    fn no_expected_schema_is_a_no_op() {
        let mut store = MemoryStore::new();
        let spec = TableSpec::new("t", ["*.csv"]);
        let out = audit(frame(&["Whatever", "Else"]), &spec, "a.csv", &mut store);
        assert_eq!(out.frame.columns, vec!["Whatever", "Else"]);
        assert!(out.records.is_empty());
        assert!(store.journal().is_empty());
    }

    #[test]
    fn columns_are_removed_even_when_recording_fails() {
        let mut store = MemoryStore::new().without_audit_table();
        let spec = TableSpec::new("t", ["*.csv"]).with_expected(["id"]);
        let out = audit(frame(&["Id", "Surprise"]), &spec, "a.csv", &mut store);
        assert_eq!(out.frame.columns, vec!["Id"]);
        assert_eq!(out.frame.rows[0], vec![Some("v-Id".to_string())]);
        assert_eq!(out.unknown_columns(), vec!["surprise"]);
        assert!(matches!(out.persist_error, Some(IngestionError::DriftAuditFailure { .. })));
    }
}
