//! Destination table provisioning.
//!
//! Every load starts from a fresh table: `DROP TABLE IF EXISTS ... CASCADE` followed by
//! `CREATE TABLE`, committed together. Runs are therefore full replaces.
//!
//! Column types come from [`SqlType::infer`] unless the column is forced to text. The pipeline
//! forces every column ([`ForceText::All`]), so staging tables are uniformly `TEXT` and typing
//! is left to whatever reads the staging layer.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{IngestionError, IngestionResult};
use crate::store::{quote_ident, StagingStore};
use crate::types::Frame;

/// Destination column type.
///
/// Variants are listed in inference precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SqlType {
    Integer,
    DoublePrecision,
    Boolean,
    Timestamp,
    Text,
}

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

impl SqlType {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::DoublePrecision => "DOUBLE PRECISION",
            Self::Boolean => "BOOLEAN",
            Self::Timestamp => "TIMESTAMP",
            Self::Text => "TEXT",
        }
    }

    /// First type in precedence order that every non-null value fits.
    ///
    /// Columns with no non-null values are `TEXT`.
    pub fn infer<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let present: Vec<&str> = values.into_iter().flatten().map(str::trim).collect();
        if present.is_empty() {
            return Self::Text;
        }

        let fits = |ty: SqlType| present.iter().all(|v| ty.accepts(v));
        [Self::Integer, Self::DoublePrecision, Self::Boolean, Self::Timestamp]
            .into_iter()
            .find(|ty| fits(*ty))
            .unwrap_or(Self::Text)
    }

    fn accepts(self, v: &str) -> bool {
        match self {
            Self::Integer => v.parse::<i32>().is_ok(),
            Self::DoublePrecision => v.parse::<f64>().is_ok(),
            Self::Boolean => v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false"),
            Self::Timestamp => {
                TIMESTAMP_FORMATS
                    .iter()
                    .any(|f| NaiveDateTime::parse_from_str(v, f).is_ok())
                    || DATE_FORMATS.iter().any(|f| NaiveDate::parse_from_str(v, f).is_ok())
            }
            Self::Text => true,
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Which columns skip type inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForceText {
    /// Every column is `TEXT`.
    All,
    /// Only the named columns are `TEXT`; the rest are inferred.
    Only(BTreeSet<String>),
}

impl ForceText {
    fn contains(&self, column: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(set) => set.contains(column),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: SqlType,
}

/// Structure of one destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableDefinition {
    /// Derive a definition from `frame`, one column per frame column.
    pub fn from_frame(name: impl Into<String>, frame: &Frame, force_text: &ForceText) -> Self {
        let columns = frame
            .columns
            .iter()
            .enumerate()
            .map(|(idx, col)| ColumnDef {
                name: col.clone(),
                sql_type: if force_text.contains(col) {
                    SqlType::Text
                } else {
                    SqlType::infer(frame.column_values(idx))
                },
            })
            .collect();
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// `DROP ... CASCADE; CREATE TABLE ...` for this definition.
    pub fn create_sql(&self) -> String {
        let table = quote_ident(&self.name);
        let cols = self
            .columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), c.sql_type))
            .collect::<Vec<_>>()
            .join(", ");
        format!("DROP TABLE IF EXISTS {table} CASCADE; CREATE TABLE {table} ({cols});")
    }
}

/// Drop and recreate `table` to match `frame`.
pub fn provision<S>(
    store: &mut S,
    table: &str,
    frame: &Frame,
    force_text: &ForceText,
) -> IngestionResult<TableDefinition>
where
    S: StagingStore + ?Sized,
{
    let definition = TableDefinition::from_frame(table, frame, force_text);
    tracing::debug!(table, columns = definition.columns.len(), "recreating table");
    store
        .recreate_table(&definition)
        .map_err(|source| IngestionError::ProvisionFailure {
            table: table.to_string(),
            source,
        })?;
    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[Option<&str>]) -> SqlType {
        SqlType::infer(values.iter().copied())
    }

    #[test]
    fn inference_follows_precedence() {
        assert_eq!(column(&[Some("1"), Some("-2"), None]), SqlType::Integer);
        assert_eq!(column(&[Some("1"), Some("2.5")]), SqlType::DoublePrecision);
        assert_eq!(column(&[Some("True"), Some("false")]), SqlType::Boolean);
        assert_eq!(column(&[Some("2021-03-04 10:00:00"), Some("2021-03-05")]), SqlType::Timestamp);
        assert_eq!(column(&[Some("2021-03-04"), Some("soon")]), SqlType::Text);
        assert_eq!(column(&[None, None]), SqlType::Text);
    }

    #[test]
    fn integers_outside_int4_are_not_integer() {
        assert_eq!(column(&[Some("4111111111111111")]), SqlType::DoublePrecision);
    }

    #[test]
    fn force_text_overrides_inference() {
        let frame = Frame::new(
            vec!["id".into(), "price".into()],
            vec![vec![Some("1".into()), Some("9.5".into())]],
        );
        let all = TableDefinition::from_frame("t", &frame, &ForceText::All);
        assert!(all.columns.iter().all(|c| c.sql_type == SqlType::Text));

        let only_id = TableDefinition::from_frame("t", &frame, &ForceText::Only(["id".to_string()].into()));
        assert_eq!(only_id.columns[0].sql_type, SqlType::Text);
        assert_eq!(only_id.columns[1].sql_type, SqlType::DoublePrecision);
    }

    #[test]
    fn create_sql_drops_then_creates() {
        let frame = Frame::new(vec!["order_id".into(), "user_id".into()], vec![]);
        let def = TableDefinition::from_frame("staging_order_data", &frame, &ForceText::All);
        assert_eq!(
            def.create_sql(),
            "DROP TABLE IF EXISTS \"staging_order_data\" CASCADE; \
             CREATE TABLE \"staging_order_data\" (\"order_id\" TEXT, \"user_id\" TEXT);"
        );
    }
}
