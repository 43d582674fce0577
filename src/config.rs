//! Run configuration.
//!
//! Connection settings and tuning knobs come from environment variables (a `.env` file is
//! honoured by the binary). The table catalogue is either the built-in departmental map or a
//! JSON file named by `INGEST_TABLES`.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::columns::sanitize;
use crate::error::{IngestionError, IngestionResult};
use crate::load::DEFAULT_BATCH_SIZE;
use crate::types::TableSpec;

/// PostgreSQL connection parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for StoreSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything the binary reads at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub store: StoreSettings,
    /// Directory the table patterns are relative to.
    pub data_root: PathBuf,
    /// Optional JSON table catalogue replacing the built-in one.
    pub tables_file: Option<PathBuf>,
    /// Rows per `INSERT` statement.
    pub batch_size: usize,
    /// Optional path for the append-only event log.
    pub event_log: Option<PathBuf>,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> IngestionResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, applying defaults for unset keys.
    pub fn from_lookup<F>(lookup: F) -> IngestionResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let port = get("DB_PORT", "5432");
        let port = port
            .trim()
            .parse::<u16>()
            .map_err(|e| IngestionError::config(format!("DB_PORT '{port}' is not a port number: {e}")))?;

        let batch = get("INGEST_BATCH_SIZE", &DEFAULT_BATCH_SIZE.to_string());
        let batch_size = batch
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| IngestionError::config(format!("INGEST_BATCH_SIZE '{batch}' must be a positive integer")))?;

        let optional_path = |key: &str| lookup(key).filter(|v| !v.trim().is_empty()).map(PathBuf::from);

        Ok(Self {
            store: StoreSettings {
                host: get("DB_HOST", "postgres-db"),
                port,
                database: get("DB_NAME", "shopzada_dwh"),
                user: get("DB_USER", "shopzada_admin"),
                password: get("DB_PASS", "bo_is_dabest"),
            },
            data_root: PathBuf::from(get("DATA_ROOT", "data/Project Dataset")),
            tables_file: optional_path("INGEST_TABLES"),
            batch_size,
            event_log: optional_path("INGEST_EVENT_LOG"),
        })
    }

    /// The table catalogue for this run.
    pub fn table_specs(&self) -> IngestionResult<Vec<TableSpec>> {
        match &self.tables_file {
            Some(path) => load_table_specs(path),
            None => Ok(default_table_specs()),
        }
    }
}

/// Read a JSON table catalogue:
/// `[{"name": "...", "patterns": ["..."], "expected_columns": ["..."]}]`.
pub fn load_table_specs(path: impl AsRef<Path>) -> IngestionResult<Vec<TableSpec>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|e| IngestionError::config(format!("cannot read {}: {e}", path.display())))?;
    let specs: Vec<TableSpec> = serde_json::from_str(&text)
        .map_err(|e| IngestionError::config(format!("invalid table catalogue {}: {e}", path.display())))?;
    validate_table_specs(&specs)?;
    Ok(specs)
}

/// Names must be unique and non-empty, every table needs a pattern, and expected columns must
/// already be in canonical (sanitized) form.
pub fn validate_table_specs(specs: &[TableSpec]) -> IngestionResult<()> {
    let mut names = HashSet::new();
    for spec in specs {
        if spec.name.trim().is_empty() {
            return Err(IngestionError::config("table name must not be empty"));
        }
        if !names.insert(spec.name.as_str()) {
            return Err(IngestionError::config(format!("table '{}' configured twice", spec.name)));
        }
        if spec.patterns.is_empty() {
            return Err(IngestionError::config(format!("table '{}' has no file patterns", spec.name)));
        }
        if let Some(expected) = &spec.expected_schema {
            if let Some(bad) = expected.iter().find(|c| sanitize(c) != **c) {
                return Err(IngestionError::config(format!(
                    "table '{}': expected column '{bad}' is not canonical (would be '{}')",
                    spec.name,
                    sanitize(bad)
                )));
            }
        }
    }
    Ok(())
}

/// The departmental staging catalogue.
pub fn default_table_specs() -> Vec<TableSpec> {
    vec![
        TableSpec::new("staging_product_list", ["Business Department/product_list*"])
            .with_expected(["product_id", "product_name", "product_type", "price"]),
        TableSpec::new("staging_user_data", ["Customer Management Department/user_data*"]).with_expected([
            "user_id",
            "creation_date",
            "name",
            "street",
            "state",
            "city",
            "country",
            "birthdate",
            "gender",
            "device_address",
            "user_type",
        ]),
        TableSpec::new("staging_user_job", ["Customer Management Department/user_job*"])
            .with_expected(["user_id", "name", "job_title", "job_level"]),
        TableSpec::new("staging_user_credit_card", ["Customer Management Department/user_credit_card*"])
            .with_expected(["user_id", "name", "credit_card_number", "issuing_bank"]),
        TableSpec::new("staging_merchant_data", ["Enterprise Department/merchant_data.html"]).with_expected([
            "merchant_id",
            "creation_date",
            "name",
            "street",
            "state",
            "city",
            "country",
            "contact_number",
        ]),
        TableSpec::new("staging_staff_data", ["Enterprise Department/staff_data.html"]).with_expected([
            "staff_id",
            "name",
            "job_level",
            "street",
            "state",
            "city",
            "country",
            "contact_number",
            "creation_date",
        ]),
        TableSpec::new(
            "staging_order_with_merchant_data",
            ["Enterprise Department/order_with_merchant_data*"],
        )
        .with_expected(["order_id", "merchant_id", "staff_id"]),
        TableSpec::new("staging_campaign_data", ["Marketing Department/campaign_data.csv"])
            .with_expected(["campaign_id", "campaign_name", "campaign_description", "discount"]),
        TableSpec::new(
            "staging_transactional_campaign_data",
            ["Marketing Department/transactional_campaign_data.csv"],
        )
        .with_expected(["transaction_date", "campaign_id", "order_id", "estimated_arrival", "availed"]),
        TableSpec::new("staging_order_data", ["Operations Department/order_data_*"])
            .with_expected(["order_id", "user_id", "estimated_arrival", "transaction_date"]),
        TableSpec::new("staging_line_item_prices", ["Operations Department/line_item_data_prices*"])
            .with_expected(["order_id", "price", "quantity"]),
        TableSpec::new("staging_line_item_products", ["Operations Department/line_item_data_products*"])
            .with_expected(["order_id", "product_name", "product_id"]),
        TableSpec::new("staging_order_delays", ["Operations Department/order_delays.html"])
            .with_expected(["order_id", "delay_in_days"]),
    ]
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let s = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(s.store.host, "postgres-db");
        assert_eq!(s.store.port, 5432);
        assert_eq!(s.store.database, "shopzada_dwh");
        assert_eq!(s.batch_size, DEFAULT_BATCH_SIZE);
        assert!(s.tables_file.is_none());
        assert!(s.event_log.is_none());
    }

    #[test]
    fn overrides_are_read() {
        let s = Settings::from_lookup(lookup(&[("DB_HOST", "localhost"), ("DB_PORT", "6543"), ("INGEST_BATCH_SIZE", "50")]))
            .unwrap();
        assert_eq!(s.store.host, "localhost");
        assert_eq!(s.store.port, 6543);
        assert_eq!(s.batch_size, 50);
    }

    #[test]
    fn invalid_numbers_are_config_errors() {
        assert!(matches!(
            Settings::from_lookup(lookup(&[("DB_PORT", "abc")])),
            Err(IngestionError::Config { .. })
        ));
        assert!(matches!(
            Settings::from_lookup(lookup(&[("INGEST_BATCH_SIZE", "0")])),
            Err(IngestionError::Config { .. })
        ));
    }

    #[test]
    fn password_is_not_printed() {
        let s = Settings::from_lookup(lookup(&[])).unwrap();
        assert!(!format!("{:?}", s).contains("bo_is_dabest"));
    }

    #[test]
    fn default_catalogue_is_valid() {
        let specs = default_table_specs();
        assert_eq!(specs.len(), 13);
        validate_table_specs(&specs).unwrap();
    }

    #[test]
    fn non_canonical_expected_column_is_rejected() {
        let specs = vec![TableSpec::new("t", ["*.csv"]).with_expected(["Order ID"])];
        assert!(validate_table_specs(&specs).is_err());
    }
}
