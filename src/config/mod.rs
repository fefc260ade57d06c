//! # Backfill Configuration
//!
//! Typed, immutable configuration for one backfill run. The raw INI sections
//! are deserialized by [`loader::ConfigManager`] and resolved here into a
//! validated [`BackfillConfig`] which is then passed explicitly to every
//! component constructor.
//!
//! ## Sections
//!
//! - `[Database]` - source connection target
//! - `[AWS]` - upload credentials and destination
//! - `[TableDetails]` - table, date column, range and batch step
//! - `[CountFileDetails]` - per-date count ledger
//! - `[Staging]` - local directory for transient artifacts (optional)
//!
//! The literal value `None` (or an empty value) means "not set", matching the
//! convention of existing backfill config files.

pub mod error;
pub mod loader;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use serde_json::json;
use std::path::PathBuf;

use crate::storage::CredentialStrategy;
use crate::windowing::{BatchStep, Interval};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

const DEFAULT_PORT: u16 = 5432;

/// Treat the `None` sentinel and blank values as absent.
fn deserialize_setting<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != "None"))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawConfig {
    #[serde(default, alias = "Database")]
    database: RawDatabaseSection,
    #[serde(default, alias = "AWS")]
    aws: RawStorageSection,
    #[serde(default, rename = "tabledetails", alias = "TableDetails")]
    table_details: RawTableSection,
    #[serde(default, rename = "countfiledetails", alias = "CountFileDetails")]
    count_file_details: RawCountFileSection,
    #[serde(default, alias = "Staging")]
    staging: RawStagingSection,
}

#[derive(Debug, Default, Deserialize)]
struct RawDatabaseSection {
    #[serde(default, deserialize_with = "deserialize_setting")]
    server: Option<String>,
    #[serde(default, deserialize_with = "deserialize_setting")]
    database: Option<String>,
    #[serde(default, deserialize_with = "deserialize_setting")]
    username: Option<String>,
    #[serde(default, deserialize_with = "deserialize_setting")]
    password: Option<String>,
    #[serde(default, deserialize_with = "deserialize_setting")]
    port: Option<String>,
    #[serde(default, deserialize_with = "deserialize_setting")]
    driver: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStorageSection {
    #[serde(default, deserialize_with = "deserialize_setting")]
    iam_role: Option<String>,
    #[serde(default, alias = "aws_access_key_id", deserialize_with = "deserialize_setting")]
    access_key_id: Option<String>,
    #[serde(
        default,
        alias = "aws_secret_access_key",
        deserialize_with = "deserialize_setting"
    )]
    secret_access_key: Option<String>,
    #[serde(default, alias = "s3_bucket", deserialize_with = "deserialize_setting")]
    bucket: Option<String>,
    #[serde(default, alias = "s3_path", deserialize_with = "deserialize_setting")]
    path_prefix: Option<String>,
    #[serde(default, deserialize_with = "deserialize_setting")]
    region: Option<String>,
    #[serde(default, deserialize_with = "deserialize_setting")]
    endpoint_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTableSection {
    #[serde(default, deserialize_with = "deserialize_setting")]
    table_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_setting")]
    query_param: Option<String>,
    #[serde(default, deserialize_with = "deserialize_setting")]
    date_column_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_setting")]
    start_date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_setting")]
    end_date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_setting")]
    batch_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_setting")]
    batch_days_months: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCountFileSection {
    #[serde(default, deserialize_with = "deserialize_setting")]
    is_count_file_required: Option<String>,
    #[serde(default, deserialize_with = "deserialize_setting")]
    count_file_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStagingSection {
    #[serde(default, deserialize_with = "deserialize_setting")]
    directory: Option<String>,
}

/// Source database credentials supplied outside the config file
#[derive(Debug, Clone, Default)]
pub struct CredentialOverrides {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Root configuration for a backfill run
#[derive(Debug, Clone)]
pub struct BackfillConfig {
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub table: TableConfig,
    pub count_file: CountFileConfig,
    pub staging: StagingConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub server: String,
    pub database: String,
    pub username: String,
    pub password: String,
    pub port: u16,
    /// Kept for compatibility with existing config files; only logged.
    pub driver: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub credentials: CredentialStrategy,
    pub bucket: String,
    /// Prepended verbatim to every object key
    pub path_prefix: String,
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TableConfig {
    pub table_name: String,
    /// Extra clause placed between the table reference and the date predicate
    pub query_param: Option<String>,
    pub date_column: String,
    /// Global backfill range `[start_date, end_date)`
    pub range: Interval,
    pub step: BatchStep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountFileConfig {
    pub enabled: bool,
    pub file_name: String,
}

#[derive(Debug, Clone)]
pub struct StagingConfig {
    pub directory: PathBuf,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
        }
    }
}

fn required(value: Option<String>, field: &str, section: &str) -> ConfigResult<String> {
    value.ok_or_else(|| ConfigurationError::missing_required_field(field, format!("[{section}]")))
}

fn parse_date(field: &str, value: &str) -> ConfigResult<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|dt| dt.date())
        .ok_or_else(|| ConfigurationError::invalid_value(field, value, "expected a YYYY-MM-DD date"))
}

impl BackfillConfig {
    pub(crate) fn resolve(raw: RawConfig, overrides: &CredentialOverrides) -> ConfigResult<Self> {
        Ok(Self {
            database: DatabaseConfig::resolve(raw.database, overrides)?,
            storage: StorageConfig::resolve(raw.aws)?,
            table: TableConfig::resolve(raw.table_details)?,
            count_file: CountFileConfig::resolve(raw.count_file_details)?,
            staging: raw
                .staging
                .directory
                .map(|directory| StagingConfig {
                    directory: PathBuf::from(directory),
                })
                .unwrap_or_default(),
        })
    }

    /// Configuration as JSON with secrets masked, for logging
    pub fn sanitized(&self) -> serde_json::Value {
        json!({
            "database": {
                "server": self.database.server,
                "database": self.database.database,
                "username": self.database.username,
                "password": "***",
                "port": self.database.port,
                "driver": self.database.driver,
            },
            "storage": {
                "credentials": self.storage.credentials.describe(),
                "bucket": self.storage.bucket,
                "path_prefix": self.storage.path_prefix,
                "region": self.storage.region,
                "endpoint_url": self.storage.endpoint_url,
            },
            "table": {
                "table_name": self.table.table_name,
                "query_param": self.table.query_param,
                "date_column": self.table.date_column,
                "start_date": self.table.range.start().to_string(),
                "end_date": self.table.range.end().to_string(),
                "step": self.table.step.to_string(),
            },
            "count_file": {
                "enabled": self.count_file.enabled,
                "file_name": self.count_file.file_name,
            },
            "staging": {
                "directory": self.staging.directory.display().to_string(),
            },
        })
    }
}

impl DatabaseConfig {
    fn resolve(raw: RawDatabaseSection, overrides: &CredentialOverrides) -> ConfigResult<Self> {
        let port = match raw.port {
            Some(port) => port.parse::<u16>().map_err(|e| {
                ConfigurationError::invalid_value("port", port.clone(), e.to_string())
            })?,
            None => DEFAULT_PORT,
        };

        // Credentials left unset in the file must come from the command line
        let username = raw.username.or_else(|| overrides.username.clone()).ok_or_else(|| {
            ConfigurationError::missing_required_field(
                "username",
                "[Database] (or pass it on the command line)",
            )
        })?;
        let password = raw.password.or_else(|| overrides.password.clone()).ok_or_else(|| {
            ConfigurationError::missing_required_field(
                "password",
                "[Database] (or pass it on the command line)",
            )
        })?;

        Ok(Self {
            server: required(raw.server, "server", "Database")?,
            database: required(raw.database, "database", "Database")?,
            username,
            password,
            port,
            driver: raw.driver,
        })
    }
}

impl StorageConfig {
    fn resolve(raw: RawStorageSection) -> ConfigResult<Self> {
        let credentials =
            CredentialStrategy::select(raw.iam_role, raw.access_key_id, raw.secret_access_key);

        Ok(Self {
            credentials,
            bucket: required(raw.bucket, "s3_bucket", "AWS")?,
            path_prefix: raw.path_prefix.unwrap_or_default(),
            region: raw.region,
            endpoint_url: raw.endpoint_url,
        })
    }
}

impl TableConfig {
    fn resolve(raw: RawTableSection) -> ConfigResult<Self> {
        let start_raw = required(raw.start_date, "start_date", "TableDetails")?;
        let end_raw = required(raw.end_date, "end_date", "TableDetails")?;
        let start_date = parse_date("start_date", &start_raw)?;
        let end_date = parse_date("end_date", &end_raw)?;
        let range = Interval::new(start_date, end_date).map_err(|_| {
            ConfigurationError::validation_error(format!(
                "start_date {start_date} is after end_date {end_date}"
            ))
        })?;

        // An unparseable size is treated like a non-positive one
        let size = raw
            .batch_days_months
            .map(|s| s.parse::<i64>().unwrap_or(0));
        let step = BatchStep::normalized(raw.batch_type.as_deref(), size);

        Ok(Self {
            table_name: required(raw.table_name, "table_name", "TableDetails")?,
            query_param: raw.query_param,
            date_column: required(raw.date_column_name, "date_column_name", "TableDetails")?,
            range,
            step,
        })
    }
}

impl CountFileConfig {
    fn resolve(raw: RawCountFileSection) -> ConfigResult<Self> {
        let enabled = raw
            .is_count_file_required
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let file_name = match (enabled, raw.count_file_name) {
            (true, None) => {
                return Err(ConfigurationError::missing_required_field(
                    "count_file_name",
                    "[CountFileDetails] when is_count_file_required is true",
                ))
            }
            (_, name) => name.unwrap_or_default(),
        };

        Ok(Self { enabled, file_name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_accepts_date_times() {
        assert_eq!(
            parse_date("start_date", "2023-01-01 00:00:00").unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
        );
        assert!(parse_date("start_date", "01/01/2023").is_err());
    }

    #[test]
    fn count_file_requires_a_name_when_enabled() {
        let raw = RawCountFileSection {
            is_count_file_required: Some("TRUE".to_string()),
            count_file_name: None,
        };
        assert!(CountFileConfig::resolve(raw).is_err());

        let raw = RawCountFileSection {
            is_count_file_required: Some("false".to_string()),
            count_file_name: None,
        };
        let resolved = CountFileConfig::resolve(raw).unwrap();
        assert!(!resolved.enabled);
    }
}
