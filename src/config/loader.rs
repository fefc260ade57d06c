//! Configuration Loader
//!
//! Reads the INI backfill configuration with the `config` crate, layers
//! `BACKFILL__SECTION__KEY` environment overrides on top, and resolves the
//! result into an immutable [`BackfillConfig`].

use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::error::{ConfigResult, ConfigurationError};
use super::{BackfillConfig, CredentialOverrides, RawConfig};

const ENV_PREFIX: &str = "BACKFILL";
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024; // 1MB limit

/// Loaded configuration plus where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: BackfillConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration from an INI file on disk
    pub fn load_from_file(
        path: impl AsRef<Path>,
        overrides: &CredentialOverrides,
    ) -> ConfigResult<ConfigManager> {
        let path = path.as_ref();
        let contents = Self::read_config_file_safely(path)?;
        let file_path = path.display().to_string();

        debug!(config_path = %file_path, "Loading backfill configuration");

        let config = Self::build(&contents, &file_path, overrides)?;

        info!(
            config_path = %file_path,
            table = %config.table.table_name,
            range = %config.table.range,
            step = %config.table.step,
            count_file = config.count_file.enabled,
            "Configuration loaded successfully"
        );

        Ok(ConfigManager {
            config,
            config_path: Some(path.to_path_buf()),
        })
    }

    /// Load configuration from INI text, mainly for tests and embedding
    pub fn load_from_str(
        contents: &str,
        overrides: &CredentialOverrides,
    ) -> ConfigResult<ConfigManager> {
        let config = Self::build(contents, "<inline>", overrides)?;
        Ok(ConfigManager {
            config,
            config_path: None,
        })
    }

    pub fn config(&self) -> &BackfillConfig {
        &self.config
    }

    pub fn into_config(self) -> BackfillConfig {
        self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Sanitized configuration for debugging/logging that masks secrets
    pub fn debug_config(&self) -> serde_json::Value {
        self.config.sanitized()
    }

    fn build(
        contents: &str,
        file_path: &str,
        overrides: &CredentialOverrides,
    ) -> ConfigResult<BackfillConfig> {
        let layered = Config::builder()
            .add_source(File::from_str(contents, FileFormat::Ini))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(|e| ConfigurationError::parse_error(file_path, e))?;

        let raw: RawConfig = layered
            .try_deserialize()
            .map_err(|e| ConfigurationError::parse_error(file_path, e))?;

        let config = BackfillConfig::resolve(raw, overrides)?;

        debug!(
            "Resolved configuration: {}",
            serde_json::to_string_pretty(&config.sanitized())
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );

        Ok(config)
    }

    /// Read a configuration file with a size limit and file-type check
    fn read_config_file_safely(path: &Path) -> ConfigResult<String> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))?;

        if !metadata.is_file() {
            return Err(ConfigurationError::invalid_value(
                "file_type",
                "directory or special file",
                "Configuration path must point to a regular file",
            ));
        }

        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigurationError::invalid_value(
                "file_size",
                metadata.len().to_string(),
                format!(
                    "Configuration file too large (limit {} bytes)",
                    MAX_CONFIG_FILE_SIZE
                ),
            ));
        }

        std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))
    }
}
