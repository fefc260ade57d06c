//! Error types for the backfill pipeline.
//!
//! Every variant is fatal to the job: the pipeline never retries or salvages a
//! partial result, it hands the error back to the entry point which decides on
//! the process exit code.

use crate::config::ConfigurationError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackfillError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Connection error: {0}")]
    ConnectionError(String),
    #[error("Extraction error: {0}")]
    ExtractionError(String),
    #[error("Staging error for {path}: {reason}")]
    StagingError { path: String, reason: String },
    #[error("Count error: {0}")]
    CountError(String),
    #[error("Credential error: {0}")]
    CredentialError(String),
    #[error("Publish error for s3://{bucket}/{key}: {reason}")]
    PublishError {
        bucket: String,
        key: String,
        reason: String,
    },
    #[error("State transition error: {0}")]
    StateTransitionError(String),
}

impl BackfillError {
    pub fn staging(path: impl AsRef<std::path::Path>, reason: impl std::fmt::Display) -> Self {
        Self::StagingError {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn publish(
        bucket: impl Into<String>,
        key: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::PublishError {
            bucket: bucket.into(),
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Short machine-friendly name of the error kind, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "config",
            Self::ConnectionError(_) => "connection",
            Self::ExtractionError(_) => "extraction",
            Self::StagingError { .. } => "staging",
            Self::CountError(_) => "count",
            Self::CredentialError(_) => "credential",
            Self::PublishError { .. } => "publish",
            Self::StateTransitionError(_) => "state_transition",
        }
    }

    /// Process exit code for this error: 2 for bad configuration or
    /// arguments, 1 for every runtime failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ConfigError(_) => 2,
            _ => 1,
        }
    }
}

impl From<ConfigurationError> for BackfillError {
    fn from(error: ConfigurationError) -> Self {
        BackfillError::ConfigError(error.to_string())
    }
}

pub type BackfillResult<T> = std::result::Result<T, BackfillError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_exit_with_usage_code() {
        let error = BackfillError::ConfigError("missing table_name".to_string());
        assert_eq!(error.exit_code(), 2);
        assert_eq!(error.kind(), "config");
    }

    #[test]
    fn runtime_errors_exit_with_failure_code() {
        let error = BackfillError::publish("bucket", "prefix/a.csv", "connection reset");
        assert_eq!(error.exit_code(), 1);
        assert_eq!(
            error.to_string(),
            "Publish error for s3://bucket/prefix/a.csv: connection reset"
        );
    }
}
