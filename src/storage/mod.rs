//! # Object Storage Publishing
//!
//! Uploads staged artifacts and removes the local copy afterwards.
//!
//! ## Key Components
//!
//! - [`ObjectStore`] - the upload capability (`put_object`)
//! - [`S3ObjectStore`] - aws-sdk-s3 backend
//! - [`CredentialStrategy`] - assumed role, static keys, or ambient chain
//! - [`Publisher`] - upload followed by unconditional cleanup
//!
//! ## Object Keys
//!
//! ```text
//! {path_prefix}{start}_{end}_{epoch_seconds}_{row_count}.csv   per window
//! {path_prefix}{count_file_name}                               count ledger
//! ```

pub mod credentials;
pub mod s3;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::BackfillResult;
use crate::staging::ArtifactRef;
use crate::windowing::BatchWindow;

pub use credentials::CredentialStrategy;
pub use s3::S3ObjectStore;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `local_path` to `bucket` under `key`.
    async fn put_object(&self, bucket: &str, key: &str, local_path: &Path) -> BackfillResult<()>;
}

/// Local file name of a window artifact
pub fn window_file_name(window: &BatchWindow) -> String {
    format!(
        "{}_{}_{}.csv",
        window.interval.start().format("%Y-%m-%d"),
        window.interval.end().format("%Y-%m-%d"),
        window.epoch_seconds()
    )
}

/// Object key of a window artifact holding `row_count` rows
pub fn window_object_key(path_prefix: &str, window: &BatchWindow, row_count: usize) -> String {
    format!(
        "{path_prefix}{}_{}_{}_{row_count}.csv",
        window.interval.start().format("%Y-%m-%d"),
        window.interval.end().format("%Y-%m-%d"),
        window.epoch_seconds()
    )
}

/// Object key of the final count ledger
pub fn ledger_object_key(path_prefix: &str, count_file_name: &str) -> String {
    format!("{path_prefix}{count_file_name}")
}

/// Uploads artifacts to one bucket.
#[derive(Clone)]
pub struct Publisher {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl Publisher {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Upload `artifact`, then delete its local file whatever the outcome.
    pub async fn publish(&self, artifact: &ArtifactRef) -> BackfillResult<()> {
        let result = self
            .store
            .put_object(&self.bucket, &artifact.remote_key, &artifact.local_path)
            .await;

        match &result {
            Ok(()) => info!(
                uri = %format!("s3://{}/{}", self.bucket, artifact.remote_key),
                "Uploaded file to S3"
            ),
            Err(e) => warn!(
                bucket = %self.bucket,
                key = %artifact.remote_key,
                error = %e,
                "Upload failed"
            ),
        }

        cleanup(artifact);
        result
    }
}

/// Best-effort removal of a staged file. Never fails.
pub fn cleanup(artifact: &ArtifactRef) {
    let path = &artifact.local_path;
    if !path.exists() {
        warn!(path = %path.display(), "Local artifact not found during cleanup");
        return;
    }
    match std::fs::remove_file(path) {
        Ok(()) => info!(path = %path.display(), "Deleted local artifact"),
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete local artifact"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::windowing::Interval;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn window() -> BatchWindow {
        let interval = Interval::new(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 2, 1).unwrap(),
        )
        .unwrap();
        BatchWindow::new(interval, Utc.timestamp_opt(1_700_000_000, 0).unwrap())
    }

    #[test]
    fn window_keys_include_bounds_epoch_and_count() {
        assert_eq!(
            window_object_key("exports/visits/", &window(), 42),
            "exports/visits/2023-01-01_2023-02-01_1700000000_42.csv"
        );
        assert_eq!(window_file_name(&window()), "2023-01-01_2023-02-01_1700000000.csv");
    }

    #[test]
    fn ledger_key_is_prefix_plus_name() {
        assert_eq!(
            ledger_object_key("exports/visits/", "visits__count.csv"),
            "exports/visits/visits__count.csv"
        );
    }

    #[test]
    fn cleanup_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ArtifactRef {
            local_path: dir.path().join("gone.csv"),
            remote_key: "gone.csv".into(),
        };
        cleanup(&artifact);
        assert!(!artifact.local_path.exists());
    }
}
