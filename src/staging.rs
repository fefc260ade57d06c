//! # Local Staging
//!
//! Serializes a [`TabularBatch`] to a CSV file on local transient storage.
//! Every staged file is an independent artifact destined for exactly one
//! upload, after which the publisher deletes it.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::batch::TabularBatch;
use crate::error::{BackfillError, BackfillResult};

/// A staged file and the object key it will be uploaded under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub local_path: PathBuf,
    pub remote_key: String,
}

#[derive(Debug, Clone)]
pub struct LocalStager {
    directory: PathBuf,
}

impl LocalStager {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Stage `batch` as `file_name` inside the staging directory.
    pub fn stage(
        &self,
        batch: &TabularBatch,
        file_name: &str,
        remote_key: String,
    ) -> BackfillResult<ArtifactRef> {
        fs::create_dir_all(&self.directory)
            .map_err(|e| BackfillError::staging(&self.directory, e))?;
        let path = self.directory.join(file_name);
        self.write(batch, &path, true, remote_key)
    }

    /// Write `batch` to `path` in column order.
    ///
    /// A partially written file is removed before the error is returned.
    pub fn write(
        &self,
        batch: &TabularBatch,
        path: &Path,
        include_header: bool,
        remote_key: String,
    ) -> BackfillResult<ArtifactRef> {
        if let Err(e) = write_csv(batch, path, include_header) {
            if path.exists() {
                if let Err(remove_err) = fs::remove_file(path) {
                    warn!(path = %path.display(), error = %remove_err, "Failed to remove partial artifact");
                }
            }
            return Err(BackfillError::staging(path, e));
        }

        debug!(
            path = %path.display(),
            rows = batch.row_count(),
            columns = batch.columns().len(),
            "Staged batch to local CSV"
        );

        Ok(ArtifactRef {
            local_path: path.to_path_buf(),
            remote_key,
        })
    }
}

fn write_csv(batch: &TabularBatch, path: &Path, include_header: bool) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;

    if include_header {
        writer.write_record(batch.columns())?;
    }
    for row in batch.rows() {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::CellValue;
    use chrono::NaiveDate;

    fn sample_batch() -> TabularBatch {
        let created = NaiveDate::from_ymd_opt(2023, 1, 2)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        TabularBatch::from_rows(
            vec!["id".into(), "note".into(), "created_at".into()],
            vec![
                vec![
                    CellValue::Int(1),
                    CellValue::Text("hello, world".into()),
                    CellValue::DateTime(created),
                ],
                vec![CellValue::Int(2), CellValue::Null, CellValue::DateTime(created)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn writes_header_and_quoted_rows() {
        let dir = tempfile::tempdir().unwrap();
        let stager = LocalStager::new(dir.path());
        let artifact = stager
            .stage(&sample_batch(), "window.csv", "prefix/window.csv".into())
            .unwrap();

        let contents = fs::read_to_string(&artifact.local_path).unwrap();
        assert_eq!(
            contents,
            "id,note,created_at\n\
             1,\"hello, world\",2023-01-02 09:30:00\n\
             2,,2023-01-02 09:30:00\n"
        );
        assert_eq!(artifact.remote_key, "prefix/window.csv");
    }

    #[test]
    fn header_can_be_omitted() {
        let dir = tempfile::tempdir().unwrap();
        let stager = LocalStager::new(dir.path());
        let path = dir.path().join("no_header.csv");
        stager
            .write(&sample_batch(), &path, false, "k".into())
            .unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("1,"));
    }

    #[test]
    fn creates_missing_staging_directory() {
        let dir = tempfile::tempdir().unwrap();
        let stager = LocalStager::new(dir.path().join("nested/staging"));
        let artifact = stager.stage(&sample_batch(), "a.csv", "a.csv".into()).unwrap();
        assert!(artifact.local_path.exists());
    }

    #[test]
    fn unwritable_path_is_a_staging_error() {
        let dir = tempfile::tempdir().unwrap();
        let stager = LocalStager::new(dir.path());
        let path = dir.path().join("missing-dir").join("a.csv");
        let err = stager
            .write(&sample_batch(), &path, true, "a.csv".into())
            .unwrap_err();
        assert_eq!(err.kind(), "staging");
        assert!(!path.exists());
    }
}
