//! `pages.json`: the final records of the last build, for later inspection.

use crate::models::SourceRecord;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SNAPSHOT_VERSION: &str = "1";
pub const SNAPSHOT_FILENAME: &str = "pages.json";

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Snapshot I/O failed at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: String,
    generated_at: String,
    pages: Vec<SourceRecord>,
}

pub fn snapshot_path(output: &Path) -> PathBuf {
    output.join(SNAPSHOT_FILENAME)
}

/// Persist `pages` into the output folder.
pub fn write_snapshot(output: &Path, pages: &[SourceRecord]) -> Result<PathBuf, SnapshotError> {
    let path = snapshot_path(output);
    fs::create_dir_all(output).map_err(|source| SnapshotError::Io {
        path: output.to_path_buf(),
        source,
    })?;

    let payload = Snapshot {
        version: SNAPSHOT_VERSION.to_string(),
        generated_at: Utc::now().to_rfc3339(),
        pages: pages.to_vec(),
    };
    let json = serde_json::to_vec_pretty(&payload)?;
    fs::write(&path, json).map_err(|source| SnapshotError::Io {
        path: path.clone(),
        source,
    })?;

    tracing::debug!("Saved {} pages to {:?}", pages.len(), path);
    Ok(path)
}

/// Load the records of the last build, if a compatible snapshot exists.
pub fn load_snapshot(output: &Path) -> Result<Option<Vec<SourceRecord>>, SnapshotError> {
    let path = snapshot_path(output);
    if !path.exists() {
        return Ok(None);
    }

    let data = fs::read(&path).map_err(|source| SnapshotError::Io {
        path: path.clone(),
        source,
    })?;
    match serde_json::from_slice::<Snapshot>(&data) {
        Ok(snapshot) if snapshot.version == SNAPSHOT_VERSION => Ok(Some(snapshot.pages)),
        Ok(snapshot) => {
            tracing::warn!(
                "Ignoring snapshot {:?} with version {}",
                path,
                snapshot.version
            );
            Ok(None)
        }
        Err(err) => {
            tracing::warn!("Failed to parse snapshot {:?}: {}", path, err);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Meta;
    use serde_yaml::Value;

    fn page() -> SourceRecord {
        let mut meta = Meta::new();
        meta.insert("title".into(), Value::from("Home"));
        meta.insert("tags".into(), serde_yaml::from_str("[a, b]").unwrap());
        let mut record = SourceRecord::new("site/index.md", "<h1>Home</h1>", meta);
        record.dest_filename = Some("public/index.html".into());
        record.dest_folder = Some("public".into());
        record
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_snapshot(dir.path(), &[page()]).unwrap();
        assert_eq!(path, dir.path().join("pages.json"));

        let pages = load_snapshot(dir.path()).unwrap().unwrap();
        assert_eq!(pages, vec![page()]);
    }

    #[test]
    fn test_absent_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_snapshot(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_stale_or_corrupt_snapshot_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = snapshot_path(dir.path());

        fs::write(&path, r#"{"version":"0","generated_at":"","pages":[]}"#).unwrap();
        assert!(load_snapshot(dir.path()).unwrap().is_none());

        fs::write(&path, "not json").unwrap();
        assert!(load_snapshot(dir.path()).unwrap().is_none());
    }
}
