//! Whole-file JSON persistence shared by the file-backed stores.
//!
//! Every store in this crate follows the same discipline: read the whole file,
//! mutate in memory, write the whole file back. Writes go to a sibling temp
//! file that is then renamed over the target, so a process killed mid-write
//! leaves either the old or the new contents on disk.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

/// Errors raised while writing a JSON file.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to create the parent directory.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize the value.
    #[error("Failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to write or rename the file.
    #[error("Failed to write {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read a JSON file, returning `None` when it is missing or unparsable.
///
/// Corruption is reported at debug level only: callers treat it as a miss.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Failed to read JSON file");
            return None;
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Ignoring unparsable JSON file");
            None
        }
    }
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| StorageError::DirectoryCreationFailed {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let body = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = temp_path(path);
    let write_err = |source| StorageError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&tmp, &body).await.map_err(write_err)?;
    fs::rename(&tmp, path).await.map_err(write_err)?;

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let value: Option<Vec<String>> = read_json(&dir.path().join("missing.json")).await;
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_read_corrupt_file_is_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let value: Option<Vec<String>> = read_json(&path).await;
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_write_creates_parent_and_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("data.json");

        let mut map = BTreeMap::new();
        map.insert("a".to_string(), 1);
        tokio_test::assert_ok!(write_json(&path, &map).await);

        let read: BTreeMap<String, i32> = read_json(&path).await.unwrap();
        assert_eq!(read, map);
        assert!(!temp_path(&path).exists());
    }
}
