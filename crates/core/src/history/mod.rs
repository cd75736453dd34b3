//! Recommendation history.
//!
//! A single set of already-pushed song IDs, shared by every destination. A
//! song pushed to one webhook counts as used for all of them.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::storage::{self, StorageError};

/// Set of recommended song IDs.
pub type HistorySet = HashSet<String>;

/// Errors for history persistence.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to write history: {0}")]
    Storage(#[from] StorageError),
}

/// On-disk layout: `{"played": [...]}`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    played: Vec<String>,
}

/// File-backed history store.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the history. Missing or corrupt files read as empty.
    pub async fn load(&self) -> HistorySet {
        storage::read_json::<HistoryFile>(&self.path)
            .await
            .map(|f| f.played.into_iter().collect())
            .unwrap_or_default()
    }

    /// Overwrite the history file with `played`.
    ///
    /// IDs are written sorted so the file is stable across runs.
    pub async fn save(&self, played: &HistorySet) -> Result<(), HistoryError> {
        let sorted: BTreeSet<&String> = played.iter().collect();
        let file = HistoryFile {
            played: sorted.into_iter().cloned().collect(),
        };
        storage::write_json(&self.path, &file).await?;
        debug!(path = %self.path.display(), size = played.len(), "History saved");
        Ok(())
    }

    /// Load, add `id`, save. Returns the new history size.
    pub async fn record(&self, id: &str) -> Result<usize, HistoryError> {
        let mut played = self.load().await;
        played.insert(id.to_string());
        self.save(&played).await?;
        Ok(played.len())
    }

    /// Drop every recorded ID.
    pub async fn clear(&self) -> Result<(), HistoryError> {
        self.save(&HistorySet::new()).await
    }
}
