//! Destination registry: which playlists each webhook draws from.
//!
//! Stored as a JSON object mapping webhook URL to a list of playlist IDs. The
//! file is required; when it is missing an example is written next to the
//! expected path and loading fails.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::storage;

/// Errors when loading the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Destination registry not found: {path} (example written to {example})")]
    Missing { path: PathBuf, example: PathBuf },

    #[error("Failed to read destination registry {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid destination registry {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

/// Webhook URL → playlist IDs. Iterates in URL order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationRegistry {
    destinations: BTreeMap<String, Vec<String>>,
}

impl DestinationRegistry {
    pub fn new(destinations: BTreeMap<String, Vec<String>>) -> Self {
        Self { destinations }
    }

    /// Load the registry from `path`.
    pub async fn load(path: &Path) -> Result<Self, RegistryError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let example = example_path(path);
                match storage::write_json(&example, &Self::example()).await {
                    Ok(()) => info!(example = %example.display(), "Wrote example destination registry"),
                    Err(e) => warn!(error = %e, "Failed to write example destination registry"),
                }
                return Err(RegistryError::Missing {
                    path: path.to_path_buf(),
                    example,
                });
            }
            Err(source) => {
                return Err(RegistryError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let registry: Self =
            serde_json::from_slice(&bytes).map_err(|e| RegistryError::Invalid {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if registry.is_empty() {
            warn!(path = %path.display(), "Destination registry has no destinations");
        }
        Ok(registry)
    }

    /// Registry written out for the operator when none exists.
    pub fn example() -> Self {
        let mut destinations = BTreeMap::new();
        destinations.insert(
            "https://www.feishu.cn/flow/api/trigger-webhook/your-webhook-id".to_string(),
            vec!["164657973".to_string()],
        );
        Self { destinations }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.destinations.iter()
    }

    pub fn groups(&self, destination: &str) -> Option<&[String]> {
        self.destinations.get(destination).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }
}

fn example_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "webhook_playlists".to_string());
    path.with_file_name(format!("{}.example.json", stem))
}
