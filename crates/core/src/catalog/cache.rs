//! File-backed catalog cache, one JSON file per destination.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::storage;

use super::types::{CatalogEntry, CatalogError};
use super::CatalogSource;

const CACHE_FILE_PREFIX: &str = "playlists_cache_";
const CACHE_FILE_SUFFIX: &str = ".json";

/// Cache file name for a destination.
///
/// The destination (usually a webhook URL) is encoded as unpadded URL-safe
/// base64, which is filesystem safe and can be decoded back.
pub fn cache_file_name(destination: &str) -> String {
    format!(
        "{}{}{}",
        CACHE_FILE_PREFIX,
        URL_SAFE_NO_PAD.encode(destination.as_bytes()),
        CACHE_FILE_SUFFIX
    )
}

/// Recover the destination from a cache file name produced by [`cache_file_name`].
pub fn destination_from_cache_file(file_name: &str) -> Option<String> {
    let encoded = file_name
        .strip_prefix(CACHE_FILE_PREFIX)?
        .strip_suffix(CACHE_FILE_SUFFIX)?;
    let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
    String::from_utf8(bytes).ok()
}

/// Per-destination playlist cache.
pub struct CatalogCache {
    dir: PathBuf,
    source: Arc<dyn CatalogSource>,
    page_size: u32,
}

impl CatalogCache {
    /// Create a cache that stores files under `dir` and refreshes from `source`.
    pub fn new(dir: impl Into<PathBuf>, source: Arc<dyn CatalogSource>, page_size: u32) -> Self {
        Self {
            dir: dir.into(),
            source,
            page_size: page_size.max(1),
        }
    }

    /// Path of the cache file for a destination.
    pub fn cache_path(&self, destination: &str) -> PathBuf {
        self.dir.join(cache_file_name(destination))
    }

    /// Rebuild the destination's cache from upstream.
    ///
    /// A playlist that fails to fetch is logged and skipped; the remaining
    /// playlists still make it into the cache. The file is replaced as a
    /// whole. Only a failure to write the file is returned as an error.
    pub async fn refresh(
        &self,
        destination: &str,
        group_ids: &[String],
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();

        for group_id in group_ids {
            match self.fetch_group(group_id).await {
                Ok(group_entries) => {
                    let fetched = group_entries.len();
                    let mut duplicates = 0usize;
                    for entry in group_entries {
                        if seen.insert(entry.id.clone()) {
                            entries.push(entry);
                        } else {
                            duplicates += 1;
                        }
                    }
                    debug!(
                        destination = %destination,
                        group_id = %group_id,
                        fetched,
                        duplicates,
                        "Fetched playlist"
                    );
                }
                Err(e) => {
                    metrics::CATALOG_GROUP_FAILURES.inc();
                    warn!(
                        destination = %destination,
                        group_id = %group_id,
                        error = %e,
                        "Failed to fetch playlist, skipping"
                    );
                }
            }
        }

        let path = self.cache_path(destination);
        storage::write_json(&path, &entries).await?;

        info!(
            destination = %destination,
            groups = group_ids.len(),
            entries = entries.len(),
            "Catalog cache refreshed"
        );

        Ok(entries)
    }

    /// Read the destination's cache. Missing or corrupt files read as empty.
    pub async fn load(&self, destination: &str) -> Vec<CatalogEntry> {
        load_entries(&self.cache_path(destination)).await
    }

    async fn fetch_group(&self, group_id: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
        let group = self.source.group_detail(group_id).await?;

        let mut entries = Vec::new();
        let mut ids = HashSet::new();
        let mut offset = 0u32;
        loop {
            let page = self
                .source
                .group_members(group_id, self.page_size, offset)
                .await?;
            let page_len = page.len();
            let before = ids.len();
            for track in page {
                ids.insert(track.id.clone());
                entries.push(track.into_entry(&group));
            }

            if page_len < self.page_size as usize {
                break;
            }
            // A full page with nothing new means upstream ignores the offset.
            if ids.len() == before {
                warn!(group_id = %group_id, offset, "Page repeated earlier members, stopping");
                break;
            }
            match offset.checked_add(self.page_size) {
                Some(next) => offset = next,
                None => {
                    warn!(group_id = %group_id, offset, "Pagination offset overflow, stopping");
                    break;
                }
            }
        }

        Ok(entries)
    }
}

async fn load_entries(path: &Path) -> Vec<CatalogEntry> {
    storage::read_json(path).await.unwrap_or_default()
}
