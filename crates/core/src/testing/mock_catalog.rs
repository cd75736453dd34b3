//! Mock catalog source for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::catalog::{CatalogError, CatalogSource, CatalogTrack, GroupDetail};

/// In-memory playlists with pagination and failure injection.
///
/// ```rust,ignore
/// use tunecast_core::testing::{fixtures, MockCatalogSource};
///
/// let source = MockCatalogSource::new();
/// source.add_group("g1", "Morning Mix", fixtures::tracks("g1", 5)).await;
/// source.fail_group("g2").await;
///
/// // ... refresh a cache with page size 2 ...
/// assert_eq!(source.member_calls("g1").await, vec![0, 2, 4]);
/// ```
#[derive(Debug, Default)]
pub struct MockCatalogSource {
    groups: Arc<RwLock<HashMap<String, (String, Vec<CatalogTrack>)>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    /// Offsets requested per playlist, in call order.
    member_calls: Arc<RwLock<HashMap<String, Vec<u32>>>>,
}

impl MockCatalogSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a playlist.
    pub async fn add_group(&self, id: &str, name: &str, tracks: Vec<CatalogTrack>) {
        self.groups
            .write()
            .await
            .insert(id.to_string(), (name.to_string(), tracks));
    }

    /// Make every call for `id` fail with a server error.
    pub async fn fail_group(&self, id: &str) {
        self.failing.write().await.insert(id.to_string());
    }

    /// Clear a failure set by [`fail_group`](Self::fail_group).
    pub async fn recover_group(&self, id: &str) {
        self.failing.write().await.remove(id);
    }

    /// Offsets passed to `group_members` for `id`.
    pub async fn member_calls(&self, id: &str) -> Vec<u32> {
        self.member_calls
            .read()
            .await
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of `group_members` calls across all playlists.
    pub async fn total_member_calls(&self) -> usize {
        self.member_calls.read().await.values().map(Vec::len).sum()
    }

    async fn check_failing(&self, id: &str) -> Result<(), CatalogError> {
        if self.failing.read().await.contains(id) {
            return Err(CatalogError::ApiError {
                status: 500,
                message: format!("mock failure for playlist {}", id),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogSource for MockCatalogSource {
    async fn group_detail(&self, group_id: &str) -> Result<GroupDetail, CatalogError> {
        self.check_failing(group_id).await?;
        let groups = self.groups.read().await;
        let (name, _) = groups
            .get(group_id)
            .ok_or_else(|| CatalogError::NotFound(group_id.to_string()))?;
        Ok(GroupDetail {
            id: group_id.to_string(),
            name: name.clone(),
        })
    }

    async fn group_members(
        &self,
        group_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<CatalogTrack>, CatalogError> {
        self.member_calls
            .write()
            .await
            .entry(group_id.to_string())
            .or_default()
            .push(offset);
        self.check_failing(group_id).await?;

        let groups = self.groups.read().await;
        let (_, tracks) = groups
            .get(group_id)
            .ok_or_else(|| CatalogError::NotFound(group_id.to_string()))?;
        Ok(tracks
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
