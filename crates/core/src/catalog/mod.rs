//! Playlist catalog: upstream access and the per-destination file cache.
//!
//! The cache holds every song of every playlist a destination draws from.
//! It is rebuilt wholesale from upstream at most once per calendar day and
//! read verbatim in between.

mod cache;
mod netease;
mod types;

pub use cache::{cache_file_name, destination_from_cache_file, CatalogCache};
pub use netease::NeteaseClient;
pub use types::*;

use async_trait::async_trait;

/// Upstream playlist service.
///
/// Only two reads are required: the playlist header and a page of its members.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch a playlist's display name.
    async fn group_detail(&self, group_id: &str) -> Result<GroupDetail, CatalogError>;

    /// Fetch one page of playlist members.
    ///
    /// A page shorter than `limit` marks the end of the playlist.
    async fn group_members(
        &self,
        group_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<CatalogTrack>, CatalogError>;
}
