//! Types for the playlist catalog cache.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::StorageError;

/// A song cached from an upstream playlist.
///
/// Field names on disk follow the cache file format (`name`, `artist`,
/// `playlistId`, `playlistName`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Upstream song ID. Unique within a cache file.
    pub id: String,
    /// Song title.
    #[serde(rename = "name")]
    pub title: String,
    /// Primary artist name.
    #[serde(rename = "artist")]
    pub artist_name: String,
    /// ID of the playlist this entry was fetched from.
    #[serde(rename = "playlistId")]
    pub group_id: String,
    /// Display name of that playlist.
    #[serde(rename = "playlistName")]
    pub group_name: String,
}

/// Playlist header as returned by the "group detail" call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDetail {
    pub id: String,
    pub name: String,
}

/// A playlist member as returned by the "group members" call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTrack {
    pub id: String,
    pub title: String,
    pub artist_name: String,
}

impl CatalogTrack {
    /// Attach the owning playlist to produce a cacheable entry.
    pub fn into_entry(self, group: &GroupDetail) -> CatalogEntry {
        CatalogEntry {
            id: self.id,
            title: self.title,
            artist_name: self.artist_name,
            group_id: group.id.clone(),
            group_name: group.name.clone(),
        }
    }
}

/// Errors for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Playlist does not exist upstream.
    #[error("Playlist not found: {0}")]
    NotFound(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Failed to persist the cache file.
    #[error("Failed to write cache: {0}")]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_uses_cache_file_field_names() {
        let entry = CatalogEntry {
            id: "1".to_string(),
            title: "Song".to_string(),
            artist_name: "Artist".to_string(),
            group_id: "g1".to_string(),
            group_name: "Playlist".to_string(),
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["name"], "Song");
        assert_eq!(json["artist"], "Artist");
        assert_eq!(json["playlistId"], "g1");
        assert_eq!(json["playlistName"], "Playlist");
    }

    #[test]
    fn test_track_into_entry() {
        let group = GroupDetail {
            id: "g7".to_string(),
            name: "Late Night".to_string(),
        };
        let track = CatalogTrack {
            id: "42".to_string(),
            title: "Blue".to_string(),
            artist_name: "Someone".to_string(),
        };

        let entry = track.into_entry(&group);
        assert_eq!(entry.group_id, "g7");
        assert_eq!(entry.group_name, "Late Night");
        assert_eq!(entry.id, "42");
    }
}
