//! NeteaseCloudMusicApi client.
//!
//! Talks to a self-hosted NeteaseCloudMusicApi instance over HTTP. Only the
//! playlist detail and playlist track listing endpoints are used.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;

use crate::config::CatalogConfig;

use super::types::{CatalogError, CatalogTrack, GroupDetail};
use super::CatalogSource;

/// Artist name used when upstream lists none.
const UNKNOWN_ARTIST: &str = "未知";

/// NeteaseCloudMusicApi HTTP client.
pub struct NeteaseClient {
    client: Client,
    base_url: String,
}

impl NeteaseClient {
    /// Create a new client from the catalog configuration.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn check_status(response: Response, group_id: &str) -> Result<Response, CatalogError> {
        let status = response.status();
        if status == 404 {
            return Err(CatalogError::NotFound(group_id.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl CatalogSource for NeteaseClient {
    async fn group_detail(&self, group_id: &str) -> Result<GroupDetail, CatalogError> {
        let url = format!("{}/playlist/detail", self.base_url);
        debug!("Netease playlist detail: id={}", group_id);

        let response = self.client.get(&url).query(&[("id", group_id)]).send().await?;
        let response = Self::check_status(response, group_id).await?;

        let body: NeDetailResponse = response.json().await.map_err(|e| {
            CatalogError::ParseError(format!("Failed to parse playlist detail: {}", e))
        })?;

        if let Some(code) = body.code.filter(|c| *c != 200) {
            return Err(CatalogError::ApiError {
                status: u16::try_from(code).unwrap_or(u16::MAX),
                message: format!("playlist detail {} rejected with code {}", group_id, code),
            });
        }

        let playlist = body
            .playlist
            .ok_or_else(|| CatalogError::NotFound(group_id.to_string()))?;

        Ok(GroupDetail {
            id: group_id.to_string(),
            name: playlist.name.unwrap_or_default(),
        })
    }

    async fn group_members(
        &self,
        group_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<CatalogTrack>, CatalogError> {
        let url = format!("{}/playlist/track/all", self.base_url);
        debug!(
            "Netease playlist tracks: id={}, limit={}, offset={}",
            group_id, limit, offset
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("id", group_id.to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await?;
        let response = Self::check_status(response, group_id).await?;

        let body: NeTracksResponse = response.json().await.map_err(|e| {
            CatalogError::ParseError(format!("Failed to parse playlist tracks: {}", e))
        })?;

        Ok(body.songs.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// NeteaseCloudMusicApi Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct NeDetailResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    playlist: Option<NePlaylist>,
}

#[derive(Debug, Deserialize)]
struct NePlaylist {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NeTracksResponse {
    #[serde(default)]
    songs: Vec<NeSong>,
}

#[derive(Debug, Deserialize)]
struct NeSong {
    id: NeId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    ar: Vec<NeArtist>,
}

#[derive(Debug, Deserialize)]
struct NeArtist {
    #[serde(default)]
    name: Option<String>,
}

/// Song IDs come back as JSON numbers, but are kept as strings everywhere else.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NeId {
    Num(u64),
    Str(String),
}

impl From<NeSong> for CatalogTrack {
    fn from(song: NeSong) -> Self {
        let id = match song.id {
            NeId::Num(n) => n.to_string(),
            NeId::Str(s) => s,
        };
        let artist_name = song
            .ar
            .into_iter()
            .next()
            .and_then(|a| a.name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

        CatalogTrack {
            id,
            title: song.name,
            artist_name,
        }
    }
}
