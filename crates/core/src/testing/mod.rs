//! Testing utilities and mock implementations.
//!
//! Mock versions of every external collaborator so the dispatcher and
//! scheduler can be exercised without a music API, weather service or
//! webhook endpoint.
//!
//! # Example
//!
//! ```rust,ignore
//! use tunecast_core::testing::{fixtures, MockCatalogSource, MockNotifier};
//!
//! let catalog = MockCatalogSource::new();
//! catalog.add_group("g1", "Daily", fixtures::tracks("g1", 3)).await;
//!
//! let notifier = MockNotifier::new();
//! // ... run a push cycle ...
//! assert_eq!(notifier.sent().await.len(), 1);
//! ```

mod mock_catalog;
mod mock_notifier;
mod mock_weather;

pub use mock_catalog::MockCatalogSource;
pub use mock_notifier::{MockNotifier, RecordedSend};
pub use mock_weather::MockWeatherSource;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::catalog::{CatalogEntry, CatalogTrack};

    /// A cached song with the given ID in playlist `group`.
    pub fn entry(id: &str, group: &str) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            title: format!("Song {}", id),
            artist_name: "Test Artist".to_string(),
            group_id: group.to_string(),
            group_name: format!("Playlist {}", group),
        }
    }

    /// `n` cached songs in `group`, with IDs `{group}-0` .. `{group}-{n-1}`.
    pub fn entries(group: &str, n: usize) -> Vec<CatalogEntry> {
        (0..n)
            .map(|i| entry(&format!("{}-{}", group, i), group))
            .collect()
    }

    /// `n` upstream tracks with IDs `{prefix}-0` .. `{prefix}-{n-1}`.
    pub fn tracks(prefix: &str, n: usize) -> Vec<CatalogTrack> {
        (0..n)
            .map(|i| CatalogTrack {
                id: format!("{}-{}", prefix, i),
                title: format!("Track {}", i),
                artist_name: format!("Artist {}", i % 3),
            })
            .collect()
    }
}
