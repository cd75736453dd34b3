//! File-backed weather snapshot with bounded retry.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::metrics;
use crate::storage;

use super::types::WeatherSnapshot;
use super::WeatherSource;

/// Global weather cache.
pub struct WeatherCache {
    path: PathBuf,
    source: Option<Arc<dyn WeatherSource>>,
    attempts: u32,
    retry_delay: Duration,
}

impl WeatherCache {
    /// Create a cache backed by `path`.
    ///
    /// With no `source` the cache never refreshes and messages carry no weather.
    pub fn new(
        path: impl Into<PathBuf>,
        source: Option<Arc<dyn WeatherSource>>,
        attempts: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            path: path.into(),
            source,
            attempts: attempts.max(1),
            retry_delay,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_enabled(&self) -> bool {
        self.source.is_some()
    }

    /// Fetch tomorrow's forecast, retrying with a fixed delay, and persist it.
    ///
    /// Returns `None` once every attempt has failed. The previous snapshot is
    /// then removed so a stale forecast is never sent as current.
    pub async fn refresh(&self) -> Option<WeatherSnapshot> {
        let source = self.source.as_ref()?;

        let mut last_error = None;
        for attempt in 1..=self.attempts {
            match source.fetch_tomorrow().await {
                Ok(snapshot) => {
                    metrics::WEATHER_FETCHES.with_label_values(&["success"]).inc();
                    if let Err(e) = storage::write_json(&self.path, &snapshot).await {
                        warn!(error = %e, "Failed to persist weather snapshot");
                    }
                    info!(attempt, summary = %snapshot.summary, "Weather refreshed");
                    return Some(snapshot);
                }
                Err(e) => {
                    metrics::WEATHER_FETCHES.with_label_values(&["failure"]).inc();
                    warn!(attempt, attempts = self.attempts, error = %e, "Weather fetch failed");
                    last_error = Some(e);
                    if attempt < self.attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        if let Some(e) = last_error {
            warn!(
                attempts = self.attempts,
                error = %e,
                "Giving up on weather, next message goes out without it"
            );
        }
        self.invalidate().await;
        None
    }

    async fn invalidate(&self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => info!(path = %self.path.display(), "Discarded stale weather snapshot"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, "Failed to discard stale weather snapshot"),
        }
    }

    /// Read the cached snapshot, if any.
    pub async fn load(&self) -> Option<WeatherSnapshot> {
        storage::read_json(&self.path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockWeatherSource;
    use tempfile::TempDir;

    fn cache(dir: &TempDir, source: Arc<MockWeatherSource>) -> WeatherCache {
        WeatherCache::new(
            dir.path().join("weather_cache.json"),
            Some(source),
            3,
            Duration::from_millis(1),
        )
    }

    #[tokio::test]
    async fn test_refresh_persists_snapshot() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(MockWeatherSource::new());
        let cache = cache(&dir, source.clone());

        let snapshot = cache.refresh().await.unwrap();
        assert_eq!(cache.load().await, Some(snapshot));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_refresh_retries_then_succeeds() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(MockWeatherSource::new());
        source.fail_next(2);
        let cache = cache(&dir, source.clone());

        assert!(cache.refresh().await.is_some());
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_refresh_gives_up_and_discards_old_snapshot() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(MockWeatherSource::new());
        let cache = cache(&dir, source.clone());
        let old = cache.refresh().await.unwrap();

        source.fail_next(3);
        assert!(cache.refresh().await.is_none());
        assert_eq!(source.calls(), 4);
        assert!(cache.load().await.is_none());
        assert!(!dir.path().join("weather_cache.json").exists());

        // next success writes a fresh snapshot again
        assert_eq!(cache.refresh().await, Some(old));
    }

    #[tokio::test]
    async fn test_disabled_cache_never_fetches() {
        let dir = TempDir::new().unwrap();
        let cache = WeatherCache::new(
            dir.path().join("weather_cache.json"),
            None,
            3,
            Duration::from_millis(1),
        );
        assert!(!cache.is_enabled());
        assert!(cache.refresh().await.is_none());
        assert!(cache.load().await.is_none());
    }
}
