//! Mock weather source for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::weather::{WeatherError, WeatherSnapshot, WeatherSource};

/// Returns a fixed snapshot, optionally failing a number of calls first.
#[derive(Debug)]
pub struct MockWeatherSource {
    snapshot: WeatherSnapshot,
    failures_left: AtomicUsize,
    calls: AtomicUsize,
}

impl Default for MockWeatherSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockWeatherSource {
    /// Sunny, 10-20°C.
    pub fn new() -> Self {
        Self::with_snapshot(WeatherSnapshot::from_forecast("晴", 10.0, 20.0, 0))
    }

    pub fn with_snapshot(snapshot: WeatherSnapshot) -> Self {
        Self {
            snapshot,
            failures_left: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail the next `n` fetches.
    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    /// Total fetches so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherSource for MockWeatherSource {
    async fn fetch_tomorrow(&self) -> Result<WeatherSnapshot, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(WeatherError::ApiError {
                status: 503,
                message: "mock weather outage".to_string(),
            });
        }
        Ok(self.snapshot.clone())
    }
}
