//! Weather summary for the evening push.
//!
//! A single global snapshot of tomorrow's forecast, fetched shortly before
//! each checkpoint and cached to disk. A failed fetch only means the message
//! goes out without weather.

mod cache;
mod types;
mod weatherapi;

pub use cache::WeatherCache;
pub use types::{WeatherCategory, WeatherSnapshot};
pub use weatherapi::WeatherApiClient;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the weather provider.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Provider answered with a non-success status.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Response did not contain tomorrow's forecast.
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

/// Source of tomorrow's forecast.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Fetch tomorrow's forecast summary.
    async fn fetch_tomorrow(&self) -> Result<WeatherSnapshot, WeatherError>;
}
