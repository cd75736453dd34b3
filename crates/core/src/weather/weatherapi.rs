//! weatherapi.com forecast client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::WeatherConfig;

use super::types::WeatherSnapshot;
use super::{WeatherError, WeatherSource};

/// Forecast days requested: today and tomorrow.
const FORECAST_DAYS: &str = "2";

/// weatherapi.com client.
pub struct WeatherApiClient {
    client: Client,
    base_url: String,
    api_key: String,
    location: String,
    lang: String,
}

impl WeatherApiClient {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            location: config.location.clone(),
            lang: config.lang.clone(),
        })
    }
}

#[async_trait]
impl WeatherSource for WeatherApiClient {
    async fn fetch_tomorrow(&self) -> Result<WeatherSnapshot, WeatherError> {
        let url = format!("{}/forecast.json", self.base_url);
        debug!("Weather forecast: location='{}'", self.location);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", self.location.as_str()),
                ("days", FORECAST_DAYS),
                ("lang", self.lang.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WeatherError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: WaForecastResponse = response.json().await.map_err(|e| {
            WeatherError::ParseError(format!("Failed to parse forecast response: {}", e))
        })?;

        let tomorrow = body
            .forecast
            .forecastday
            .into_iter()
            .nth(1)
            .ok_or_else(|| WeatherError::ParseError("forecast has no second day".to_string()))?
            .day;

        Ok(WeatherSnapshot::from_forecast(
            &tomorrow.condition.text,
            tomorrow.mintemp_c,
            tomorrow.maxtemp_c,
            Utc::now().timestamp_millis(),
        ))
    }
}

// ============================================================================
// weatherapi.com Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct WaForecastResponse {
    forecast: WaForecast,
}

#[derive(Debug, Deserialize)]
struct WaForecast {
    #[serde(default)]
    forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Deserialize)]
struct WaForecastDay {
    day: WaDay,
}

#[derive(Debug, Deserialize)]
struct WaDay {
    maxtemp_c: f64,
    mintemp_c: f64,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
}
