//! Types for the weather summary.

use serde::{Deserialize, Serialize};

/// Coarse weather category, derived from the forecast condition text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCategory {
    Sunny,
    Cloudy,
    Overcast,
    Rain,
    Snow,
    Fog,
    Haze,
    Thunder,
    Sandstorm,
    Sleet,
    Wind,
    Other,
}

/// Condition keywords in match order. `雨夹雪` must precede `雨` and `雪`.
const CONDITION_KEYWORDS: &[(&str, WeatherCategory)] = &[
    ("晴", WeatherCategory::Sunny),
    ("多云", WeatherCategory::Cloudy),
    ("阴", WeatherCategory::Overcast),
    ("雨夹雪", WeatherCategory::Sleet),
    ("雨", WeatherCategory::Rain),
    ("雪", WeatherCategory::Snow),
    ("雾", WeatherCategory::Fog),
    ("霾", WeatherCategory::Haze),
    ("雷", WeatherCategory::Thunder),
    ("沙尘", WeatherCategory::Sandstorm),
    ("风", WeatherCategory::Wind),
];

impl WeatherCategory {
    /// Classify a (Chinese) forecast condition by its first matching keyword.
    pub fn from_condition(condition: &str) -> Self {
        CONDITION_KEYWORDS
            .iter()
            .find(|(keyword, _)| condition.contains(keyword))
            .map(|(_, category)| *category)
            .unwrap_or(WeatherCategory::Other)
    }

    /// Emoji shown next to the summary.
    pub fn icon(&self) -> &'static str {
        match self {
            WeatherCategory::Sunny => "🌞",
            WeatherCategory::Cloudy => "⛅",
            WeatherCategory::Overcast => "🌥️",
            WeatherCategory::Rain => "🌧️",
            WeatherCategory::Snow | WeatherCategory::Sleet => "🌨️",
            WeatherCategory::Fog | WeatherCategory::Haze => "🌫️",
            WeatherCategory::Thunder => "⛈️",
            WeatherCategory::Sandstorm => "🌪️",
            WeatherCategory::Wind => "💨",
            WeatherCategory::Other => "🌈",
        }
    }
}

/// Cached summary of tomorrow's forecast.
///
/// Serialized as `{"message", "type", "emoji", "timestamp"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    #[serde(rename = "message")]
    pub summary: String,
    #[serde(rename = "type")]
    pub category: WeatherCategory,
    #[serde(rename = "emoji")]
    pub icon: String,
    /// Unix epoch milliseconds of the fetch.
    #[serde(rename = "timestamp")]
    pub fetched_at_millis: i64,
}

impl WeatherSnapshot {
    /// Build a snapshot from tomorrow's condition and temperature range.
    pub fn from_forecast(condition: &str, min_c: f64, max_c: f64, fetched_at_millis: i64) -> Self {
        let category = WeatherCategory::from_condition(condition);
        Self {
            summary: format!(
                "明日天气：{}，气温 {:.0}-{:.0}°C",
                condition, min_c, max_c
            ),
            category,
            icon: category.icon().to_string(),
            fetched_at_millis,
        }
    }
}
