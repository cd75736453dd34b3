//! Outbound push message.

use serde::Serialize;

use crate::catalog::CatalogEntry;
use crate::scheduler::Slot;
use crate::weather::{WeatherCategory, WeatherSnapshot};

/// Song page link prefix.
pub const SONG_LINK_BASE: &str = "https://music.163.com/#/song?id=";

/// The message pushed to a destination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub greeting: String,
    pub song: String,
    pub artist: String,
    pub playlist: String,
    pub link: String,
    #[serde(rename = "timeType")]
    pub time_type: Slot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherBlurb>,
}

/// Weather block attached to evening messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherBlurb {
    pub message: String,
    #[serde(rename = "type")]
    pub category: WeatherCategory,
    pub emoji: String,
}

impl From<&WeatherSnapshot> for WeatherBlurb {
    fn from(snapshot: &WeatherSnapshot) -> Self {
        Self {
            message: snapshot.summary.clone(),
            category: snapshot.category,
            emoji: snapshot.icon.clone(),
        }
    }
}

impl PushMessage {
    /// Compose a message. Weather is only attached to the night slot.
    pub fn compose(
        entry: &CatalogEntry,
        slot: Slot,
        greeting: String,
        weather: Option<&WeatherSnapshot>,
    ) -> Self {
        Self {
            greeting,
            song: entry.title.clone(),
            artist: entry.artist_name.clone(),
            playlist: entry.group_name.clone(),
            link: format!("{}{}", SONG_LINK_BASE, entry.id),
            time_type: slot,
            weather: weather
                .filter(|_| slot == Slot::Night)
                .map(WeatherBlurb::from),
        }
    }

    /// Webhook body: `{"text": <pretty-printed message JSON>}`.
    pub fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        let text = serde_json::to_string_pretty(self)?;
        Ok(serde_json::json!({ "text": text }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    fn snapshot() -> WeatherSnapshot {
        WeatherSnapshot::from_forecast("晴", 10.0, 20.0, 0)
    }

    #[test]
    fn test_compose_night_includes_weather() {
        let entry = fixtures::entry("186016", "g1");
        let weather = snapshot();
        let msg = PushMessage::compose(&entry, Slot::Night, "晚安".to_string(), Some(&weather));

        assert_eq!(msg.link, "https://music.163.com/#/song?id=186016");
        assert_eq!(msg.weather.as_ref().unwrap().emoji, "🌞");
    }

    #[test]
    fn test_compose_morning_omits_weather() {
        let entry = fixtures::entry("1", "g1");
        let weather = snapshot();
        let msg = PushMessage::compose(&entry, Slot::Morning, String::new(), Some(&weather));
        assert!(msg.weather.is_none());
    }

    #[test]
    fn test_payload_wraps_pretty_json_in_text() {
        let entry = fixtures::entry("7", "g1");
        let msg = PushMessage::compose(&entry, Slot::Noon, "午安".to_string(), None);

        let payload = msg.to_payload().unwrap();
        let text = payload["text"].as_str().unwrap();
        let inner: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(inner["timeType"], "noon");
        assert_eq!(inner["greeting"], "午安");
        assert!(inner.get("weather").is_none());
        assert!(text.contains('\n'));
    }
}
