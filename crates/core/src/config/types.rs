use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::scheduler::Slot;
use crate::selection::SelectionPolicy;

/// Root configuration. Every section has defaults, so an empty file is valid.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Upstream catalog service (NeteaseCloudMusicApi HTTP surface).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_url")]
    pub base_url: String,
    /// Members fetched per page; a shorter page ends pagination.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_catalog_timeout")]
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_url(),
            page_size: default_page_size(),
            timeout_secs: default_catalog_timeout(),
        }
    }
}

fn default_catalog_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_page_size() -> u32 {
    1000
}

fn default_catalog_timeout() -> u64 {
    30
}

/// Weather forecast (weatherapi.com).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WeatherConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default = "default_weather_url")]
    pub base_url: String,
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Total fetch attempts per refresh.
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_weather_timeout")]
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            location: default_location(),
            base_url: default_weather_url(),
            lang: default_lang(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_secs: default_weather_timeout(),
        }
    }
}

fn default_location() -> String {
    "Shanghai".to_string()
}

fn default_weather_url() -> String {
    "https://api.weatherapi.com/v1".to_string()
}

fn default_lang() -> String {
    "zh".to_string()
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_weather_timeout() -> u64 {
    5
}

/// On-disk locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding per-destination catalog caches.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,
    #[serde(default = "default_weather_file")]
    pub weather_file: PathBuf,
    #[serde(default = "default_registry_file")]
    pub registry_file: PathBuf,
    #[serde(default = "default_greetings_dir")]
    pub greetings_dir: PathBuf,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            history_file: default_history_file(),
            weather_file: default_weather_file(),
            registry_file: default_registry_file(),
            greetings_dir: default_greetings_dir(),
            log_dir: default_log_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_history_file() -> PathBuf {
    PathBuf::from("cache/history.json")
}

fn default_weather_file() -> PathBuf {
    PathBuf::from("cache/weather_cache.json")
}

fn default_registry_file() -> PathBuf {
    PathBuf::from("config/webhook_playlists.json")
}

fn default_greetings_dir() -> PathBuf {
    PathBuf::from("greetings")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

/// One daily push time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct CheckpointConfig {
    pub hour: u32,
    pub minute: u32,
    pub slot: Slot,
}

/// Daily push schedule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_checkpoints")]
    pub checkpoints: Vec<CheckpointConfig>,
    /// Weather is refreshed this many minutes before each checkpoint.
    #[serde(default = "default_preload_minutes")]
    pub preload_minutes: u32,
    #[serde(default = "default_true")]
    pub skip_weekends: bool,
    #[serde(default = "default_true")]
    pub holiday_on_friday_evening: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            checkpoints: default_checkpoints(),
            preload_minutes: default_preload_minutes(),
            skip_weekends: true,
            holiday_on_friday_evening: true,
        }
    }
}

fn default_checkpoints() -> Vec<CheckpointConfig> {
    vec![
        CheckpointConfig {
            hour: 10,
            minute: 0,
            slot: Slot::Morning,
        },
        CheckpointConfig {
            hour: 13,
            minute: 0,
            slot: Slot::Noon,
        },
        CheckpointConfig {
            hour: 19,
            minute: 0,
            slot: Slot::Night,
        },
    ]
}

fn default_preload_minutes() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

/// Selection engine settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectionConfig {
    #[serde(default)]
    pub policy: SelectionPolicy,
    #[serde(default = "default_true")]
    pub avoid_last_pick: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            policy: SelectionPolicy::default(),
            avoid_last_pick: true,
        }
    }
}

/// Optional status server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_port() -> u16 {
    8080
}

/// Outbound webhook delivery.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifyConfig {
    #[serde(default = "default_notify_timeout")]
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_notify_timeout(),
        }
    }
}

fn default_notify_timeout() -> u64 {
    10
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub catalog: CatalogConfig,
    pub weather: SanitizedWeatherConfig,
    pub storage: StorageConfig,
    pub schedule: ScheduleConfig,
    pub selection: SelectionConfig,
    pub server: ServerConfig,
    pub notify: NotifyConfig,
}

/// Weather config with the API key hidden.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedWeatherConfig {
    pub enabled: bool,
    pub api_key_configured: bool,
    pub location: String,
    pub base_url: String,
    pub lang: String,
    pub retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let weather = &config.weather;
        Self {
            catalog: config.catalog.clone(),
            weather: SanitizedWeatherConfig {
                enabled: weather.enabled,
                api_key_configured: !weather.api_key.is_empty(),
                location: weather.location.clone(),
                base_url: weather.base_url.clone(),
                lang: weather.lang.clone(),
                retries: weather.retries,
                retry_delay_ms: weather.retry_delay_ms,
                timeout_secs: weather.timeout_secs,
            },
            storage: config.storage.clone(),
            schedule: config.schedule.clone(),
            selection: config.selection.clone(),
            server: config.server.clone(),
            notify: config.notify.clone(),
        }
    }
}
