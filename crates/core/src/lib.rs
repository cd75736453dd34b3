pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod greeting;
pub mod history;
pub mod message;
pub mod metrics;
pub mod notify;
pub mod registry;
pub mod scheduler;
pub mod selection;
pub mod storage;
pub mod testing;
pub mod weather;

pub use catalog::{CatalogCache, CatalogEntry, CatalogError, CatalogSource, NeteaseClient};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use dispatch::{CycleReport, DispatchError, Dispatcher, DispatcherStatus, PushResult};
pub use history::{HistoryError, HistorySet, HistoryStore};
pub use notify::{Notifier, NotifyError, WebhookNotifier};
pub use registry::{DestinationRegistry, RegistryError};
pub use scheduler::{PushHandler, PushScheduler, Schedule, SchedulerState, Slot};
pub use selection::{SelectionOutcome, SelectionPolicy, Selector};
pub use weather::{WeatherCache, WeatherError, WeatherSnapshot, WeatherSource};
