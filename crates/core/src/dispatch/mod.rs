//! Dispatch orchestrator.
//!
//! For each destination, in order: make sure today's catalog cache exists,
//! make sure some weather is cached, pick a song that is not in the history,
//! record it, then format and send the message. An exhausted catalog clears
//! the (global) history and skips the destination for that cycle.

mod dispatcher;
mod types;

pub use dispatcher::Dispatcher;
pub use types::{CycleReport, DestinationOutcome, DispatcherStatus, PushResult};

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::history::HistoryError;
use crate::notify::NotifyError;
use crate::registry::RegistryError;
use crate::weather::WeatherError;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Weather error: {0}")]
    Weather(#[from] WeatherError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Notifier error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Failed to encode message: {0}")]
    Payload(#[from] serde_json::Error),
}
