use std::sync::Arc;

use tokio::sync::Mutex;
use tunecast_core::{Config, Dispatcher, PushScheduler, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    dispatcher: Arc<Mutex<Dispatcher>>,
    scheduler: Option<Arc<PushScheduler>>,
}

impl AppState {
    pub fn new(
        config: Config,
        dispatcher: Arc<Mutex<Dispatcher>>,
        scheduler: Option<Arc<PushScheduler>>,
    ) -> Self {
        Self {
            config,
            dispatcher,
            scheduler,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    /// Locked for the whole of a manual push so it cannot interleave with a
    /// scheduled cycle.
    pub fn dispatcher(&self) -> &Arc<Mutex<Dispatcher>> {
        &self.dispatcher
    }

    pub fn scheduler(&self) -> Option<&Arc<PushScheduler>> {
        self.scheduler.as_ref()
    }
}
