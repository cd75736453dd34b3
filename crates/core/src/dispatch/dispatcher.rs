//! Push cycle orchestration.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use tokio::sync::Mutex;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::catalog::{CatalogCache, NeteaseClient};
use crate::config::Config;
use crate::greeting::GreetingSource;
use crate::history::{HistoryError, HistoryStore};
use crate::message::PushMessage;
use crate::metrics;
use crate::notify::{Notifier, WebhookNotifier};
use crate::registry::DestinationRegistry;
use crate::scheduler::{PushHandler, Slot};
use crate::selection::{SelectionOutcome, Selector};
use crate::weather::{WeatherApiClient, WeatherCache, WeatherSnapshot, WeatherSource};

use super::types::{CycleReport, DestinationOutcome, DispatcherStatus, PushResult};
use super::DispatchError;

/// Long-lived owner of the caches, the history and the selector.
///
/// Destinations are processed one after another; nothing here is shared
/// across tasks except through the `Mutex<Dispatcher>` handed to the
/// scheduler and the status server.
pub struct Dispatcher {
    registry: DestinationRegistry,
    catalog: CatalogCache,
    history: HistoryStore,
    selector: Selector,
    weather: WeatherCache,
    greetings: GreetingSource,
    notifier: Arc<dyn Notifier>,
    /// Calendar day of the last catalog refresh. Reset only by a restart.
    last_refreshed: Option<NaiveDate>,
    /// A weather fetch already ran for the upcoming cycle. Cleared after each cycle.
    weather_fetched: bool,
}

impl Dispatcher {
    pub fn new(
        registry: DestinationRegistry,
        catalog: CatalogCache,
        history: HistoryStore,
        selector: Selector,
        weather: WeatherCache,
        greetings: GreetingSource,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            registry,
            catalog,
            history,
            selector,
            weather,
            greetings,
            notifier,
            last_refreshed: None,
            weather_fetched: false,
        }
    }

    /// Wire up the production collaborators.
    ///
    /// Fails if the destination registry is missing or unreadable.
    pub async fn from_config(config: &Config) -> Result<Self, DispatchError> {
        let registry = DestinationRegistry::load(&config.storage.registry_file).await?;
        info!(destinations = registry.len(), "Loaded destination registry");

        let source = Arc::new(NeteaseClient::new(&config.catalog)?);
        let catalog = CatalogCache::new(
            &config.storage.data_dir,
            source,
            config.catalog.page_size,
        );

        let weather_source: Option<Arc<dyn WeatherSource>> = if config.weather.enabled {
            Some(Arc::new(WeatherApiClient::new(&config.weather)?))
        } else {
            info!("Weather disabled");
            None
        };
        let weather = WeatherCache::new(
            &config.storage.weather_file,
            weather_source,
            config.weather.retries,
            Duration::from_millis(config.weather.retry_delay_ms),
        );

        let notifier = WebhookNotifier::new(Duration::from_secs(config.notify.timeout_secs))?;

        Ok(Self::new(
            registry,
            catalog,
            HistoryStore::new(&config.storage.history_file),
            Selector::new(config.selection.policy, config.selection.avoid_last_pick),
            weather,
            GreetingSource::new(&config.storage.greetings_dir),
            Arc::new(notifier),
        ))
    }

    /// Run one push cycle for every destination.
    pub async fn run_cycle(&mut self, slot: Slot, holiday: bool) -> CycleReport {
        let cycle_id = Uuid::new_v4();
        let span = info_span!("push_cycle", cycle_id = %cycle_id, slot = %slot, holiday);
        self.run_cycle_inner(cycle_id, slot, holiday)
            .instrument(span)
            .await
    }

    async fn run_cycle_inner(&mut self, cycle_id: Uuid, slot: Slot, holiday: bool) -> CycleReport {
        let timer = metrics::CYCLE_DURATION
            .with_label_values(&[slot.as_str()])
            .start_timer();
        info!("Push cycle started");

        self.ensure_catalogs_fresh(Local::now().date_naive()).await;
        self.ensure_weather().await;

        let destinations: Vec<String> = self.registry.iter().map(|(d, _)| d.clone()).collect();
        let mut outcomes = Vec::with_capacity(destinations.len());
        for destination in destinations {
            let result = match self.push_one(&destination, slot, holiday).await {
                Ok(result) => result,
                Err(e) => {
                    error!(destination = %destination, error = %e, "Push failed");
                    PushResult::Failed {
                        error: e.to_string(),
                    }
                }
            };
            metrics::PUSHES.with_label_values(&[result.label()]).inc();
            outcomes.push(DestinationOutcome {
                destination,
                result,
            });
        }

        self.weather_fetched = false;
        timer.observe_duration();
        let report = CycleReport {
            cycle_id,
            slot,
            holiday,
            outcomes,
        };
        info!(
            sent = report.sent_count(),
            destinations = report.outcomes.len(),
            "Push cycle finished"
        );
        report
    }

    async fn push_one(
        &mut self,
        destination: &str,
        slot: Slot,
        holiday: bool,
    ) -> Result<PushResult, DispatchError> {
        let entries = self.catalog.load(destination).await;
        let history = self.history.load().await;
        let scope = self.catalog.cache_path(destination).display().to_string();

        let entry = match self.selector.select(&scope, &entries, &history) {
            SelectionOutcome::Selected(entry) => entry,
            SelectionOutcome::NoCandidates => {
                warn!(destination = %destination, "Catalog cache is empty, skipping");
                return Ok(PushResult::NoCandidates);
            }
            SelectionOutcome::Exhausted => {
                self.history.clear().await?;
                info!(
                    destination = %destination,
                    cached = entries.len(),
                    "Every cached song has been pushed, history cleared"
                );
                return Ok(PushResult::Exhausted);
            }
        };

        let history_size = self.history.record(&entry.id).await?;
        debug!(song_id = %entry.id, history_size, "Recorded pick");

        let greeting = self.greetings.pick(slot, holiday).await;
        let weather = match slot {
            Slot::Night => self.weather.load().await,
            _ => None,
        };
        let payload = PushMessage::compose(&entry, slot, greeting, weather.as_ref()).to_payload()?;

        match self.notifier.send(destination, &payload).await {
            Ok(()) => {
                info!(
                    destination = %destination,
                    song_id = %entry.id,
                    song = %entry.title,
                    group_id = %entry.group_id,
                    "Pushed song"
                );
                Ok(PushResult::Sent {
                    song_id: entry.id,
                    title: entry.title,
                })
            }
            Err(e) => {
                warn!(destination = %destination, song_id = %entry.id, error = %e, "Webhook delivery failed");
                Ok(PushResult::SendFailed {
                    song_id: entry.id,
                    error: e.to_string(),
                })
            }
        }
    }

    /// Refresh every destination's cache unless it was already done on `today`.
    /// Returns whether a refresh ran.
    pub async fn ensure_catalogs_fresh(&mut self, today: NaiveDate) -> bool {
        if self.last_refreshed == Some(today) {
            return false;
        }
        info!(date = %today, "New day, refreshing catalog caches");
        metrics::CATALOG_REFRESHES.with_label_values(&["daily"]).inc();
        self.refresh_destinations().await;
        self.last_refreshed = Some(today);
        true
    }

    /// Force a catalog refresh for every destination. Returns the number of
    /// cached songs across all destinations.
    pub async fn refresh_all(&mut self) -> usize {
        metrics::CATALOG_REFRESHES.with_label_values(&["manual"]).inc();
        let total = self.refresh_destinations().await;
        self.last_refreshed = Some(Local::now().date_naive());
        total
    }

    async fn refresh_destinations(&self) -> usize {
        let mut total = 0;
        for (destination, groups) in self.registry.iter() {
            match self.catalog.refresh(destination, groups).await {
                Ok(entries) => total += entries.len(),
                Err(e) => {
                    // Previous cache file, if any, is still in place.
                    error!(destination = %destination, error = %e, "Catalog refresh failed");
                }
            }
        }
        total
    }

    /// Fetch weather unconditionally (the scheduler's preload step).
    ///
    /// A failed fetch discards the cached snapshot, so the next cycle goes out
    /// without weather rather than with an old forecast.
    pub async fn refresh_weather(&mut self) -> Option<WeatherSnapshot> {
        self.weather_fetched = true;
        self.weather.refresh().await
    }

    /// Fetch weather if nothing is cached and no fetch ran for this cycle yet.
    async fn ensure_weather(&mut self) {
        if self.weather.is_enabled()
            && !self.weather_fetched
            && self.weather.load().await.is_none()
        {
            debug!("No cached weather, fetching before push");
            self.weather.refresh().await;
        }
    }

    /// Forget every recommended song.
    pub async fn reset_history(&self) -> Result<(), HistoryError> {
        self.history.clear().await?;
        info!(path = %self.history.path().display(), "History reset");
        Ok(())
    }

    /// Push all four message variants in turn, `gap` apart.
    pub async fn test_all(&mut self, gap: Duration) -> Vec<CycleReport> {
        self.refresh_weather().await;

        let variants = [
            (Slot::Morning, false),
            (Slot::Noon, false),
            (Slot::Night, false),
            (Slot::Night, true),
        ];
        let mut reports = Vec::with_capacity(variants.len());
        for (i, (slot, holiday)) in variants.into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(gap).await;
            }
            reports.push(self.run_cycle(slot, holiday).await);
        }
        reports
    }

    pub async fn status(&self) -> DispatcherStatus {
        DispatcherStatus {
            last_refreshed: self.last_refreshed,
            history_size: self.history.load().await.len(),
            destinations: self.registry.len(),
            policy: self.selector.policy(),
            weather_enabled: self.weather.is_enabled(),
        }
    }

    pub fn registry(&self) -> &DestinationRegistry {
        &self.registry
    }
}

#[async_trait]
impl PushHandler for Mutex<Dispatcher> {
    async fn preload(&self) {
        let mut dispatcher = self.lock().await;
        if dispatcher.weather.is_enabled() {
            dispatcher.refresh_weather().await;
        }
    }

    async fn push(&self, slot: Slot, holiday: bool) {
        self.lock().await.run_cycle(slot, holiday).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::SelectionPolicy;
    use crate::testing::{fixtures, MockCatalogSource, MockNotifier, MockWeatherSource};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    const HOOK_A: &str = "https://hooks.example.com/a";
    const HOOK_B: &str = "https://hooks.example.com/b";

    struct Harness {
        dir: TempDir,
        catalog: Arc<MockCatalogSource>,
        weather: Arc<MockWeatherSource>,
        notifier: Arc<MockNotifier>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                catalog: Arc::new(MockCatalogSource::new()),
                weather: Arc::new(MockWeatherSource::new()),
                notifier: Arc::new(MockNotifier::new()),
            }
        }

        fn dispatcher(&self, destinations: &[(&str, &[&str])]) -> Dispatcher {
            let registry = DestinationRegistry::new(
                destinations
                    .iter()
                    .map(|(d, groups)| {
                        (d.to_string(), groups.iter().map(|g| g.to_string()).collect())
                    })
                    .collect::<BTreeMap<_, _>>(),
            );
            let root = self.dir.path();
            Dispatcher::new(
                registry,
                CatalogCache::new(root, self.catalog.clone(), 1000),
                HistoryStore::new(root.join("history.json")),
                Selector::new(SelectionPolicy::Uniform, false),
                WeatherCache::new(
                    root.join("weather_cache.json"),
                    Some(self.weather.clone()),
                    3,
                    Duration::from_millis(1),
                ),
                GreetingSource::new(root.join("greetings")),
                self.notifier.clone(),
            )
        }

        fn history(&self) -> HistoryStore {
            HistoryStore::new(self.dir.path().join("history.json"))
        }
    }

    #[tokio::test]
    async fn test_cycle_pushes_to_every_destination() {
        let h = Harness::new();
        h.catalog.add_group("g1", "One", fixtures::tracks("g1", 3)).await;
        h.catalog.add_group("g2", "Two", fixtures::tracks("g2", 3)).await;
        let mut dispatcher = h.dispatcher(&[(HOOK_A, &["g1"]), (HOOK_B, &["g2"])]);

        let report = dispatcher.run_cycle(Slot::Morning, false).await;

        assert_eq!(report.sent_count(), 2);
        assert_eq!(h.notifier.sent_to(HOOK_A).await.len(), 1);
        assert_eq!(h.history().load().await.len(), 2);
    }

    #[tokio::test]
    async fn test_catalog_refreshed_once_per_day() {
        let h = Harness::new();
        h.catalog.add_group("g1", "One", fixtures::tracks("g1", 5)).await;
        let mut dispatcher = h.dispatcher(&[(HOOK_A, &["g1"])]);

        dispatcher.run_cycle(Slot::Morning, false).await;
        dispatcher.run_cycle(Slot::Noon, false).await;
        assert_eq!(h.catalog.total_member_calls().await, 1);

        let tomorrow = Local::now().date_naive().succ_opt().unwrap();
        assert!(dispatcher.ensure_catalogs_fresh(tomorrow).await);
        assert!(!dispatcher.ensure_catalogs_fresh(tomorrow).await);
        assert_eq!(h.catalog.total_member_calls().await, 2);
    }

    #[tokio::test]
    async fn test_exhaustion_clears_history_and_skips_destination() {
        let h = Harness::new();
        h.catalog.add_group("g1", "One", fixtures::tracks("g1", 2)).await;
        let mut dispatcher = h.dispatcher(&[(HOOK_A, &["g1"])]);

        let history = h.history();
        history
            .save(&["g1-0".to_string(), "g1-1".to_string(), "other".to_string()].into())
            .await
            .unwrap();

        let report = dispatcher.run_cycle(Slot::Noon, false).await;
        assert_eq!(report.outcome(HOOK_A), Some(&PushResult::Exhausted));
        assert!(h.notifier.sent().await.is_empty());
        assert!(history.load().await.is_empty());

        let report = dispatcher.run_cycle(Slot::Noon, false).await;
        assert!(report.outcome(HOOK_A).unwrap().is_sent());
    }

    #[tokio::test]
    async fn test_empty_cache_is_skipped_without_touching_history() {
        let h = Harness::new();
        h.catalog.fail_group("g1").await;
        let mut dispatcher = h.dispatcher(&[(HOOK_A, &["g1"])]);
        h.history().record("keep").await.unwrap();

        let report = dispatcher.run_cycle(Slot::Morning, false).await;
        assert_eq!(report.outcome(HOOK_A), Some(&PushResult::NoCandidates));
        assert!(h.history().load().await.contains("keep"));
    }

    #[tokio::test]
    async fn test_rejected_send_still_records_history() {
        let h = Harness::new();
        h.catalog.add_group("g1", "One", fixtures::tracks("g1", 3)).await;
        h.notifier.reject(HOOK_A).await;
        let mut dispatcher = h.dispatcher(&[(HOOK_A, &["g1"])]);

        let report = dispatcher.run_cycle(Slot::Morning, false).await;
        let Some(PushResult::SendFailed { song_id, .. }) = report.outcome(HOOK_A) else {
            panic!("expected SendFailed, got {:?}", report.outcome(HOOK_A));
        };
        assert!(h.history().load().await.contains(song_id));
    }

    #[tokio::test]
    async fn test_night_push_carries_weather_and_day_push_does_not() {
        let h = Harness::new();
        h.catalog.add_group("g1", "One", fixtures::tracks("g1", 5)).await;
        let mut dispatcher = h.dispatcher(&[(HOOK_A, &["g1"])]);

        dispatcher.run_cycle(Slot::Noon, false).await;
        dispatcher.run_cycle(Slot::Night, false).await;

        let sent = h.notifier.sent().await;
        let noon = sent[0].message().unwrap();
        let night = sent[1].message().unwrap();
        assert!(noon.get("weather").is_none());
        assert_eq!(night["weather"]["type"], "sunny");
        assert_eq!(night["timeType"], "night");
        // fetched once because nothing was cached yet
        assert_eq!(h.weather.calls(), 1);
    }

    #[tokio::test]
    async fn test_weather_outage_omits_weather() {
        let h = Harness::new();
        h.catalog.add_group("g1", "One", fixtures::tracks("g1", 5)).await;
        h.weather.fail_next(3);
        let mut dispatcher = h.dispatcher(&[(HOOK_A, &["g1"])]);

        let report = dispatcher.run_cycle(Slot::Night, false).await;
        assert!(report.outcome(HOOK_A).unwrap().is_sent());
        let message = h.notifier.sent().await[0].message().unwrap();
        assert!(message.get("weather").is_none());
    }

    #[tokio::test]
    async fn test_failed_preload_drops_previous_forecast() {
        let h = Harness::new();
        h.catalog.add_group("g1", "One", fixtures::tracks("g1", 5)).await;
        let mut dispatcher = h.dispatcher(&[(HOOK_A, &["g1"])]);

        assert!(dispatcher.refresh_weather().await.is_some());
        h.weather.fail_next(3);
        assert!(dispatcher.refresh_weather().await.is_none());

        let report = dispatcher.run_cycle(Slot::Night, false).await;
        assert!(report.outcome(HOOK_A).unwrap().is_sent());
        let message = h.notifier.sent().await[0].message().unwrap();
        assert!(message.get("weather").is_none());
        assert_eq!(h.weather.calls(), 4);

        // the following cycle fetches again since nothing is cached
        dispatcher.run_cycle(Slot::Night, false).await;
        let message = h.notifier.sent().await[1].message().unwrap();
        assert_eq!(message["weather"]["type"], "sunny");
        assert_eq!(h.weather.calls(), 5);
    }

    #[tokio::test]
    async fn test_holiday_greeting_used_on_holiday_cycle() {
        let h = Harness::new();
        let greetings = h.dir.path().join("greetings");
        tokio::fs::create_dir_all(&greetings).await.unwrap();
        tokio::fs::write(greetings.join("holiday.txt"), "周末愉快").await.unwrap();
        h.catalog.add_group("g1", "One", fixtures::tracks("g1", 5)).await;
        let mut dispatcher = h.dispatcher(&[(HOOK_A, &["g1"])]);

        dispatcher.run_cycle(Slot::Night, true).await;
        let message = h.notifier.sent().await[0].message().unwrap();
        assert_eq!(message["greeting"], "周末愉快");
    }

    #[tokio::test]
    async fn test_reset_history_and_status() {
        let h = Harness::new();
        h.catalog.add_group("g1", "One", fixtures::tracks("g1", 5)).await;
        let mut dispatcher = h.dispatcher(&[(HOOK_A, &["g1"])]);

        assert!(dispatcher.status().await.last_refreshed.is_none());
        assert_eq!(dispatcher.refresh_all().await, 5);
        dispatcher.run_cycle(Slot::Morning, false).await;

        let status = dispatcher.status().await;
        assert_eq!(status.history_size, 1);
        assert_eq!(status.last_refreshed, Some(Local::now().date_naive()));

        dispatcher.reset_history().await.unwrap();
        assert_eq!(dispatcher.status().await.history_size, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_sends_four_variants() {
        let h = Harness::new();
        h.catalog.add_group("g1", "One", fixtures::tracks("g1", 10)).await;
        let mut dispatcher = h.dispatcher(&[(HOOK_A, &["g1"])]);

        let reports = dispatcher.test_all(Duration::from_secs(2)).await;
        let variants: Vec<(Slot, bool)> = reports.iter().map(|r| (r.slot, r.holiday)).collect();
        assert_eq!(
            variants,
            vec![
                (Slot::Morning, false),
                (Slot::Noon, false),
                (Slot::Night, false),
                (Slot::Night, true)
            ]
        );
        assert_eq!(h.notifier.sent().await.len(), 4);
    }

    #[tokio::test]
    async fn test_scheduler_handler_pushes_through_mutex() {
        let h = Harness::new();
        h.catalog.add_group("g1", "One", fixtures::tracks("g1", 3)).await;
        let handler = Mutex::new(h.dispatcher(&[(HOOK_A, &["g1"])]));

        handler.preload().await;
        assert_eq!(h.weather.calls(), 1);
        handler.push(Slot::Morning, false).await;
        assert_eq!(h.notifier.sent().await.len(), 1);
    }
}
