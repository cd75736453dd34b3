//! Scheduler loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use super::plan::{PlannedPush, Schedule};
use super::Slot;

/// Source of "now" in local wall-clock time.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Work performed at the scheduler's two wake-ups.
#[async_trait]
pub trait PushHandler: Send + Sync {
    /// Runs at the preload point ahead of a checkpoint.
    async fn preload(&self);

    /// Runs at the checkpoint.
    async fn push(&self, slot: Slot, holiday: bool);
}

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    WeekendSkip,
    PreloadWait,
    PushWait,
    Pushing,
    Stopped,
}

/// Snapshot for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    pub next: Option<PlannedPush>,
}

/// Drives the daily checkpoints until stopped.
pub struct PushScheduler {
    schedule: Schedule,
    handler: Arc<dyn PushHandler>,
    clock: Clock,
    status: Arc<RwLock<SchedulerStatus>>,
    stopped: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl PushScheduler {
    pub fn new(schedule: Schedule, handler: Arc<dyn PushHandler>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            schedule,
            handler,
            clock: Arc::new(|| Local::now().naive_local()),
            status: Arc::new(RwLock::new(SchedulerStatus {
                state: SchedulerState::Idle,
                next: None,
            })),
            stopped: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Replace the wall clock.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub async fn status(&self) -> SchedulerStatus {
        self.status.read().await.clone()
    }

    /// Signal the loop to exit. Any pending sleep is cancelled.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
    }

    /// Run until [`stop`](Self::stop) is called.
    pub async fn run(&self) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut last_push: Option<NaiveDateTime> = None;
        info!("Push scheduler started");

        while !self.stopped.load(Ordering::SeqCst) {
            let now = (self.clock)();
            // Never plan the same checkpoint twice if the wall clock lags the timer.
            let from = last_push.map_or(now, |last| now.max(last));
            let plan = self.schedule.next_after(from);

            if plan.weekend_skip {
                info!(next = %plan.at, "Weekend, next push on Monday");
            } else {
                info!(slot = %plan.slot, at = %plan.at, holiday = plan.holiday, "Next push planned");
            }

            if plan.preload_at > now {
                let state = if plan.weekend_skip {
                    SchedulerState::WeekendSkip
                } else {
                    SchedulerState::PreloadWait
                };
                self.set_status(state, Some(plan)).await;
                if !self.sleep_until(plan.preload_at, &mut shutdown_rx).await {
                    break;
                }
            } else {
                debug!(slot = %plan.slot, "Preload point already passed, refreshing now");
            }

            self.handler.preload().await;

            self.set_status(SchedulerState::PushWait, Some(plan)).await;
            if !self.sleep_until(plan.at, &mut shutdown_rx).await {
                break;
            }

            self.set_status(SchedulerState::Pushing, Some(plan)).await;
            self.handler.push(plan.slot, plan.holiday).await;
            last_push = Some(plan.at);

            self.set_status(SchedulerState::Idle, None).await;
        }

        self.set_status(SchedulerState::Stopped, None).await;
        info!("Push scheduler stopped");
    }

    async fn set_status(&self, state: SchedulerState, next: Option<PlannedPush>) {
        let mut status = self.status.write().await;
        status.state = state;
        status.next = next;
    }

    /// Sleep until `target` by the scheduler clock. Returns `false` on shutdown.
    async fn sleep_until(
        &self,
        target: NaiveDateTime,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> bool {
        if self.stopped.load(Ordering::SeqCst) {
            return false;
        }

        let wait = (target - (self.clock)())
            .to_std()
            .unwrap_or(Duration::ZERO);
        debug!(wait_secs = wait.as_secs(), until = %target, "Sleeping");

        tokio::select! {
            result = shutdown_rx.recv() => {
                if let Err(e) = result {
                    warn!(error = %e, "Shutdown channel closed");
                }
                info!("Scheduler received shutdown signal");
                false
            }
            _ = tokio::time::sleep(wait) => true,
        }
    }
}
