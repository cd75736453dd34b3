use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::scheduler::Slot;
use crate::selection::SelectionPolicy;

/// What happened for one destination in a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PushResult {
    /// Message delivered.
    Sent { song_id: String, title: String },
    /// A song was picked and recorded but the webhook call failed.
    SendFailed { song_id: String, error: String },
    /// Every cached song was already in the history; history was cleared.
    Exhausted,
    /// The destination's cache is empty.
    NoCandidates,
    /// Local failure before sending (history write, payload encoding).
    Failed { error: String },
}

impl PushResult {
    pub fn label(&self) -> &'static str {
        match self {
            PushResult::Sent { .. } => "sent",
            PushResult::SendFailed { .. } => "send_failed",
            PushResult::Exhausted => "exhausted",
            PushResult::NoCandidates => "no_candidates",
            PushResult::Failed { .. } => "failed",
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, PushResult::Sent { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DestinationOutcome {
    pub destination: String,
    #[serde(flatten)]
    pub result: PushResult,
}

/// Summary of one push cycle across all destinations.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub slot: Slot,
    pub holiday: bool,
    pub outcomes: Vec<DestinationOutcome>,
}

impl CycleReport {
    pub fn sent_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_sent()).count()
    }

    pub fn outcome(&self, destination: &str) -> Option<&PushResult> {
        self.outcomes
            .iter()
            .find(|o| o.destination == destination)
            .map(|o| &o.result)
    }
}

/// Dispatcher state for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStatus {
    pub last_refreshed: Option<NaiveDate>,
    pub history_size: usize,
    pub destinations: usize,
    pub policy: SelectionPolicy,
    pub weather_enabled: bool,
}
