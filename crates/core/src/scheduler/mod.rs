//! Push scheduler.
//!
//! Three fixed daily checkpoints drive the bot:
//! - **Planning**: pure calendar arithmetic in [`Schedule`], including the
//!   weekend skip and the Friday evening holiday variant
//! - **Running**: [`PushScheduler`] sleeps to the preload point, refreshes
//!   weather, sleeps to the checkpoint and hands off to a [`PushHandler`]

mod plan;
mod runner;

pub use plan::{PlannedPush, Schedule};
pub use runner::{PushHandler, PushScheduler, SchedulerState, SchedulerStatus};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Time-of-day label of a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Morning,
    Noon,
    Night,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::Morning, Slot::Noon, Slot::Night];

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Morning => "morning",
            Slot::Noon => "noon",
            Slot::Night => "night",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown slot '{0}' (expected morning, noon or night)")]
pub struct ParseSlotError(String);

impl FromStr for Slot {
    type Err = ParseSlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "morning" => Ok(Slot::Morning),
            "noon" => Ok(Slot::Noon),
            "night" => Ok(Slot::Night),
            _ => Err(ParseSlotError(s.to_string())),
        }
    }
}
