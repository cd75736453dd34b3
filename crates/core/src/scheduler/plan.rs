//! Checkpoint arithmetic. Everything here works on naive local time so it can
//! be tested without a clock.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::Serialize;

use crate::config::{ConfigError, ScheduleConfig};

use super::Slot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Checkpoint {
    time: NaiveTime,
    slot: Slot,
}

/// The next push the scheduler will perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlannedPush {
    /// Checkpoint time.
    pub at: NaiveDateTime,
    /// When to refresh weather ahead of the push.
    pub preload_at: NaiveDateTime,
    pub slot: Slot,
    /// Friday evening: use the holiday greeting.
    pub holiday: bool,
    /// The plan jumped over a weekend.
    pub weekend_skip: bool,
}

/// Daily checkpoints plus the calendar rules applied to them.
#[derive(Debug, Clone)]
pub struct Schedule {
    checkpoints: Vec<Checkpoint>,
    preload: Duration,
    skip_weekends: bool,
    holiday_on_friday_evening: bool,
}

impl Schedule {
    /// Build from a validated schedule section. Checkpoints are sorted by time.
    pub fn from_config(config: &ScheduleConfig) -> Result<Self, ConfigError> {
        let mut checkpoints = config
            .checkpoints
            .iter()
            .map(|cp| {
                NaiveTime::from_hms_opt(cp.hour, cp.minute, 0)
                    .map(|time| Checkpoint {
                        time,
                        slot: cp.slot,
                    })
                    .ok_or_else(|| {
                        ConfigError::ValidationError(format!(
                            "invalid checkpoint time {:02}:{:02}",
                            cp.hour, cp.minute
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if checkpoints.is_empty() {
            return Err(ConfigError::ValidationError(
                "schedule needs at least one checkpoint".to_string(),
            ));
        }
        checkpoints.sort_by_key(|cp| cp.time);

        Ok(Self {
            checkpoints,
            preload: Duration::minutes(i64::from(config.preload_minutes)),
            skip_weekends: config.skip_weekends,
            holiday_on_friday_evening: config.holiday_on_friday_evening,
        })
    }

    /// Plan the first push strictly after `now`.
    ///
    /// Picks the nearest remaining checkpoint today, else tomorrow's first. If
    /// that lands on a Saturday or Sunday (and weekends are skipped) the push
    /// moves to the following Monday's first checkpoint.
    pub fn next_after(&self, now: NaiveDateTime) -> PlannedPush {
        let today = now.date();
        let last = self.checkpoints.len() - 1;

        let (mut at, mut index) = self
            .checkpoints
            .iter()
            .enumerate()
            .map(|(i, cp)| (today.and_time(cp.time), i))
            .find(|(at, _)| *at > now)
            .unwrap_or_else(|| (next_day(today).and_time(self.checkpoints[0].time), 0));

        let weekend_skip = self.skip_weekends && is_weekend(at.date());
        if weekend_skip {
            at = next_monday(at.date()).and_time(self.checkpoints[0].time);
            index = 0;
        }

        let slot = self.checkpoints[index].slot;
        let holiday =
            self.holiday_on_friday_evening && index == last && at.weekday() == Weekday::Fri;

        PlannedPush {
            at,
            preload_at: at - self.preload,
            slot,
            holiday,
            weekend_skip,
        }
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}

fn next_monday(date: NaiveDate) -> NaiveDate {
    let days = 7 - i64::from(date.weekday().num_days_from_monday());
    date + Duration::days(days)
}
