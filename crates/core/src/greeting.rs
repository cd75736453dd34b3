//! Greeting lines, one random line per push.

use std::path::PathBuf;

use rand::rngs::OsRng;
use rand::Rng;
use tracing::debug;

use crate::scheduler::Slot;

/// File stem used for the Friday evening variant.
const HOLIDAY_FILE: &str = "holiday";

/// Reads greetings from `<dir>/<slot>.txt`.
#[derive(Debug, Clone)]
pub struct GreetingSource {
    dir: PathBuf,
}

impl GreetingSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Pick a random non-empty line for the slot, or for `holiday.txt` when
    /// `holiday` is set. Missing or empty files yield an empty greeting.
    pub async fn pick(&self, slot: Slot, holiday: bool) -> String {
        let stem = if holiday { HOLIDAY_FILE } else { slot.as_str() };
        let path = self.dir.join(format!("{}.txt", stem));

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No greeting file");
                return String::new();
            }
        };

        let lines: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        if lines.is_empty() {
            return String::new();
        }

        lines[OsRng.gen_range(0..lines.len())].to_string()
    }
}
