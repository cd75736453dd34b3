//! Song selection.
//!
//! Picks the next song for a destination from its cached catalog while
//! skipping everything already in the history. Three policies are available;
//! `uniform` is the default.

mod policy;

pub use policy::{pick_fair_by_group, pick_uniform, pick_weighted, HISTORY_PENALTY};

use std::collections::HashMap;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::CatalogEntry;
use crate::history::HistorySet;
use crate::metrics;

/// How the next song is drawn from the remaining candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Every remaining song is equally likely.
    #[default]
    Uniform,
    /// Songs from larger playlists are proportionally more likely.
    Weighted,
    /// Every playlist with songs left is equally likely, then every song within it.
    FairByGroup,
}

impl SelectionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionPolicy::Uniform => "uniform",
            SelectionPolicy::Weighted => "weighted",
            SelectionPolicy::FairByGroup => "fair_by_group",
        }
    }
}

/// Result of a selection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// A song that is not in the history.
    Selected(CatalogEntry),
    /// Every cached song is already in the history.
    Exhausted,
    /// The cache is empty; nothing to choose from.
    NoCandidates,
}

impl SelectionOutcome {
    fn label(&self) -> &'static str {
        match self {
            SelectionOutcome::Selected(_) => "selected",
            SelectionOutcome::Exhausted => "exhausted",
            SelectionOutcome::NoCandidates => "no_candidates",
        }
    }
}

/// Stateful selector: owns the random source and the last pick per cache.
pub struct Selector {
    policy: SelectionPolicy,
    avoid_last_pick: bool,
    rng: Box<dyn RngCore + Send + Sync>,
    last_picks: HashMap<String, String>,
}

impl Selector {
    /// Create a selector drawing from the operating system's CSPRNG.
    pub fn new(policy: SelectionPolicy, avoid_last_pick: bool) -> Self {
        Self::with_rng(policy, avoid_last_pick, Box::new(OsRng))
    }

    /// Create a selector with an explicit random source.
    pub fn with_rng(
        policy: SelectionPolicy,
        avoid_last_pick: bool,
        rng: Box<dyn RngCore + Send + Sync>,
    ) -> Self {
        Self {
            policy,
            avoid_last_pick,
            rng,
            last_picks: HashMap::new(),
        }
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Pick the next song from `entries` for the cache identified by `scope`.
    ///
    /// Entries whose ID is in `history` are never returned. When
    /// `avoid_last_pick` is set and at least two candidates remain, the
    /// previous pick for the same scope is left out of this draw.
    pub fn select(
        &mut self,
        scope: &str,
        entries: &[CatalogEntry],
        history: &HistorySet,
    ) -> SelectionOutcome {
        let outcome = self.select_inner(scope, entries, history);
        metrics::SELECTIONS
            .with_label_values(&[self.policy.as_str(), outcome.label()])
            .inc();
        outcome
    }

    fn select_inner(
        &mut self,
        scope: &str,
        entries: &[CatalogEntry],
        history: &HistorySet,
    ) -> SelectionOutcome {
        if entries.is_empty() {
            return SelectionOutcome::NoCandidates;
        }

        let mut candidates: Vec<&CatalogEntry> =
            entries.iter().filter(|e| !history.contains(&e.id)).collect();
        if candidates.is_empty() {
            return SelectionOutcome::Exhausted;
        }

        if self.avoid_last_pick && candidates.len() >= 2 {
            if let Some(last) = self.last_picks.get(scope) {
                candidates.retain(|e| &e.id != last);
            }
        }

        let idx = match self.policy {
            SelectionPolicy::Uniform => pick_uniform(candidates.len(), self.rng.as_mut()),
            SelectionPolicy::Weighted => {
                pick_weighted(entries, &candidates, history, self.rng.as_mut())
            }
            SelectionPolicy::FairByGroup => pick_fair_by_group(&candidates, self.rng.as_mut()),
        };

        let chosen = candidates[idx].clone();
        debug!(
            scope = %scope,
            policy = self.policy.as_str(),
            candidates = candidates.len(),
            song_id = %chosen.id,
            "Song selected"
        );
        self.last_picks.insert(scope.to_string(), chosen.id.clone());
        SelectionOutcome::Selected(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded(policy: SelectionPolicy, avoid_last_pick: bool) -> Selector {
        Selector::with_rng(
            policy,
            avoid_last_pick,
            Box::new(StdRng::seed_from_u64(7)),
        )
    }

    fn history(ids: &[&str]) -> HistorySet {
        ids.iter().map(|s| s.to_string()).collect()
    }

    const POLICIES: [SelectionPolicy; 3] = [
        SelectionPolicy::Uniform,
        SelectionPolicy::Weighted,
        SelectionPolicy::FairByGroup,
    ];

    #[test]
    fn test_default_policy_is_uniform() {
        assert_eq!(SelectionPolicy::default(), SelectionPolicy::Uniform);
    }

    #[test]
    fn test_policy_serialization() {
        let policy: SelectionPolicy = serde_json::from_str("\"fair_by_group\"").unwrap();
        assert_eq!(policy, SelectionPolicy::FairByGroup);
        assert_eq!(
            serde_json::to_string(&SelectionPolicy::Weighted).unwrap(),
            "\"weighted\""
        );
    }

    #[test]
    fn test_uniform_returns_cached_entry_with_empty_history() {
        let entries = fixtures::entries("g1", 25);
        let mut selector = Selector::new(SelectionPolicy::Uniform, false);

        for _ in 0..50 {
            match selector.select("dest", &entries, &HistorySet::new()) {
                SelectionOutcome::Selected(e) => assert!(entries.contains(&e)),
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
    }

    #[test]
    fn test_full_history_is_exhausted_for_every_policy() {
        let mut entries = fixtures::entries("g1", 3);
        entries.extend(fixtures::entries("g2", 2));
        let all: HistorySet = entries.iter().map(|e| e.id.clone()).collect();

        for policy in POLICIES {
            let mut selector = seeded(policy, true);
            assert_eq!(
                selector.select("dest", &entries, &all),
                SelectionOutcome::Exhausted
            );
        }
    }

    #[test]
    fn test_empty_cache_has_no_candidates() {
        for policy in POLICIES {
            let mut selector = seeded(policy, false);
            assert_eq!(
                selector.select("dest", &[], &HistorySet::new()),
                SelectionOutcome::NoCandidates
            );
        }
    }

    #[test]
    fn test_single_remaining_candidate_is_deterministic() {
        let entries = vec![fixtures::entry("1", "g1"), fixtures::entry("2", "g1")];
        let history = history(&["1"]);

        for policy in POLICIES {
            let mut selector = Selector::new(policy, true);
            for _ in 0..20 {
                match selector.select("dest", &entries, &history) {
                    SelectionOutcome::Selected(e) => assert_eq!(e.id, "2"),
                    other => panic!("unexpected outcome: {other:?}"),
                }
            }
        }
    }

    #[test]
    fn test_history_members_never_selected() {
        let entries = fixtures::entries("g1", 10);
        let history: HistorySet = entries[..7].iter().map(|e| e.id.clone()).collect();

        for policy in POLICIES {
            let mut selector = seeded(policy, false);
            for _ in 0..200 {
                match selector.select("dest", &entries, &history) {
                    SelectionOutcome::Selected(e) => assert!(!history.contains(&e.id)),
                    other => panic!("unexpected outcome: {other:?}"),
                }
            }
        }
    }

    #[test]
    fn test_avoid_last_pick_alternates_between_two() {
        let entries = vec![fixtures::entry("a", "g1"), fixtures::entry("b", "g1")];
        let mut selector = seeded(SelectionPolicy::Uniform, true);

        let mut previous: Option<String> = None;
        for _ in 0..20 {
            let SelectionOutcome::Selected(e) =
                selector.select("dest", &entries, &HistorySet::new())
            else {
                panic!("expected a selection");
            };
            if let Some(prev) = &previous {
                assert_ne!(prev, &e.id);
            }
            previous = Some(e.id);
        }
    }

    #[test]
    fn test_avoid_last_pick_needs_two_candidates() {
        let entries = vec![fixtures::entry("only", "g1")];
        let mut selector = seeded(SelectionPolicy::Uniform, true);

        for scope in ["a", "a", "b"] {
            assert!(matches!(
                selector.select(scope, &entries, &HistorySet::new()),
                SelectionOutcome::Selected(_)
            ));
        }
    }

    #[test]
    fn test_fair_by_group_converges_to_even_split() {
        let mut entries = fixtures::entries("small", 10);
        entries.extend(fixtures::entries("large", 1000));
        let mut selector = seeded(SelectionPolicy::FairByGroup, false);

        let draws = 4000;
        let small = (0..draws)
            .filter(|_| {
                matches!(
                    selector.select("dest", &entries, &HistorySet::new()),
                    SelectionOutcome::Selected(ref e) if e.group_id == "small"
                )
            })
            .count();

        let ratio = small as f64 / draws as f64;
        assert!((0.45..=0.55).contains(&ratio), "small group ratio {ratio}");
    }

    #[test]
    fn test_weighted_converges_to_size_ratio() {
        let mut entries = fixtures::entries("small", 10);
        entries.extend(fixtures::entries("large", 1000));
        let mut selector = seeded(SelectionPolicy::Weighted, false);

        let draws = 4000;
        let small = (0..draws)
            .filter(|_| {
                matches!(
                    selector.select("dest", &entries, &HistorySet::new()),
                    SelectionOutcome::Selected(ref e) if e.group_id == "small"
                )
            })
            .count();

        // Expected share: 10*10 / (10*10 + 1000*1000) ≈ 0.0001
        let ratio = small as f64 / draws as f64;
        assert!(ratio < 0.01, "small group ratio {ratio}");
    }
}
