//! Index-drawing functions behind each selection policy.
//!
//! All draws go through `Rng::gen_range`, which maps raw random bits onto
//! `[0, n)` without the low-index bias of `floor(random() * n)`.

use std::collections::HashMap;

use rand::Rng;

use crate::catalog::CatalogEntry;
use crate::history::HistorySet;

/// Weight multiplier for entries already in the history.
///
/// Callers pre-filter history members, so this only applies if weighting is
/// ever run over an unfiltered candidate list.
pub const HISTORY_PENALTY: f64 = 0.1;

/// Draw an index uniformly from `0..len`. `len` must be non-zero.
pub fn pick_uniform<R: Rng + ?Sized>(len: usize, rng: &mut R) -> usize {
    rng.gen_range(0..len)
}

/// Draw a candidate index weighted by the size of its playlist.
///
/// Weights are counted over `all` (the unfiltered cache) so a playlist keeps
/// its pull even as its songs are used up. Falls back to a uniform draw if
/// floating-point rounding leaves the walk without a pick.
pub fn pick_weighted<R: Rng + ?Sized>(
    all: &[CatalogEntry],
    candidates: &[&CatalogEntry],
    history: &HistorySet,
    rng: &mut R,
) -> usize {
    let mut group_sizes: HashMap<&str, usize> = HashMap::new();
    for entry in all {
        *group_sizes.entry(entry.group_id.as_str()).or_default() += 1;
    }

    let weights: Vec<f64> = candidates
        .iter()
        .map(|e| {
            let base = group_sizes.get(e.group_id.as_str()).copied().unwrap_or(1) as f64;
            if history.contains(&e.id) {
                base * HISTORY_PENALTY
            } else {
                base
            }
        })
        .collect();

    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return pick_uniform(candidates.len(), rng);
    }

    let mut remaining = rng.gen_range(0.0..total);
    for (idx, weight) in weights.iter().enumerate() {
        remaining -= weight;
        if remaining <= 0.0 {
            return idx;
        }
    }

    pick_uniform(candidates.len(), rng)
}

/// Draw a playlist uniformly among those with candidates, then a song within it.
pub fn pick_fair_by_group<R: Rng + ?Sized>(candidates: &[&CatalogEntry], rng: &mut R) -> usize {
    // Groups keep first-appearance order so seeded draws are reproducible.
    let mut order: Vec<&str> = Vec::new();
    let mut members: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, entry) in candidates.iter().enumerate() {
        let key = entry.group_id.as_str();
        members
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(idx);
    }

    let group = order[pick_uniform(order.len(), rng)];
    let in_group = &members[group];
    in_group[pick_uniform(in_group.len(), rng)]
}
