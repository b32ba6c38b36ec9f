//! Subset-sum search used by the weight balancing pass.
//!
//! Given the item weights of the heavier package and the weight difference
//! between the two packages, find the subset whose total is closest to half
//! that difference. Distances are measured in half grams
//! (`|2 * total - difference|`) so an odd difference keeps its exact
//! midpoint. Small
//! packages are searched exhaustively; larger ones fall back to a bounded
//! dynamic program over gram buckets (still exact) and, beyond that, to a
//! greedy approximation.

use serde::Serialize;
use utoipa::ToSchema;

use crate::types::Grams;

/// Hard ceiling for exhaustive enumeration, independent of configuration.
pub const MAX_EXHAUSTIVE_ITEMS: usize = 30;

/// Bounds deciding which search strategy runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchBounds {
    /// Packages with at most this many items are enumerated exhaustively.
    pub exact_item_limit: usize,
    /// Packages weighing at most this many grams use the dynamic program.
    pub dp_weight_limit: Grams,
}

impl SearchBounds {
    pub const DEFAULT_EXACT_ITEM_LIMIT: usize = 20;
    pub const DEFAULT_DP_WEIGHT_LIMIT: Grams = 1_000_000;
}

impl Default for SearchBounds {
    fn default() -> Self {
        Self {
            exact_item_limit: Self::DEFAULT_EXACT_ITEM_LIMIT,
            dp_weight_limit: Self::DEFAULT_DP_WEIGHT_LIMIT,
        }
    }
}

/// How a subset was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubsetStrategy {
    Exhaustive,
    DynamicProgramming,
    Greedy,
}

impl SubsetStrategy {
    /// Whether the chosen subset is guaranteed to be closest to the target.
    pub fn is_exact(&self) -> bool {
        !matches!(self, SubsetStrategy::Greedy)
    }
}

/// Result of a subset search.
///
/// # Fields
/// * `indices` - Positions into the searched weight slice, ascending
/// * `total` - Sum of the selected weights
/// * `strategy` - Search that produced the subset
#[derive(Clone, Debug, PartialEq)]
pub struct SubsetChoice {
    pub indices: Vec<usize>,
    pub total: Grams,
    pub strategy: SubsetStrategy,
}

impl SubsetChoice {
    /// Distance in half grams between the subset total and `difference / 2`.
    pub fn doubled_distance(&self, difference: Grams) -> Grams {
        doubled_distance(self.total, difference)
    }
}

fn doubled_distance(total: Grams, difference: Grams) -> Grams {
    total.saturating_mul(2).abs_diff(difference)
}

/// Finds the subset of `weights` whose sum is closest to `difference / 2`.
pub fn closest_subset(
    weights: &[Grams],
    difference: Grams,
    bounds: &SearchBounds,
) -> SubsetChoice {
    let exhaustive_limit = bounds.exact_item_limit.min(MAX_EXHAUSTIVE_ITEMS);
    if weights.len() <= exhaustive_limit {
        return exhaustive(weights, difference);
    }

    let total = weights.iter().fold(0, |acc: Grams, &w| acc.saturating_add(w));
    if total <= bounds.dp_weight_limit {
        return dynamic(weights, difference, total);
    }

    greedy(weights, difference)
}

/// Enumerates every subset.
///
/// Subsets are visited in the order they arise when each item is folded in
/// against all previously built subsets, starting from the empty set. That
/// order equals counting through bit masks, where bit `i` selects item `i`.
/// The first subset reaching a new minimum distance wins.
fn exhaustive(weights: &[Grams], difference: Grams) -> SubsetChoice {
    let mut best_mask: u64 = 0;
    let mut best_total: Grams = 0;
    let mut best_diff = difference;

    for mask in 1..(1u64 << weights.len()) {
        if best_diff == 0 {
            break;
        }
        let mut remaining = mask;
        let mut total: Grams = 0;
        while remaining != 0 {
            total += weights[remaining.trailing_zeros() as usize];
            remaining &= remaining - 1;
        }
        let diff = doubled_distance(total, difference);
        if diff < best_diff {
            best_diff = diff;
            best_mask = mask;
            best_total = total;
        }
    }

    SubsetChoice {
        indices: (0..weights.len())
            .filter(|&i| best_mask & (1u64 << i) != 0)
            .collect(),
        total: best_total,
        strategy: SubsetStrategy::Exhaustive,
    }
}

/// 0/1 reachability over every gram total up to `total`.
///
/// `via[s]` records the item that first made `s` reachable; walking back
/// through it yields strictly decreasing item indices.
fn dynamic(weights: &[Grams], difference: Grams, total: Grams) -> SubsetChoice {
    let size = total as usize + 1;
    let mut reachable = vec![false; size];
    let mut via: Vec<Option<usize>> = vec![None; size];
    reachable[0] = true;

    for (idx, &w) in weights.iter().enumerate() {
        // Zero-weight items never change a total.
        if w == 0 {
            continue;
        }
        let w = w as usize;
        for s in (w..size).rev() {
            if !reachable[s] && reachable[s - w] {
                reachable[s] = true;
                via[s] = Some(idx);
            }
        }
    }

    // Ties go to the lighter total.
    let best = (0..size)
        .filter(|&s| reachable[s])
        .min_by_key(|&s| (doubled_distance(s as Grams, difference), s))
        .unwrap_or(0);

    let mut indices = Vec::new();
    let mut s = best;
    while let Some(idx) = via[s] {
        indices.push(idx);
        s -= weights[idx] as usize;
    }
    indices.sort_unstable();

    SubsetChoice {
        indices,
        total: best as Grams,
        strategy: SubsetStrategy::DynamicProgramming,
    }
}

/// Heaviest-first approximation: take an item whenever it brings the running
/// total closer to the target.
fn greedy(weights: &[Grams], difference: Grams) -> SubsetChoice {
    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.sort_by(|&a, &b| weights[b].cmp(&weights[a]));

    let mut total: Grams = 0;
    let mut indices = Vec::new();
    for idx in order {
        let candidate = total.saturating_add(weights[idx]);
        if doubled_distance(candidate, difference) < doubled_distance(total, difference) {
            total = candidate;
            indices.push(idx);
        }
    }
    indices.sort_unstable();

    SubsetChoice {
        indices,
        total,
        strategy: SubsetStrategy::Greedy,
    }
}
