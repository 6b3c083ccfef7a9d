//! Pairwise relationship engine: co-occurrence statistics over sku pairs.
//!
//! Two metrics share one shape:
//!   - view correlation: mean of the two directional containment rates of
//!     session-level view presence, `(co/support_a + co/support_b) / 2`.
//!     This is not a Pearson coefficient; the bundle threshold was
//!     calibrated against exactly this definition.
//!   - customer overlap: Jaccard similarity of the buyer sets,
//!     `co / (support_a + support_b - co)`.
//!
//! SCALING: building the presence index is O(groups × skus); pair
//! evaluation is O(K²) for K skus with enough support. `min_support` drops
//! thin skus before pairing. Results for pairs above the cutoff are
//! unchanged by pruning.

use crate::{
    snapshot::{PurchaseEvent, ViewEvent},
    types::Sku,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Statistic for one unordered pair. `sku_a < sku_b` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseStat {
    pub sku_a: Sku,
    pub sku_b: Sku,
    /// Groups (sessions or customers) containing `sku_a`.
    pub support_a: usize,
    /// Groups containing `sku_b`.
    pub support_b: usize,
    /// Groups containing both.
    pub co_occurrence: usize,
    /// Metric value in `[0, 1]`.
    pub value: f64,
}

impl PairwiseStat {
    /// Share of `sku_a` groups that also contain `sku_b`.
    pub fn rate_a_to_b(&self) -> f64 {
        crate::stats::ratio(self.co_occurrence as f64, self.support_a as f64)
    }

    /// Share of `sku_b` groups that also contain `sku_a`.
    pub fn rate_b_to_a(&self) -> f64 {
        crate::stats::ratio(self.co_occurrence as f64, self.support_b as f64)
    }

    pub fn involves(&self, sku: &str) -> bool {
        self.sku_a == sku || self.sku_b == sku
    }
}

/// Binary group × sku presence, stored as a sorted group list per sku.
#[derive(Debug, Clone, Default)]
pub struct PresenceIndex {
    skus: Vec<Sku>,
    groups: Vec<Vec<u32>>,
    group_count: usize,
}

impl PresenceIndex {
    /// Build from `(group_key, sku)` observations. Repeats collapse to a
    /// single presence bit.
    pub fn build<'a, I>(observations: I) -> Self
    where
        I: IntoIterator<Item = (String, &'a str)>,
    {
        let mut group_ids: HashMap<String, u32> = HashMap::new();
        let mut by_sku: BTreeMap<Sku, BTreeSet<u32>> = BTreeMap::new();

        for (group, sku) in observations {
            if sku.is_empty() {
                continue;
            }
            let next_id = group_ids.len() as u32;
            let id = *group_ids.entry(group).or_insert(next_id);
            by_sku.entry(sku.to_string()).or_default().insert(id);
        }

        let (skus, groups): (Vec<Sku>, Vec<Vec<u32>>) = by_sku
            .into_iter()
            .map(|(sku, set)| (sku, set.into_iter().collect::<Vec<_>>()))
            .unzip();

        Self {
            skus,
            groups,
            group_count: group_ids.len(),
        }
    }

    pub fn sku_count(&self) -> usize {
        self.skus.len()
    }

    pub fn group_count(&self) -> usize {
        self.group_count
    }

    /// Number of groups containing `sku`.
    pub fn support(&self, sku: &str) -> usize {
        self.skus
            .binary_search_by(|s| s.as_str().cmp(sku))
            .map(|i| self.groups[i].len())
            .unwrap_or(0)
    }

    /// Evaluate `metric` over every unordered pair of skus whose support is
    /// at least `min_support`. Pairs where `metric` returns `None` are
    /// skipped. Output is in canonical (sku_a, sku_b) order.
    pub fn pairs<F>(&self, min_support: usize, parallel: bool, metric: F) -> Vec<PairwiseStat>
    where
        F: Fn(usize, usize, usize) -> Option<f64> + Sync,
    {
        let eligible: Vec<usize> = (0..self.skus.len())
            .filter(|&i| self.groups[i].len() >= min_support.max(1))
            .collect();

        let pairs_for = |pos: usize| -> Vec<PairwiseStat> {
            let i = eligible[pos];
            eligible[pos + 1..]
                .iter()
                .filter_map(|&j| {
                    let support_a = self.groups[i].len();
                    let support_b = self.groups[j].len();
                    let co = intersection_len(&self.groups[i], &self.groups[j]);
                    metric(support_a, support_b, co).map(|value| PairwiseStat {
                        sku_a: self.skus[i].clone(),
                        sku_b: self.skus[j].clone(),
                        support_a,
                        support_b,
                        co_occurrence: co,
                        value,
                    })
                })
                .collect()
        };

        if parallel {
            (0..eligible.len()).into_par_iter().flat_map_iter(pairs_for).collect()
        } else {
            (0..eligible.len()).flat_map(pairs_for).collect()
        }
    }
}

fn intersection_len(a: &[u32], b: &[u32]) -> usize {
    let (mut i, mut j, mut n) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                n += 1;
                i += 1;
                j += 1;
            }
        }
    }
    n
}

/// Symmetric average containment. `None` when either side has no support.
pub fn containment_correlation(support_a: usize, support_b: usize, co: usize) -> Option<f64> {
    if support_a == 0 || support_b == 0 {
        return None;
    }
    let a_to_b = co as f64 / support_a as f64;
    let b_to_a = co as f64 / support_b as f64;
    Some((a_to_b + b_to_a) / 2.0)
}

/// Jaccard similarity. `None` when the union is empty.
pub fn jaccard(support_a: usize, support_b: usize, co: usize) -> Option<f64> {
    let union = support_a + support_b - co;
    if union == 0 {
        return None;
    }
    Some(co as f64 / union as f64)
}

/// Session × sku presence from view events.
pub fn view_index(views: &[ViewEvent]) -> PresenceIndex {
    PresenceIndex::build(views.iter().map(|v| (v.session_key(), v.sku.as_str())))
}

/// Customer × sku presence from purchase events.
pub fn purchase_index(purchases: &[PurchaseEvent]) -> PresenceIndex {
    PresenceIndex::build(
        purchases
            .iter()
            .filter(|p| !p.customer_id.is_empty())
            .map(|p| (p.customer_id.clone(), p.sku.as_str())),
    )
}

/// View correlation for every pair with support on both sides.
pub fn view_correlations(views: &[ViewEvent], min_support: usize, parallel: bool) -> Vec<PairwiseStat> {
    let index = view_index(views);
    let stats = index.pairs(min_support, parallel, containment_correlation);
    log::debug!(
        "View correlation: {} sessions, {} skus, {} pairs",
        index.group_count(),
        index.sku_count(),
        stats.len()
    );
    stats
}

/// Customer overlap for every pair with a non-empty buyer union.
pub fn customer_overlaps(
    purchases: &[PurchaseEvent],
    min_support: usize,
    parallel: bool,
) -> Vec<PairwiseStat> {
    let index = purchase_index(purchases);
    let stats = index.pairs(min_support, parallel, jaccard);
    log::debug!(
        "Customer overlap: {} customers, {} skus, {} pairs",
        index.group_count(),
        index.sku_count(),
        stats.len()
    );
    stats
}

/// Keep pairs at or above `threshold`, strongest first. The sort is stable,
/// so equal values keep canonical pair order.
pub fn retain_above(stats: &[PairwiseStat], threshold: f64) -> Vec<PairwiseStat> {
    let mut kept: Vec<PairwiseStat> = stats
        .iter()
        .filter(|s| s.value >= threshold)
        .cloned()
        .collect();
    kept.sort_by(|a, b| b.value.total_cmp(&a.value));
    kept
}
