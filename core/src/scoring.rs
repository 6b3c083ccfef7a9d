//! Composite scorer: contribution margin, percentile ranks, zombie and
//! performance-tier classification.
//!
//!   margin          = revenue − (fees + shipping + cogs + return_cost)
//!   cogs            = units × cost_per_unit
//!   return_cost     = returns × return_loss_ratio
//!   composite       = w_r·pct(revenue) + w_m·pct(margin) + w_v·pct(units)
//!
//! Percentile ranks are computed over every aggregated sku (see
//! `stats::percentile_ranks`). The zombie threshold is the Nth percentile of
//! composite scores within the active set (revenue > 0 or stock on hand).

use crate::{
    aggregate::ProductSummary,
    config::{MarginConfig, ZombieConfig},
    stats,
    types::Sku,
};
use serde::{Deserialize, Serialize};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarginBreakdown {
    pub revenue: f64,
    pub fees: f64,
    pub shipping_cost: f64,
    pub cogs: f64,
    pub return_cost: f64,
    pub total_costs: f64,
    pub contribution_margin: f64,
    /// `margin / revenue`, 0 without revenue.
    pub margin_pct: f64,
    /// `margin / units`, 0 without units.
    pub profit_per_unit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTier {
    MoneyLoser,
    TopPerformer,
    SolidPerformer,
    Marginal,
    PoorPerformer,
}

impl PerformanceTier {
    pub fn as_str(self) -> &'static str {
        match self {
            PerformanceTier::MoneyLoser     => "money_loser",
            PerformanceTier::TopPerformer   => "top_performer",
            PerformanceTier::SolidPerformer => "solid_performer",
            PerformanceTier::Marginal       => "marginal",
            PerformanceTier::PoorPerformer  => "poor_performer",
        }
    }
}

/// One row per sku per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub sku: Sku,
    pub product_name: Option<String>,
    pub category: Option<String>,
    pub units: f64,
    pub quantity_on_hand: f64,
    pub cost_per_unit: f64,
    pub working_capital: f64,
    pub margin: MarginBreakdown,
    // Percentile ranks in [0, 1]
    pub revenue_pct: f64,
    pub margin_rank_pct: f64,
    pub velocity_pct: f64,
    /// Weighted composite of the three ranks.
    pub composite: f64,
    /// Percentile rank of `composite` across all skus.
    pub composite_percentile: f64,
    pub tier: PerformanceTier,
    /// Eligible for zombie evaluation.
    pub active: bool,
}

impl CompositeScore {
    pub fn revenue(&self) -> f64 {
        self.margin.revenue
    }

    pub fn contribution_margin(&self) -> f64 {
        self.margin.contribution_margin
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZombieProduct {
    pub score: CompositeScore,
    pub reasons: Vec<String>,
}

impl ZombieProduct {
    pub fn sku(&self) -> &str {
        &self.score.sku
    }

    /// Reasons joined for display.
    pub fn reason(&self) -> String {
        self.reasons.join("; ")
    }
}

// ── Margin ───────────────────────────────────────────────────────────────────

pub fn contribution_margin(row: &ProductSummary, config: &MarginConfig) -> MarginBreakdown {
    let cogs = row.units * row.cost_per_unit;
    let return_cost = row.returns * config.return_loss_ratio;
    let total_costs = row.fees + row.shipping_cost + cogs + return_cost;
    let contribution_margin = row.revenue - total_costs;

    MarginBreakdown {
        revenue: row.revenue,
        fees: row.fees,
        shipping_cost: row.shipping_cost,
        cogs,
        return_cost,
        total_costs,
        contribution_margin,
        margin_pct: stats::ratio(contribution_margin, row.revenue),
        profit_per_unit: stats::ratio(contribution_margin, row.units),
    }
}

// ── Tiering ──────────────────────────────────────────────────────────────────

/// Money-loser short-circuits the percentile ladder.
pub fn performance_tier(contribution_margin: f64, margin_percentile: f64) -> PerformanceTier {
    if contribution_margin < 0.0 {
        PerformanceTier::MoneyLoser
    } else if margin_percentile >= 0.8 {
        PerformanceTier::TopPerformer
    } else if margin_percentile >= 0.5 {
        PerformanceTier::SolidPerformer
    } else if margin_percentile >= 0.2 {
        PerformanceTier::Marginal
    } else {
        PerformanceTier::PoorPerformer
    }
}

// ── Composite ────────────────────────────────────────────────────────────────

/// Score every aggregated sku. Output order follows `rows`.
pub fn composite_scores(
    rows: &[ProductSummary],
    zombie: &ZombieConfig,
    margin_config: &MarginConfig,
) -> Vec<CompositeScore> {
    let margins: Vec<MarginBreakdown> = rows
        .iter()
        .map(|r| contribution_margin(r, margin_config))
        .collect();

    let revenue: Vec<f64> = rows.iter().map(|r| r.revenue).collect();
    let margin: Vec<f64> = margins.iter().map(|m| m.contribution_margin).collect();
    let velocity: Vec<f64> = rows.iter().map(|r| r.units).collect();

    let revenue_pct = stats::percentile_ranks(&revenue);
    let margin_pct = stats::percentile_ranks(&margin);
    let velocity_pct = stats::percentile_ranks(&velocity);

    let w = &zombie.weights;
    let composite: Vec<f64> = (0..rows.len())
        .map(|i| w.revenue * revenue_pct[i] + w.margin * margin_pct[i] + w.velocity * velocity_pct[i])
        .collect();
    let composite_pct = stats::percentile_ranks(&composite);

    rows.iter()
        .zip(margins)
        .enumerate()
        .map(|(i, (row, breakdown))| CompositeScore {
            sku: row.sku.clone(),
            product_name: row.product_name.clone(),
            category: row.category.clone(),
            units: row.units,
            quantity_on_hand: row.quantity_on_hand,
            cost_per_unit: row.cost_per_unit,
            working_capital: row.inventory_value(),
            tier: performance_tier(breakdown.contribution_margin, margin_pct[i]),
            margin: breakdown,
            revenue_pct: revenue_pct[i],
            margin_rank_pct: margin_pct[i],
            velocity_pct: velocity_pct[i],
            composite: composite[i],
            composite_percentile: composite_pct[i],
            active: row.revenue > 0.0 || row.quantity_on_hand > 0.0,
        })
        .collect()
}

/// Nth percentile of composite scores over the active set, `None` when no
/// sku is active.
pub fn zombie_threshold(scores: &[CompositeScore], threshold_percentile: f64) -> Option<f64> {
    let active: Vec<f64> = scores
        .iter()
        .filter(|s| s.active)
        .map(|s| s.composite)
        .collect();
    if active.is_empty() {
        return None;
    }
    Some(stats::percentile(&active, threshold_percentile))
}

/// Active skus at or below the zombie threshold, worst composite first.
pub fn find_zombies(scores: &[CompositeScore], config: &ZombieConfig) -> Vec<ZombieProduct> {
    let Some(threshold) = zombie_threshold(scores, config.threshold_percentile) else {
        return Vec::new();
    };

    let mut zombies: Vec<ZombieProduct> = scores
        .iter()
        .filter(|s| s.active && s.composite <= threshold)
        .map(|s| ZombieProduct {
            reasons: zombie_reasons(s, config),
            score: s.clone(),
        })
        .collect();
    zombies.sort_by(|a, b| a.score.composite.total_cmp(&b.score.composite));

    log::debug!(
        "Zombie threshold {:.4} at p{}: {} of {} skus",
        threshold,
        config.threshold_percentile,
        zombies.len(),
        scores.len()
    );
    zombies
}

/// Independent rules, evaluated in fixed order and concatenated.
pub fn zombie_reasons(score: &CompositeScore, config: &ZombieConfig) -> Vec<String> {
    let mut reasons = Vec::new();
    let revenue = score.revenue();
    let margin = &score.margin;

    if revenue == 0.0 {
        reasons.push("No revenue");
    } else if revenue < config.very_low_revenue_floor {
        reasons.push("Very low revenue");
    }

    if margin.contribution_margin < 0.0 {
        reasons.push("Negative profit");
    } else if margin.margin_pct < config.low_margin_ratio {
        reasons.push("Low profit margin");
    }

    if score.units == 0.0 {
        reasons.push("No units sold");
    } else if score.units < config.very_low_units {
        reasons.push("Very slow moving");
    }

    if score.quantity_on_hand > 0.0 && score.units == 0.0 {
        reasons.push("Dead inventory");
    }

    if reasons.is_empty() {
        reasons.push("Bottom performer");
    }
    reasons.into_iter().map(String::from).collect()
}

/// Ranked by contribution margin, best first. Ties keep input order.
pub fn rank_by_margin(scores: &[CompositeScore]) -> Vec<CompositeScore> {
    let mut ranked = scores.to_vec();
    ranked.sort_by(|a, b| b.contribution_margin().total_cmp(&a.contribution_margin()));
    ranked
}
