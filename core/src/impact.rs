//! Financial impact estimator: derived money figures for recommendations.
//!
//! These are projections built on configured business assumptions
//! (annualization multiplier, bundle discount and conversion rate,
//! consolidation cost reduction), not measured outcomes.

use crate::{
    config::{BundleConfig, CannibalizationConfig, ImpactConfig},
    scoring::ZombieProduct,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscontinuationImpact {
    pub working_capital_freed: f64,
    pub annual_revenue_lost: f64,
    pub annual_profit_lost: f64,
    /// Capital freed minus annual profit lost.
    pub net_benefit: f64,
}

pub fn discontinuation_impact(zombies: &[ZombieProduct], config: &ImpactConfig) -> DiscontinuationImpact {
    let working_capital_freed: f64 = zombies.iter().map(|z| z.score.working_capital).sum();
    let revenue: f64 = zombies.iter().map(|z| z.score.revenue()).sum();
    let profit: f64 = zombies.iter().map(|z| z.score.contribution_margin()).sum();

    let annual_revenue_lost = revenue * config.annualization_multiplier;
    let annual_profit_lost = profit * config.annualization_multiplier;

    DiscontinuationImpact {
        working_capital_freed,
        annual_revenue_lost,
        annual_profit_lost,
        net_benefit: working_capital_freed - annual_profit_lost,
    }
}

/// Discounted price of the bundle, from the pair's historical revenue.
pub fn bundle_price(revenue_a: f64, revenue_b: f64, config: &BundleConfig) -> f64 {
    (revenue_a + revenue_b) * (1.0 - config.discount)
}

/// Expected bundle revenue: price × co-viewing sessions × conversion rate.
pub fn bundle_potential_revenue(revenue_a: f64, revenue_b: f64, co_views: usize, config: &BundleConfig) -> f64 {
    bundle_price(revenue_a, revenue_b, config) * expected_conversions(co_views, config)
}

pub fn expected_conversions(co_views: usize, config: &BundleConfig) -> f64 {
    co_views as f64 * config.conversion_rate
}

/// Savings expected from consolidating cannibalizing pairs.
pub fn consolidation_savings(revenue_at_risk: f64, config: &CannibalizationConfig) -> f64 {
    revenue_at_risk * config.consolidation_cost_reduction
}
