//! Bundle opportunities: skus viewed together in the same sessions.
//!
//! Candidates are pairs whose view correlation reaches the threshold,
//! ordered by correlation, then by the pair's combined revenue.

use crate::{
    aggregate::AggregatedData,
    analyzer::{insert, money, percent, AnalysisContext, AnalysisKind, AnalysisReport, Analyzer, Summary},
    config::BundleConfig,
    error::MerchResult,
    impact,
    pairwise::{self, PairwiseStat},
    recommendation::Recommendation,
    types::{Priority, Sku},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleOpportunity {
    pub correlation: PairwiseStat,
    pub revenue_a: f64,
    pub revenue_b: f64,
    pub combined_revenue: f64,
    pub bundle_price: f64,
    pub potential_revenue: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundlePotential {
    pub total_potential_revenue: f64,
    pub estimated_bundle_conversions: f64,
    pub average_bundle_discount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleReport {
    /// Every evaluated pair, canonical order.
    pub view_correlations: Vec<PairwiseStat>,
    pub bundle_opportunities: Vec<BundleOpportunity>,
    pub bundle_potential: BundlePotential,
    pub recommendations: Vec<Recommendation>,
    pub summary: Summary,
}

impl BundleReport {
    pub fn skus(&self) -> BTreeSet<Sku> {
        self.view_correlations
            .iter()
            .flat_map(|p| [p.sku_a.clone(), p.sku_b.clone()])
            .collect()
    }
}

pub fn bundle_opportunity(correlation: PairwiseStat, data: &AggregatedData, config: &BundleConfig) -> BundleOpportunity {
    let revenue_a = data.revenue_of(&correlation.sku_a);
    let revenue_b = data.revenue_of(&correlation.sku_b);
    BundleOpportunity {
        combined_revenue: revenue_a + revenue_b,
        bundle_price: impact::bundle_price(revenue_a, revenue_b, config),
        potential_revenue: impact::bundle_potential_revenue(revenue_a, revenue_b, correlation.co_occurrence, config),
        correlation,
        revenue_a,
        revenue_b,
    }
}

/// Correlation descending, then combined revenue descending. Stable.
pub fn rank_opportunities(opportunities: &mut [BundleOpportunity]) {
    opportunities.sort_by(|a, b| {
        b.correlation
            .value
            .total_cmp(&a.correlation.value)
            .then_with(|| b.combined_revenue.total_cmp(&a.combined_revenue))
    });
}

pub struct BundleFinderAnalyzer;

impl Analyzer for BundleFinderAnalyzer {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::BundleOpportunities
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> MerchResult<AnalysisReport> {
        let config = &ctx.config.bundle;
        let correlations = pairwise::view_correlations(&ctx.snapshot.views, config.min_support, ctx.config.parallel);

        let mut opportunities: Vec<BundleOpportunity> = correlations
            .iter()
            .filter(|s| s.value >= config.correlation_threshold)
            .cloned()
            .map(|stat| bundle_opportunity(stat, ctx.aggregated, config))
            .collect();
        rank_opportunities(&mut opportunities);

        let potential = BundlePotential {
            total_potential_revenue: opportunities.iter().map(|o| o.potential_revenue).sum(),
            estimated_bundle_conversions: opportunities
                .iter()
                .map(|o| impact::expected_conversions(o.correlation.co_occurrence, config))
                .sum(),
            average_bundle_discount: if opportunities.is_empty() { 0.0 } else { config.discount },
        };

        let mut summary = Summary::new();
        insert(&mut summary, "opportunities_count", opportunities.len() as f64);
        insert(
            &mut summary,
            "high_potential_bundles",
            opportunities.iter().filter(|o| o.potential_revenue > 0.0).count() as f64,
        );
        insert(&mut summary, "total_pairs_analyzed", correlations.len() as f64);

        let recommendations = recommendations(&opportunities, &potential, ctx);

        Ok(AnalysisReport::BundleOpportunities(BundleReport {
            view_correlations: correlations,
            bundle_opportunities: opportunities,
            bundle_potential: potential,
            recommendations,
            summary,
        }))
    }
}

fn recommendations(
    opportunities: &[BundleOpportunity],
    potential: &BundlePotential,
    ctx: &AnalysisContext<'_>,
) -> Vec<Recommendation> {
    if opportunities.is_empty() {
        return Vec::new();
    }

    let involved: BTreeSet<Sku> = opportunities
        .iter()
        .flat_map(|o| [o.correlation.sku_a.clone(), o.correlation.sku_b.clone()])
        .collect();
    let mut recs = vec![Recommendation::new(
        "bundle_opportunity",
        Priority::Medium,
        format!("Create {} product bundles", opportunities.len()),
        format!("Potential {} additional revenue", money(potential.total_potential_revenue)),
        format!(
            "Bundles offered at {} discount to products frequently viewed together",
            percent(ctx.config.bundle.discount)
        ),
    )
    .for_skus(involved)];

    for opp in opportunities.iter().take(ctx.config.report.max_listed) {
        let (a, b) = (&opp.correlation.sku_a, &opp.correlation.sku_b);
        recs.push(
            Recommendation::new(
                "create_bundle",
                Priority::Medium,
                format!(
                    "Bundle {} + {}",
                    ctx.aggregated.display_name(a),
                    ctx.aggregated.display_name(b)
                ),
                format!("Bundle price {}", money(opp.bundle_price)),
                format!(
                    "{} view correlation, {} sessions viewed both",
                    percent(opp.correlation.value),
                    opp.correlation.co_occurrence
                ),
            )
            .for_skus([a.clone(), b.clone()]),
        );
    }
    recs
}
