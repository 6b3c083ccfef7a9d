//! Cannibalization detection: skus bought by nearly the same customers.
//!
//! Overlap is the Jaccard similarity of the two buyer sets. For a retained
//! pair the stronger sku is the higher earner; revenue at risk is the
//! smaller of the two revenues.

use crate::{
    aggregate::AggregatedData,
    analyzer::{insert, money, percent, AnalysisContext, AnalysisKind, AnalysisReport, Analyzer, Summary},
    error::MerchResult,
    impact,
    pairwise::{self, PairwiseStat},
    recommendation::Recommendation,
    stats,
    types::{Priority, Sku},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CannibalizationPair {
    pub overlap: PairwiseStat,
    pub revenue_a: f64,
    pub revenue_b: f64,
    pub units_a: f64,
    pub units_b: f64,
    pub stronger_sku: Sku,
    pub weaker_sku: Sku,
    pub revenue_at_risk: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CannibalizationImpact {
    pub total_revenue_at_risk: f64,
    pub average_overlap: f64,
    pub potential_consolidation_savings: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CannibalizationReport {
    /// Every evaluated pair, canonical order.
    pub overlap_matrix: Vec<PairwiseStat>,
    /// Pairs at or above the overlap threshold, strongest overlap first.
    pub cannibalization_pairs: Vec<CannibalizationPair>,
    pub impact: CannibalizationImpact,
    pub recommendations: Vec<Recommendation>,
    pub summary: Summary,
}

impl CannibalizationReport {
    pub fn skus(&self) -> BTreeSet<Sku> {
        self.overlap_matrix
            .iter()
            .flat_map(|p| [p.sku_a.clone(), p.sku_b.clone()])
            .collect()
    }
}

/// Attach revenue to an overlap stat and pick the stronger side. Ties go to
/// `sku_a`.
pub fn cannibalization_pair(overlap: PairwiseStat, data: &AggregatedData) -> CannibalizationPair {
    let (revenue_a, units_a) = data.get(&overlap.sku_a).map_or((0.0, 0.0), |r| (r.revenue, r.units));
    let (revenue_b, units_b) = data.get(&overlap.sku_b).map_or((0.0, 0.0), |r| (r.revenue, r.units));

    let (stronger_sku, weaker_sku) = if revenue_a >= revenue_b {
        (overlap.sku_a.clone(), overlap.sku_b.clone())
    } else {
        (overlap.sku_b.clone(), overlap.sku_a.clone())
    };

    CannibalizationPair {
        revenue_at_risk: revenue_a.min(revenue_b),
        overlap,
        revenue_a,
        revenue_b,
        units_a,
        units_b,
        stronger_sku,
        weaker_sku,
    }
}

pub struct CannibalizationAnalyzer;

impl Analyzer for CannibalizationAnalyzer {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::Cannibalization
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> MerchResult<AnalysisReport> {
        let config = &ctx.config.cannibalization;
        let matrix = pairwise::customer_overlaps(&ctx.snapshot.purchases, config.min_support, ctx.config.parallel);

        let pairs: Vec<CannibalizationPair> = pairwise::retain_above(&matrix, config.overlap_threshold)
            .into_iter()
            .map(|stat| cannibalization_pair(stat, ctx.aggregated))
            .collect();

        let total_revenue_at_risk: f64 = pairs.iter().map(|p| p.revenue_at_risk).sum();
        let overlaps: Vec<f64> = pairs.iter().map(|p| p.overlap.value).collect();
        let impact = CannibalizationImpact {
            total_revenue_at_risk,
            average_overlap: stats::mean(&overlaps).unwrap_or(0.0),
            potential_consolidation_savings: impact::consolidation_savings(total_revenue_at_risk, config),
        };

        let mut summary = Summary::new();
        insert(&mut summary, "total_pairs_analyzed", matrix.len() as f64);
        insert(&mut summary, "cannibalization_pairs_count", pairs.len() as f64);
        insert(
            &mut summary,
            "high_risk_pairs",
            pairs.iter().filter(|p| p.overlap.value >= config.high_priority_overlap).count() as f64,
        );

        let recommendations = recommendations(&pairs, &impact, ctx);

        Ok(AnalysisReport::Cannibalization(CannibalizationReport {
            overlap_matrix: matrix,
            cannibalization_pairs: pairs,
            impact,
            recommendations,
            summary,
        }))
    }
}

fn recommendations(
    pairs: &[CannibalizationPair],
    impact: &CannibalizationImpact,
    ctx: &AnalysisContext<'_>,
) -> Vec<Recommendation> {
    if pairs.is_empty() {
        return Vec::new();
    }
    let config = &ctx.config.cannibalization;

    let involved: BTreeSet<Sku> = pairs
        .iter()
        .flat_map(|p| [p.overlap.sku_a.clone(), p.overlap.sku_b.clone()])
        .collect();
    let mut recs = vec![Recommendation::new(
        "cannibalization_warning",
        Priority::High,
        format!("Review {} product pairs with high customer overlap", pairs.len()),
        format!("{} revenue at risk", money(impact.total_revenue_at_risk)),
        "Consider consolidating, differentiating, or repositioning these products",
    )
    .for_skus(involved)];

    for pair in pairs.iter().take(ctx.config.report.max_listed) {
        let priority = if pair.overlap.value >= config.high_priority_overlap {
            Priority::High
        } else {
            Priority::Medium
        };
        recs.push(
            Recommendation::new(
                "cannibalization_pair",
                priority,
                format!(
                    "Consider consolidating {} into {}",
                    pair.weaker_sku, pair.stronger_sku
                ),
                format!("{} customer overlap", percent(pair.overlap.value)),
                format!(
                    "{} revenue at risk. {} outsells {}",
                    money(pair.revenue_at_risk),
                    ctx.aggregated.display_name(&pair.stronger_sku),
                    ctx.aggregated.display_name(&pair.weaker_sku)
                ),
            )
            .for_skus([pair.stronger_sku.clone(), pair.weaker_sku.clone()]),
        );
    }
    recs
}
