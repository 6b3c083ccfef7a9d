//! SKU rationalization: zombie detection and discontinuation impact.
//!
//! A zombie is an active sku (revenue > 0 or stock on hand) whose composite
//! score sits at or below the configured bottom percentile of active skus.

use crate::{
    analyzer::{insert, money, AnalysisContext, AnalysisKind, AnalysisReport, Analyzer, Summary},
    error::MerchResult,
    impact::{self, DiscontinuationImpact},
    recommendation::Recommendation,
    scoring::{self, CompositeScore, ZombieProduct},
    types::{Priority, Sku},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkuRationalizationReport {
    pub metrics: Vec<CompositeScore>,
    pub zombie_threshold: Option<f64>,
    /// Worst composite first.
    pub zombie_skus: Vec<ZombieProduct>,
    pub financial_impact: DiscontinuationImpact,
    pub recommendations: Vec<Recommendation>,
    pub summary: Summary,
}

impl SkuRationalizationReport {
    pub fn skus(&self) -> BTreeSet<Sku> {
        self.metrics.iter().map(|m| m.sku.clone()).collect()
    }

    pub fn zombie_skus(&self) -> Vec<Sku> {
        self.zombie_skus.iter().map(|z| z.score.sku.clone()).collect()
    }
}

pub struct SkuRationalizationAnalyzer;

impl Analyzer for SkuRationalizationAnalyzer {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::SkuRationalization
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> MerchResult<AnalysisReport> {
        let config = &ctx.config.zombie;
        let zombies = scoring::find_zombies(ctx.scores, config);
        let threshold = scoring::zombie_threshold(ctx.scores, config.threshold_percentile);
        let financial_impact = impact::discontinuation_impact(&zombies, &ctx.config.impact);
        let recommendations = recommendations(&zombies, &financial_impact, ctx);

        let mut summary = Summary::new();
        insert(&mut summary, "total_zombies", zombies.len() as f64);
        insert(&mut summary, "capital_freed", financial_impact.working_capital_freed);
        insert(&mut summary, "bottom_percentile", config.threshold_percentile);
        insert(
            &mut summary,
            "active_skus",
            ctx.scores.iter().filter(|s| s.active).count() as f64,
        );

        Ok(AnalysisReport::SkuRationalization(SkuRationalizationReport {
            metrics: ctx.scores.to_vec(),
            zombie_threshold: threshold,
            zombie_skus: zombies,
            financial_impact,
            recommendations,
            summary,
        }))
    }
}

fn recommendations(
    zombies: &[ZombieProduct],
    impact: &DiscontinuationImpact,
    ctx: &AnalysisContext<'_>,
) -> Vec<Recommendation> {
    if zombies.is_empty() {
        return Vec::new();
    }

    let mut recs = vec![Recommendation::new(
        "discontinue",
        Priority::High,
        format!("Discontinue {} zombie SKUs", zombies.len()),
        format!("Free {} in working capital", money(impact.working_capital_freed)),
        format!(
            "Bottom {}% of SKUs identified for discontinuation",
            ctx.config.zombie.threshold_percentile
        ),
    )
    .for_skus(zombies.iter().map(|z| z.sku().to_string()))];

    for zombie in zombies.iter().take(ctx.config.report.max_listed) {
        recs.push(
            Recommendation::new(
                "discontinue_sku",
                Priority::High,
                format!("Discontinue SKU: {}", zombie.sku()),
                format!("Free {} capital", money(zombie.score.working_capital)),
                format!(
                    "{} - Revenue: {}, Profit: {}",
                    zombie.reason(),
                    money(zombie.score.revenue()),
                    money(zombie.score.contribution_margin())
                ),
            )
            .for_skus([zombie.sku()]),
        );
    }
    recs
}
