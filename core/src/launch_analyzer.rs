//! New product scoring: launches graded against the historical launch curve.

use crate::{
    analyzer::{insert, percent, AnalysisContext, AnalysisKind, AnalysisReport, Analyzer, Summary},
    benchmark::{self, LaunchCategory, LaunchScore, NewProduct, WindowBenchmark},
    error::MerchResult,
    recommendation::Recommendation,
    types::{Priority, Sku},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProductReport {
    pub new_products: Vec<NewProduct>,
    pub benchmarks: Vec<WindowBenchmark>,
    pub scores: Vec<LaunchScore>,
    /// Underperforming or poor launches, lowest score first.
    pub underperformers: Vec<LaunchScore>,
    pub recommendations: Vec<Recommendation>,
    pub summary: Summary,
}

impl NewProductReport {
    pub fn skus(&self) -> BTreeSet<Sku> {
        self.new_products.iter().map(|p| p.sku.clone()).collect()
    }

    pub fn underperformer_skus(&self) -> Vec<Sku> {
        self.underperformers.iter().map(|s| s.sku().to_string()).collect()
    }
}

pub struct NewProductScoringAnalyzer;

impl Analyzer for NewProductScoringAnalyzer {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::NewProductScoring
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> MerchResult<AnalysisReport> {
        let config = &ctx.config.new_product;
        let (benchmarks, scores) =
            benchmark::score_launches(&ctx.snapshot.sales, &ctx.snapshot.products, config, ctx.as_of);

        let mut underperformers: Vec<LaunchScore> = scores
            .iter()
            .filter(|s| s.category.is_underperformer())
            .cloned()
            .collect();
        underperformers.sort_by(|a, b| {
            a.overall_score
                .unwrap_or(0.0)
                .total_cmp(&b.overall_score.unwrap_or(0.0))
        });

        let count = |category: LaunchCategory| scores.iter().filter(|s| s.category == category).count() as f64;
        let mut summary = Summary::new();
        insert(&mut summary, "new_products_count", scores.len() as f64);
        insert(&mut summary, "underperformers_count", underperformers.len() as f64);
        insert(&mut summary, "winners_count", count(LaunchCategory::Winner));
        insert(&mut summary, "insufficient_data_count", count(LaunchCategory::InsufficientData));

        let recommendations = recommendations(&scores, &underperformers, ctx);

        Ok(AnalysisReport::NewProductScoring(NewProductReport {
            new_products: scores.iter().map(|s| s.product.clone()).collect(),
            benchmarks,
            scores,
            underperformers,
            recommendations,
            summary,
        }))
    }
}

fn recommendations(
    scores: &[LaunchScore],
    underperformers: &[LaunchScore],
    ctx: &AnalysisContext<'_>,
) -> Vec<Recommendation> {
    let config = &ctx.config.new_product;
    let mut recs = Vec::new();

    let winners: Vec<&LaunchScore> = scores
        .iter()
        .filter(|s| s.category == LaunchCategory::Winner)
        .collect();
    if !winners.is_empty() {
        recs.push(
            Recommendation::new(
                "success",
                Priority::Low,
                format!("Scale up {} successful new products", winners.len()),
                "Increase inventory and marketing for winners",
                "These products are outperforming historical launches",
            )
            .for_skus(winners.iter().map(|s| s.sku().to_string())),
        );
    }

    if !underperformers.is_empty() {
        recs.push(
            Recommendation::new(
                "warning",
                Priority::High,
                format!("Review {} underperforming new products", underperformers.len()),
                "Consider price adjustments, better marketing, or discontinuation",
                "These products are below historical benchmarks",
            )
            .for_skus(underperformers.iter().map(|s| s.sku().to_string())),
        );
    }

    for launch in underperformers.iter().take(ctx.config.report.max_listed) {
        let score = launch.overall_score.unwrap_or(0.0);
        let priority = if score < config.high_priority_score {
            Priority::High
        } else {
            Priority::Medium
        };
        recs.push(
            Recommendation::new(
                "new_product_action",
                priority,
                format!(
                    "Review {} ({} days since launch)",
                    ctx.aggregated.display_name(launch.sku()),
                    launch.product.days_since_launch
                ),
                format!("Score: {} of benchmark", percent(score)),
                format!("Category: {}", launch.category.as_str()),
            )
            .for_skus([launch.sku()]),
        );
    }
    recs
}
