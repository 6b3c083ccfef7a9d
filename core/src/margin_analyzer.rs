//! Contribution margin ranking: products sorted by true profit after fees,
//! shipping, cost of goods and assumed return losses.

use crate::{
    analyzer::{insert, money, AnalysisContext, AnalysisKind, AnalysisReport, Analyzer, Summary},
    error::MerchResult,
    recommendation::Recommendation,
    scoring::{self, CompositeScore, PerformanceTier},
    stats,
    types::{Priority, Sku},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedProduct {
    /// 1 = highest contribution margin.
    pub rank: usize,
    pub score: CompositeScore,
}

impl RankedProduct {
    pub fn sku(&self) -> &str {
        &self.score.sku
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributionMarginReport {
    pub ranked_products: Vec<RankedProduct>,
    /// Negative margin, worst first.
    pub money_losers: Vec<RankedProduct>,
    pub recommendations: Vec<Recommendation>,
    pub summary: Summary,
}

impl ContributionMarginReport {
    pub fn skus(&self) -> BTreeSet<Sku> {
        self.ranked_products.iter().map(|r| r.score.sku.clone()).collect()
    }

    pub fn money_loser_skus(&self) -> Vec<Sku> {
        self.money_losers.iter().map(|r| r.score.sku.clone()).collect()
    }
}

pub struct ContributionMarginAnalyzer;

impl Analyzer for ContributionMarginAnalyzer {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::ContributionMargin
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> MerchResult<AnalysisReport> {
        let ranked: Vec<RankedProduct> = scoring::rank_by_margin(ctx.scores)
            .into_iter()
            .enumerate()
            .map(|(i, score)| RankedProduct { rank: i + 1, score })
            .collect();

        let mut money_losers: Vec<RankedProduct> = ranked
            .iter()
            .filter(|r| r.score.tier == PerformanceTier::MoneyLoser)
            .cloned()
            .collect();
        money_losers.sort_by(|a, b| {
            a.score.contribution_margin().total_cmp(&b.score.contribution_margin())
        });

        let total_profit: f64 = ranked.iter().map(|r| r.score.contribution_margin()).sum();
        let total_losses: f64 = money_losers.iter().map(|r| r.score.contribution_margin()).sum();

        let mut summary = Summary::new();
        insert(&mut summary, "total_skus", ranked.len() as f64);
        insert(
            &mut summary,
            "profitable_skus",
            ranked.iter().filter(|r| r.score.contribution_margin() > 0.0).count() as f64,
        );
        insert(&mut summary, "losing_skus", money_losers.len() as f64);
        insert(&mut summary, "total_profit", total_profit);
        insert(&mut summary, "total_losses", total_losses);

        let recommendations = insights(&ranked, &money_losers, total_profit, ctx);

        Ok(AnalysisReport::ContributionMargin(ContributionMarginReport {
            ranked_products: ranked,
            money_losers,
            recommendations,
            summary,
        }))
    }
}

fn insights(
    ranked: &[RankedProduct],
    losers: &[RankedProduct],
    total_profit: f64,
    ctx: &AnalysisContext<'_>,
) -> Vec<Recommendation> {
    let config = &ctx.config.margin;
    let mut recs = Vec::new();

    let top_n = config.top_focus_count;
    if top_n > 0 && ranked.len() > top_n {
        let top = &ranked[..top_n];
        let top_profit: f64 = top.iter().map(|r| r.score.contribution_margin()).sum();
        let share = if total_profit > 0.0 { top_profit / total_profit * 100.0 } else { 0.0 };
        recs.push(
            Recommendation::new(
                "focus_opportunity",
                Priority::Low,
                format!("Prioritize marketing and inventory for top {top_n} SKUs"),
                format!("Top {top_n} SKUs generate {share:.1}% of total profit"),
                "Potential to increase profit by focusing marketing on these SKUs",
            )
            .for_skus(top.iter().map(|r| r.sku().to_string())),
        );
    }

    if !losers.is_empty() {
        let total_loss: f64 = losers.iter().map(|r| r.score.contribution_margin()).sum();
        recs.push(
            Recommendation::new(
                "money_losers",
                Priority::High,
                format!("Review pricing, costs, or discontinue {} SKUs losing money", losers.len()),
                format!("Total losses: {}", money(total_loss.abs())),
                "These SKUs have negative contribution margins",
            )
            .for_skus(losers.iter().map(|r| r.sku().to_string())),
        );
    }

    let revenues: Vec<f64> = ranked.iter().map(|r| r.score.revenue()).collect();
    let revenue_cut = stats::quantile(&revenues, config.high_revenue_quantile);
    let bestsellers: Vec<&RankedProduct> = ranked
        .iter()
        .filter(|r| r.score.revenue() > revenue_cut && r.score.margin.margin_pct < config.low_margin_ratio)
        .collect();
    if !bestsellers.is_empty() {
        recs.push(
            Recommendation::new(
                "low_margin_bestsellers",
                Priority::Medium,
                "Review pricing strategy or reduce costs for high-revenue, low-margin SKUs",
                format!("{} SKUs have high revenue but low margins", bestsellers.len()),
                "These bestsellers may not be as profitable as they appear",
            )
            .for_skus(bestsellers.iter().map(|r| r.sku().to_string())),
        );
    }

    recs
}
