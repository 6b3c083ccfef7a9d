//! The analysis engine. One bounded snapshot in, one result bundle out.
//!
//! EXECUTION ORDER (fixed):
//!   1. SKU rationalization
//!   2. Contribution margin
//!   3. Slow mover detection
//!   4. Cannibalization
//!   5. New product scoring
//!   6. Bundle opportunities
//!
//! RULES:
//!   - Aggregation and composite scoring run once, before any analyzer.
//!   - Analyzers may run in parallel; results are collected in registration
//!     order, so output is identical to the sequential path.
//!   - A failing analyzer (error or panic) yields its empty report plus a
//!     diagnostic. It never aborts the run.
//!   - No randomness. Same snapshot + config + as_of = same results.

use crate::{
    aggregate::{self, AggregatedData},
    analyzer::{AnalysisContext, AnalysisKind, AnalysisReport, Analyzer},
    bundle_analyzer::{BundleFinderAnalyzer, BundleReport},
    cannibalization_analyzer::{CannibalizationAnalyzer, CannibalizationReport},
    config::AnalysisConfig,
    error::MerchResult,
    launch_analyzer::{NewProductReport, NewProductScoringAnalyzer},
    margin_analyzer::{ContributionMarginAnalyzer, ContributionMarginReport},
    rationalization_analyzer::{SkuRationalizationAnalyzer, SkuRationalizationReport},
    recommendation::{self, Recommendation, StatusEntry, StatusFindings},
    scoring,
    slow_mover_analyzer::{self, SlowMoverAnalyzer, SlowMoverReport},
    snapshot::DataSnapshot,
    source::{DataSource, DateRange},
    types::Sku,
};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};

// ── Result bundle ────────────────────────────────────────────────────────────

/// An analysis that failed and was replaced by its empty report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentFailure {
    pub analysis: AnalysisKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyMetrics {
    pub total_skus: usize,
    pub zombie_skus: usize,
    pub capital_to_free: f64,
    pub profitable_skus: usize,
    pub losing_skus: usize,
    pub slow_movers: usize,
    pub cannibalization_pairs: usize,
    pub new_products: usize,
    pub underperforming_new_products: usize,
    pub bundle_opportunities: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub working_capital_freed: f64,
    pub potential_bundle_revenue: f64,
    pub total_profit: f64,
    pub revenue_at_risk: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub key_metrics: KeyMetrics,
    pub financial_impact: FinancialSummary,
    /// Head of the consolidated list.
    pub top_recommendations: Vec<Recommendation>,
}

/// Everything the presentation layer reads from one run. Report fields are
/// named by analysis so the serialized bundle is keyed by analysis name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub as_of: NaiveDate,
    pub analysis_period_days: f64,
    pub sku_rationalization: SkuRationalizationReport,
    pub contribution_margin: ContributionMarginReport,
    pub slow_mover_detection: SlowMoverReport,
    pub cannibalization: CannibalizationReport,
    pub new_product_scoring: NewProductReport,
    pub bundle_opportunities: BundleReport,
    pub consolidated_recommendations: Vec<Recommendation>,
    pub traffic_light_status: BTreeMap<Sku, StatusEntry>,
    pub executive_summary: ExecutiveSummary,
    #[serde(default)]
    pub diagnostics: Vec<ComponentFailure>,
}

impl AnalysisResults {
    pub fn report(&self, kind: AnalysisKind) -> AnalysisReport {
        match kind {
            AnalysisKind::SkuRationalization  => AnalysisReport::SkuRationalization(self.sku_rationalization.clone()),
            AnalysisKind::ContributionMargin  => AnalysisReport::ContributionMargin(self.contribution_margin.clone()),
            AnalysisKind::SlowMoverDetection  => AnalysisReport::SlowMoverDetection(self.slow_mover_detection.clone()),
            AnalysisKind::Cannibalization     => AnalysisReport::Cannibalization(self.cannibalization.clone()),
            AnalysisKind::NewProductScoring   => AnalysisReport::NewProductScoring(self.new_product_scoring.clone()),
            AnalysisKind::BundleOpportunities => AnalysisReport::BundleOpportunities(self.bundle_opportunities.clone()),
        }
    }

    pub fn status_of(&self, sku: &str) -> Option<&StatusEntry> {
        self.traffic_light_status.get(sku)
    }

    pub fn failed(&self, kind: AnalysisKind) -> bool {
        self.diagnostics.iter().any(|d| d.analysis == kind)
    }
}

/// Typed slots filled from the analyzer outputs. Unfilled slots stay empty.
#[derive(Default)]
struct ReportSet {
    sku_rationalization: SkuRationalizationReport,
    contribution_margin: ContributionMarginReport,
    slow_mover_detection: SlowMoverReport,
    cannibalization: CannibalizationReport,
    new_product_scoring: NewProductReport,
    bundle_opportunities: BundleReport,
}

impl ReportSet {
    fn store(&mut self, report: AnalysisReport) {
        match report {
            AnalysisReport::SkuRationalization(r)  => self.sku_rationalization = r,
            AnalysisReport::ContributionMargin(r)  => self.contribution_margin = r,
            AnalysisReport::SlowMoverDetection(r)  => self.slow_mover_detection = r,
            AnalysisReport::Cannibalization(r)     => self.cannibalization = r,
            AnalysisReport::NewProductScoring(r)   => self.new_product_scoring = r,
            AnalysisReport::BundleOpportunities(r) => self.bundle_opportunities = r,
        }
    }

    fn findings(&self) -> StatusFindings {
        StatusFindings {
            zombies: self.sku_rationalization.zombie_skus(),
            money_losers: self.contribution_margin.money_loser_skus(),
            critical_slow_movers: self.slow_mover_detection.critical_skus(),
            underperforming_launches: self.new_product_scoring.underperformer_skus(),
        }
    }
}

// ── Engine ───────────────────────────────────────────────────────────────────

pub struct AnalysisEngine {
    config: AnalysisConfig,
    analyzers: Vec<Box<dyn Analyzer>>,
}

impl AnalysisEngine {
    /// An engine with no analyzers registered.
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config, analyzers: Vec::new() }
    }

    /// Build a fully wired engine with all analyzers registered.
    pub fn build(config: AnalysisConfig) -> Self {
        let mut engine = AnalysisEngine::new(config);
        // Registration order is the documented execution order.
        engine.register(Box::new(SkuRationalizationAnalyzer));
        engine.register(Box::new(ContributionMarginAnalyzer));
        engine.register(Box::new(SlowMoverAnalyzer));
        engine.register(Box::new(CannibalizationAnalyzer));
        engine.register(Box::new(NewProductScoringAnalyzer));
        engine.register(Box::new(BundleFinderAnalyzer));
        engine
    }

    /// Register an analyzer. Call in the documented execution order.
    pub fn register(&mut self, analyzer: Box<dyn Analyzer>) {
        self.analyzers.push(analyzer);
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Pull a snapshot from `source` and analyze it as of the range end
    /// (or `today` when the range is open-ended).
    pub fn run_from_source(
        &self,
        source: &dyn DataSource,
        range: DateRange,
        today: NaiveDate,
    ) -> MerchResult<AnalysisResults> {
        let snapshot = source.fetch_snapshot(range)?;
        Ok(self.run(&snapshot, range.end.unwrap_or(today)))
    }

    /// Run every registered analyzer over `snapshot`. Infallible: component
    /// failures surface in `diagnostics`.
    pub fn run(&self, snapshot: &DataSnapshot, as_of: NaiveDate) -> AnalysisResults {
        log::info!(
            "Analysis run as of {as_of}: {} analyzers, parallel={}",
            self.analyzers.len(),
            self.config.parallel
        );

        let aggregated = aggregate::aggregate(snapshot);
        let scores = scoring::composite_scores(&aggregated.rows, &self.config.zombie, &self.config.margin);
        let ctx = AnalysisContext {
            snapshot,
            aggregated: &aggregated,
            scores: &scores,
            config: &self.config,
            as_of,
        };

        let outcomes: Vec<(AnalysisKind, Result<AnalysisReport, String>)> = if self.config.parallel {
            self.analyzers
                .par_iter()
                .map(|a| (a.kind(), run_contained(a.as_ref(), &ctx)))
                .collect()
        } else {
            self.analyzers
                .iter()
                .map(|a| (a.kind(), run_contained(a.as_ref(), &ctx)))
                .collect()
        };

        let mut reports = ReportSet::default();
        let mut emitted: Vec<AnalysisReport> = Vec::with_capacity(outcomes.len());
        let mut diagnostics = Vec::new();
        for (kind, outcome) in outcomes {
            let report = match outcome {
                Ok(report) => {
                    log::debug!(
                        "{}: {} recommendations",
                        kind.name(),
                        report.recommendations().len()
                    );
                    report
                }
                Err(message) => {
                    log::warn!("Analysis {} failed; reporting empty result: {message}", kind.name());
                    diagnostics.push(ComponentFailure { analysis: kind, message });
                    AnalysisReport::empty(kind)
                }
            };
            emitted.push(report);
        }

        let consolidated = recommendation::consolidate(
            emitted.iter().map(|r| (r.kind(), r.recommendations())),
        );
        let skus = observed_skus(&aggregated, &emitted);
        for report in emitted {
            reports.store(report);
        }
        let traffic_light = recommendation::traffic_light_status(&skus, &reports.findings(), &consolidated);
        let executive_summary = executive_summary(&reports, &aggregated, &consolidated, &self.config);

        log::info!(
            "Analysis complete: {} skus, {} recommendations, {} failed components",
            skus.len(),
            consolidated.len(),
            diagnostics.len()
        );

        AnalysisResults {
            as_of,
            analysis_period_days: slow_mover_analyzer::sales_period_days(
                &snapshot.sales,
                self.config.default_period_days,
            ),
            sku_rationalization: reports.sku_rationalization,
            contribution_margin: reports.contribution_margin,
            slow_mover_detection: reports.slow_mover_detection,
            cannibalization: reports.cannibalization,
            new_product_scoring: reports.new_product_scoring,
            bundle_opportunities: reports.bundle_opportunities,
            consolidated_recommendations: consolidated,
            traffic_light_status: traffic_light,
            executive_summary,
            diagnostics,
        }
    }
}

/// Run one analyzer, turning errors, panics and mismatched reports into a
/// failure message.
fn run_contained(analyzer: &dyn Analyzer, ctx: &AnalysisContext<'_>) -> Result<AnalysisReport, String> {
    match panic::catch_unwind(AssertUnwindSafe(|| analyzer.analyze(ctx))) {
        Ok(Ok(report)) if report.kind() == analyzer.kind() => Ok(report),
        Ok(Ok(report)) => Err(format!(
            "{} returned a {} report",
            analyzer.name(),
            report.kind().name()
        )),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Every sku seen in the aggregated table or any report table.
fn observed_skus(aggregated: &AggregatedData, reports: &[AnalysisReport]) -> BTreeSet<Sku> {
    let mut skus: BTreeSet<Sku> = aggregated.rows.iter().map(|r| r.sku.clone()).collect();
    for report in reports {
        skus.extend(report.skus());
    }
    skus
}

fn executive_summary(
    reports: &ReportSet,
    aggregated: &AggregatedData,
    consolidated: &[Recommendation],
    config: &AnalysisConfig,
) -> ExecutiveSummary {
    let rationalization = &reports.sku_rationalization;
    let margin = &reports.contribution_margin;

    let key_metrics = KeyMetrics {
        total_skus: aggregated.len(),
        zombie_skus: rationalization.zombie_skus.len(),
        capital_to_free: rationalization.financial_impact.working_capital_freed,
        profitable_skus: margin
            .ranked_products
            .iter()
            .filter(|r| r.score.contribution_margin() > 0.0)
            .count(),
        losing_skus: margin.money_losers.len(),
        slow_movers: reports.slow_mover_detection.slow_movers.len(),
        cannibalization_pairs: reports.cannibalization.cannibalization_pairs.len(),
        new_products: reports.new_product_scoring.new_products.len(),
        underperforming_new_products: reports.new_product_scoring.underperformers.len(),
        bundle_opportunities: reports.bundle_opportunities.bundle_opportunities.len(),
    };

    let financial_impact = FinancialSummary {
        working_capital_freed: rationalization.financial_impact.working_capital_freed,
        potential_bundle_revenue: reports.bundle_opportunities.bundle_potential.total_potential_revenue,
        total_profit: margin
            .ranked_products
            .iter()
            .map(|r| r.score.contribution_margin())
            .sum(),
        revenue_at_risk: reports.cannibalization.impact.total_revenue_at_risk,
    };

    ExecutiveSummary {
        key_metrics,
        financial_impact,
        top_recommendations: consolidated.iter().take(config.report.summary_top).cloned().collect(),
    }
}
