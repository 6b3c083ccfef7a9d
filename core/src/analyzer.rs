//! Analyzer trait and the shared analysis context.
//!
//! RULE: Every analysis implements Analyzer.
//! Analyzers read only the AnalysisContext; no analyzer calls another
//! analyzer or sees another analyzer's output. The engine owns ordering
//! and consolidation (see engine.rs).

use crate::{
    aggregate::AggregatedData,
    bundle_analyzer::BundleReport,
    cannibalization_analyzer::CannibalizationReport,
    config::AnalysisConfig,
    error::MerchResult,
    launch_analyzer::NewProductReport,
    margin_analyzer::ContributionMarginReport,
    rationalization_analyzer::SkuRationalizationReport,
    recommendation::Recommendation,
    scoring::CompositeScore,
    slow_mover_analyzer::SlowMoverReport,
    snapshot::DataSnapshot,
    types::Sku,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Scalar metrics reported by every analysis.
pub type Summary = BTreeMap<String, f64>;

/// Stable identity of each analysis. Serialized names are the result-bundle
/// keys the presentation layer reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    SkuRationalization,
    ContributionMargin,
    SlowMoverDetection,
    Cannibalization,
    NewProductScoring,
    BundleOpportunities,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 6] = [
        AnalysisKind::SkuRationalization,
        AnalysisKind::ContributionMargin,
        AnalysisKind::SlowMoverDetection,
        AnalysisKind::Cannibalization,
        AnalysisKind::NewProductScoring,
        AnalysisKind::BundleOpportunities,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AnalysisKind::SkuRationalization  => "sku_rationalization",
            AnalysisKind::ContributionMargin  => "contribution_margin",
            AnalysisKind::SlowMoverDetection  => "slow_mover_detection",
            AnalysisKind::Cannibalization     => "cannibalization",
            AnalysisKind::NewProductScoring   => "new_product_scoring",
            AnalysisKind::BundleOpportunities => "bundle_opportunities",
        }
    }
}

/// Read-only inputs shared by all analyzers in one run.
pub struct AnalysisContext<'a> {
    pub snapshot: &'a DataSnapshot,
    pub aggregated: &'a AggregatedData,
    /// Composite scores for every aggregated sku, in aggregate order.
    pub scores: &'a [CompositeScore],
    pub config: &'a AnalysisConfig,
    /// Reference "now" for launch-age computations.
    pub as_of: NaiveDate,
}

/// The contract every analysis must fulfill.
pub trait Analyzer: Send + Sync {
    fn kind(&self) -> AnalysisKind;

    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Pure function of the context. An `Err` is contained by the engine:
    /// the analysis reports empty and the run continues.
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> MerchResult<AnalysisReport>;
}

/// Output of one analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "analysis", rename_all = "snake_case")]
pub enum AnalysisReport {
    SkuRationalization(SkuRationalizationReport),
    ContributionMargin(ContributionMarginReport),
    SlowMoverDetection(SlowMoverReport),
    Cannibalization(CannibalizationReport),
    NewProductScoring(NewProductReport),
    BundleOpportunities(BundleReport),
}

impl AnalysisReport {
    /// The well-defined empty result for an analysis.
    pub fn empty(kind: AnalysisKind) -> Self {
        match kind {
            AnalysisKind::SkuRationalization  => Self::SkuRationalization(Default::default()),
            AnalysisKind::ContributionMargin  => Self::ContributionMargin(Default::default()),
            AnalysisKind::SlowMoverDetection  => Self::SlowMoverDetection(Default::default()),
            AnalysisKind::Cannibalization     => Self::Cannibalization(Default::default()),
            AnalysisKind::NewProductScoring   => Self::NewProductScoring(Default::default()),
            AnalysisKind::BundleOpportunities => Self::BundleOpportunities(Default::default()),
        }
    }

    pub fn kind(&self) -> AnalysisKind {
        match self {
            Self::SkuRationalization(_)  => AnalysisKind::SkuRationalization,
            Self::ContributionMargin(_)  => AnalysisKind::ContributionMargin,
            Self::SlowMoverDetection(_)  => AnalysisKind::SlowMoverDetection,
            Self::Cannibalization(_)     => AnalysisKind::Cannibalization,
            Self::NewProductScoring(_)   => AnalysisKind::NewProductScoring,
            Self::BundleOpportunities(_) => AnalysisKind::BundleOpportunities,
        }
    }

    pub fn recommendations(&self) -> &[Recommendation] {
        match self {
            Self::SkuRationalization(r)  => &r.recommendations,
            Self::ContributionMargin(r)  => &r.recommendations,
            Self::SlowMoverDetection(r)  => &r.recommendations,
            Self::Cannibalization(r)     => &r.recommendations,
            Self::NewProductScoring(r)   => &r.recommendations,
            Self::BundleOpportunities(r) => &r.recommendations,
        }
    }

    pub fn summary(&self) -> &Summary {
        match self {
            Self::SkuRationalization(r)  => &r.summary,
            Self::ContributionMargin(r)  => &r.summary,
            Self::SlowMoverDetection(r)  => &r.summary,
            Self::Cannibalization(r)     => &r.summary,
            Self::NewProductScoring(r)   => &r.summary,
            Self::BundleOpportunities(r) => &r.summary,
        }
    }

    /// Every sku named in this report's tables.
    pub fn skus(&self) -> BTreeSet<Sku> {
        match self {
            Self::SkuRationalization(r)  => r.skus(),
            Self::ContributionMargin(r)  => r.skus(),
            Self::SlowMoverDetection(r)  => r.skus(),
            Self::Cannibalization(r)     => r.skus(),
            Self::NewProductScoring(r)   => r.skus(),
            Self::BundleOpportunities(r) => r.skus(),
        }
    }
}

// ── Formatting helpers for recommendation text ───────────────────────────────

/// `$1,234` style, rounded to whole units.
pub fn money(amount: f64) -> String {
    let rounded = amount.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}${grouped}")
}

/// `0.853` → `85.3%`.
pub fn percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

pub(crate) fn insert(summary: &mut Summary, key: &str, value: f64) {
    summary.insert(key.to_string(), value);
}
