//! Analysis configuration.
//!
//! Every threshold, weight and business assumption used by the analyses
//! lives here and is passed explicitly into each component. Nothing in the
//! library reads ambient or global state.
//!
//! The defaults reproduce the constants the merchandising team calibrated
//! the thresholds against. Values marked "assumption" are business
//! assumptions, not measured facts; override them per deployment.

use crate::error::{MerchError, MerchResult};
use serde::{Deserialize, Serialize};

// ── Zombie / composite scoring ───────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeWeights {
    pub revenue: f64,
    pub margin: f64,
    pub velocity: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self { revenue: 0.4, margin: 0.4, velocity: 0.2 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZombieConfig {
    /// Bottom percentile (0..=100) of composite score flagged as zombie.
    pub threshold_percentile: f64,
    pub weights: CompositeWeights,
    /// Revenue below this (but above zero) reads as "Very low revenue".
    pub very_low_revenue_floor: f64,
    /// Margin ratio below this reads as "Low profit margin".
    pub low_margin_ratio: f64,
    /// Units below this (but above zero) reads as "Very slow moving".
    pub very_low_units: f64,
}

impl Default for ZombieConfig {
    fn default() -> Self {
        Self {
            threshold_percentile: 20.0,
            weights: CompositeWeights::default(),
            very_low_revenue_floor: 100.0,
            low_margin_ratio: 0.10,
            very_low_units: 5.0,
        }
    }
}

// ── Contribution margin ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginConfig {
    /// Share of return value assumed unrecoverable (assumption).
    pub return_loss_ratio: f64,
    /// Size of the "focus on top N" group.
    pub top_focus_count: usize,
    /// Revenue quantile (0..=1) above which a sku counts as a bestseller.
    pub high_revenue_quantile: f64,
    /// Margin ratio below which a bestseller is flagged as low-profit.
    pub low_margin_ratio: f64,
}

impl Default for MarginConfig {
    fn default() -> Self {
        Self {
            return_loss_ratio: 0.5,
            top_focus_count: 30,
            high_revenue_quantile: 0.7,
            low_margin_ratio: 0.10,
        }
    }
}

// ── Slow movers ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlowMoverConfig {
    /// Days of supply at or above which a sku is a slow mover.
    pub days_threshold: f64,
    /// Days of supply at or above which urgency becomes critical.
    pub critical_days: f64,
    pub slow_days: f64,
    pub normal_days: f64,
}

impl Default for SlowMoverConfig {
    fn default() -> Self {
        Self {
            days_threshold: 180.0,
            critical_days: 365.0,
            slow_days: 90.0,
            normal_days: 30.0,
        }
    }
}

// ── Cannibalization ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CannibalizationConfig {
    /// Minimum customer overlap (Jaccard) for a pair to be retained.
    pub overlap_threshold: f64,
    /// Overlap at or above which a pair recommendation is high priority.
    pub high_priority_overlap: f64,
    /// Cost reduction expected from consolidating a pair (assumption).
    pub consolidation_cost_reduction: f64,
    /// Skus bought by fewer customers are not paired at all.
    pub min_support: usize,
}

impl Default for CannibalizationConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: 0.85,
            high_priority_overlap: 0.90,
            consolidation_cost_reduction: 0.20,
            min_support: 1,
        }
    }
}

// ── Bundles ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Minimum view correlation for a pair to become a bundle candidate.
    pub correlation_threshold: f64,
    /// Bundle price discount (assumption).
    pub discount: f64,
    /// Share of co-viewing sessions expected to buy the bundle (assumption).
    pub conversion_rate: f64,
    /// Skus viewed in fewer sessions are not paired at all.
    pub min_support: usize,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            correlation_threshold: 0.70,
            discount: 0.10,
            conversion_rate: 0.15,
            min_support: 1,
        }
    }
}

// ── New products ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewProductConfig {
    /// Age windows in days since launch.
    pub windows: Vec<u32>,
    /// Benchmark quantile (0..=1) a launch is scored against.
    pub benchmark_quantile: f64,
    pub revenue_weight: f64,
    pub units_weight: f64,
    pub winner_score: f64,
    pub solid_score: f64,
    pub underperforming_score: f64,
    /// Per-sku recommendations below this score are high priority.
    pub high_priority_score: f64,
}

impl Default for NewProductConfig {
    fn default() -> Self {
        Self {
            windows: vec![30, 60, 90],
            benchmark_quantile: 0.75,
            revenue_weight: 0.6,
            units_weight: 0.4,
            winner_score: 0.8,
            solid_score: 0.6,
            underperforming_score: 0.4,
            high_priority_score: 0.3,
        }
    }
}

// ── Financial impact ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactConfig {
    /// Snapshot-period → annual multiplier. 12 assumes a monthly snapshot;
    /// set it to match the actual input period.
    pub annualization_multiplier: f64,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self { annualization_multiplier: 12.0 }
    }
}

// ── Reporting ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Per-sku / per-pair recommendations emitted per analysis.
    pub max_listed: usize,
    /// Consolidated recommendations kept in the executive summary.
    pub summary_top: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { max_listed: 10, summary_top: 10 }
    }
}

// ── Root ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub zombie: ZombieConfig,
    pub margin: MarginConfig,
    pub slow_mover: SlowMoverConfig,
    pub cannibalization: CannibalizationConfig,
    pub bundle: BundleConfig,
    pub new_product: NewProductConfig,
    pub impact: ImpactConfig,
    pub report: ReportConfig,
    /// Sales period assumed when no sale carries a usable date.
    pub default_period_days: u32,
    /// Run independent analyses and pair evaluation on the rayon pool.
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            zombie: ZombieConfig::default(),
            margin: MarginConfig::default(),
            slow_mover: SlowMoverConfig::default(),
            cannibalization: CannibalizationConfig::default(),
            bundle: BundleConfig::default(),
            new_product: NewProductConfig::default(),
            impact: ImpactConfig::default(),
            report: ReportConfig::default(),
            default_period_days: 90,
            parallel: true,
        }
    }
}

impl AnalysisConfig {
    /// Load from a JSON file. Missing keys fall back to the defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: AnalysisConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        log::debug!("Loaded analysis config from {path}");
        Ok(config)
    }

    /// Reject values that would make the analyses meaningless.
    pub fn validate(&self) -> MerchResult<()> {
        check_range("zombie.threshold_percentile", self.zombie.threshold_percentile, 0.0, 100.0)?;
        check_range("margin.return_loss_ratio", self.margin.return_loss_ratio, 0.0, 1.0)?;
        check_range("margin.high_revenue_quantile", self.margin.high_revenue_quantile, 0.0, 1.0)?;
        check_range("cannibalization.overlap_threshold", self.cannibalization.overlap_threshold, 0.0, 1.0)?;
        check_range(
            "cannibalization.consolidation_cost_reduction",
            self.cannibalization.consolidation_cost_reduction,
            0.0,
            1.0,
        )?;
        check_range("bundle.correlation_threshold", self.bundle.correlation_threshold, 0.0, 1.0)?;
        check_range("bundle.discount", self.bundle.discount, 0.0, 1.0)?;
        check_range("bundle.conversion_rate", self.bundle.conversion_rate, 0.0, 1.0)?;
        check_range("new_product.benchmark_quantile", self.new_product.benchmark_quantile, 0.0, 1.0)?;

        if self.new_product.windows.is_empty() {
            return Err(invalid("new_product.windows", "at least one window is required"));
        }
        if self.new_product.windows.contains(&0) {
            return Err(invalid("new_product.windows", "windows must be positive day counts"));
        }
        if self.slow_mover.days_threshold <= 0.0 {
            return Err(invalid("slow_mover.days_threshold", "must be positive"));
        }
        if self.impact.annualization_multiplier < 0.0 {
            return Err(invalid("impact.annualization_multiplier", "must not be negative"));
        }
        if self.default_period_days == 0 {
            return Err(invalid("default_period_days", "must be positive"));
        }
        Ok(())
    }
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> MerchResult<()> {
    if value.is_nan() || value < min || value > max {
        return Err(invalid(field, &format!("{value} is outside [{min}, {max}]")));
    }
    Ok(())
}

fn invalid(field: &str, reason: &str) -> MerchError {
    MerchError::InvalidConfig {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
