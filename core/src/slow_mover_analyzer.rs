//! Slow mover detection: sales velocity, days of supply and markdown urgency.
//!
//! Days of supply = quantity on hand / units per day. Zero velocity means
//! infinite supply, represented as `None` and categorized `no_sales`.

use crate::{
    aggregate::ProductSummary,
    analyzer::{insert, money, AnalysisContext, AnalysisKind, AnalysisReport, Analyzer, Summary},
    config::SlowMoverConfig,
    error::MerchResult,
    recommendation::Recommendation,
    snapshot::SalesRecord,
    stats,
    types::{Priority, Sku},
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryAge {
    NoSales,
    Critical,
    Slow,
    Normal,
    Fast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocityRow {
    pub sku: Sku,
    pub product_name: Option<String>,
    pub category: Option<String>,
    pub units: f64,
    pub revenue: f64,
    pub quantity_on_hand: f64,
    pub cost_per_unit: f64,
    pub sales_period_days: f64,
    pub units_per_day: f64,
    pub revenue_per_day: f64,
    pub inventory_turnover: f64,
    /// `None` when velocity is zero (infinite supply).
    pub days_of_supply: Option<f64>,
    pub inventory_value: f64,
    pub age_category: InventoryAge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowMover {
    pub row: VelocityRow,
    pub urgency: Priority,
}

impl SlowMover {
    pub fn sku(&self) -> &str {
        &self.row.sku
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlowMoverReport {
    pub velocity_analysis: Vec<VelocityRow>,
    /// Worst (longest supply) first.
    pub slow_movers: Vec<SlowMover>,
    pub recommendations: Vec<Recommendation>,
    pub summary: Summary,
}

impl SlowMoverReport {
    pub fn skus(&self) -> BTreeSet<Sku> {
        self.velocity_analysis.iter().map(|r| r.sku.clone()).collect()
    }

    pub fn critical_skus(&self) -> Vec<Sku> {
        self.slow_movers
            .iter()
            .filter(|s| s.urgency == Priority::Critical)
            .map(|s| s.row.sku.clone())
            .collect()
    }
}

/// Observed sales span in days (at least 1), or `default_days` when no
/// sale carries a date.
pub fn sales_period_days(sales: &[SalesRecord], default_days: u32) -> f64 {
    let dates = sales.iter().filter_map(|s| s.date);
    let (min, max) = dates.fold((None, None), |(lo, hi), d| {
        (
            Some(lo.map_or(d, |l: chrono::NaiveDate| l.min(d))),
            Some(hi.map_or(d, |h: chrono::NaiveDate| h.max(d))),
        )
    });
    match (min, max) {
        (Some(lo), Some(hi)) => ((hi - lo).num_days().max(1)) as f64,
        _ => default_days as f64,
    }
}

pub fn velocity_row(row: &ProductSummary, period_days: f64, config: &SlowMoverConfig) -> VelocityRow {
    let units_per_day = stats::ratio(row.units, period_days);
    let days_of_supply = (units_per_day > 0.0).then(|| row.quantity_on_hand / units_per_day);

    VelocityRow {
        sku: row.sku.clone(),
        product_name: row.product_name.clone(),
        category: row.category.clone(),
        units: row.units,
        revenue: row.revenue,
        quantity_on_hand: row.quantity_on_hand,
        cost_per_unit: row.cost_per_unit,
        sales_period_days: period_days,
        units_per_day,
        revenue_per_day: stats::ratio(row.revenue, period_days),
        inventory_turnover: stats::ratio(row.units, row.quantity_on_hand),
        days_of_supply,
        inventory_value: row.inventory_value(),
        age_category: categorize_age(days_of_supply, config),
    }
}

pub fn categorize_age(days: Option<f64>, config: &SlowMoverConfig) -> InventoryAge {
    match days {
        None => InventoryAge::NoSales,
        Some(d) if d == 0.0 => InventoryAge::NoSales,
        Some(d) if d >= config.days_threshold => InventoryAge::Critical,
        Some(d) if d >= config.slow_days => InventoryAge::Slow,
        Some(d) if d >= config.normal_days => InventoryAge::Normal,
        Some(_) => InventoryAge::Fast,
    }
}

pub fn urgency(days: Option<f64>, config: &SlowMoverConfig) -> Priority {
    match days {
        None => Priority::Critical,
        Some(d) if d >= config.critical_days => Priority::Critical,
        Some(d) if d >= config.days_threshold => Priority::High,
        Some(_) => Priority::Medium,
    }
}

/// Infinite supply sorts above any finite value.
fn supply_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => y.total_cmp(&x),
    }
}

pub struct SlowMoverAnalyzer;

impl Analyzer for SlowMoverAnalyzer {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::SlowMoverDetection
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> MerchResult<AnalysisReport> {
        let config = &ctx.config.slow_mover;
        let period = sales_period_days(&ctx.snapshot.sales, ctx.config.default_period_days);

        let velocity: Vec<VelocityRow> = ctx
            .aggregated
            .rows
            .iter()
            .map(|r| velocity_row(r, period, config))
            .collect();

        let mut slow_movers: Vec<SlowMover> = velocity
            .iter()
            .filter(|r| r.days_of_supply.map_or(true, |d| d >= config.days_threshold))
            .map(|r| SlowMover {
                urgency: urgency(r.days_of_supply, config),
                row: r.clone(),
            })
            .collect();
        slow_movers.sort_by(|a, b| supply_desc(a.row.days_of_supply, b.row.days_of_supply));

        let mut summary = Summary::new();
        insert(&mut summary, "total_skus_analyzed", velocity.len() as f64);
        insert(&mut summary, "slow_movers_count", slow_movers.len() as f64);
        insert(
            &mut summary,
            "critical_count",
            slow_movers.iter().filter(|s| s.urgency == Priority::Critical).count() as f64,
        );
        insert(
            &mut summary,
            "total_slow_inventory_value",
            slow_movers.iter().map(|s| s.row.inventory_value).sum(),
        );
        insert(&mut summary, "threshold_days", config.days_threshold);
        insert(&mut summary, "sales_period_days", period);

        let recommendations = recommendations(&slow_movers, ctx);

        Ok(AnalysisReport::SlowMoverDetection(SlowMoverReport {
            velocity_analysis: velocity,
            slow_movers,
            recommendations,
            summary,
        }))
    }
}

fn recommendations(slow_movers: &[SlowMover], ctx: &AnalysisContext<'_>) -> Vec<Recommendation> {
    let config = &ctx.config.slow_mover;
    let mut recs = Vec::new();
    if slow_movers.is_empty() {
        return recs;
    }

    let critical: Vec<&SlowMover> = slow_movers.iter().filter(|s| s.urgency == Priority::Critical).collect();
    if !critical.is_empty() {
        let value: f64 = critical.iter().map(|s| s.row.inventory_value).sum();
        recs.push(
            Recommendation::new(
                "markdown_urgent",
                Priority::Critical,
                format!("Immediate markdown needed for {} SKUs", critical.len()),
                format!("{} in dead inventory", money(value)),
                format!("These SKUs have no sales or {}+ days of inventory", config.critical_days),
            )
            .for_skus(critical.iter().map(|s| s.sku().to_string())),
        );
    }

    let high: Vec<&SlowMover> = slow_movers.iter().filter(|s| s.urgency == Priority::High).collect();
    if !high.is_empty() {
        let value: f64 = high.iter().map(|s| s.row.inventory_value).sum();
        recs.push(
            Recommendation::new(
                "markdown",
                Priority::High,
                format!("Markdown {} slow-moving SKUs", high.len()),
                format!("{} in slow inventory", money(value)),
                format!("These SKUs have {}+ days of inventory", config.days_threshold),
            )
            .for_skus(high.iter().map(|s| s.sku().to_string())),
        );
    }

    for mover in slow_movers.iter().take(ctx.config.report.max_listed) {
        let supply = match mover.row.days_of_supply {
            None => "No sales".to_string(),
            Some(d) => format!("{} days", d as i64),
        };
        recs.push(
            Recommendation::new(
                "sku_action",
                mover.urgency,
                format!("SKU {}: {} of inventory", mover.sku(), supply),
                format!("{} tied up", money(mover.row.inventory_value)),
                format!("Current velocity: {:.2} units/day", mover.row.units_per_day),
            )
            .for_skus([mover.sku()]),
        );
    }
    recs
}
