//! Benchmark comparator: grades new launches against the historical
//! launch curve of every product.
//!
//! For each age window W the reference population is every sku with sales
//! recorded between 0 and W days after its launch date (new or not). A new
//! product's window revenue and units are scored against the population's
//! benchmark quantile (p75 by default), capped at 1.0.

use crate::{
    config::NewProductConfig,
    snapshot::{ProductInfo, SalesRecord},
    stats,
    types::{Days, Sku},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowBenchmark {
    pub window_days: u32,
    /// Skus in the reference population.
    pub population: usize,
    pub revenue_p50: Option<f64>,
    pub revenue_p75: Option<f64>,
    pub revenue_p90: Option<f64>,
    pub units_p50: Option<f64>,
    pub units_p75: Option<f64>,
    pub units_p90: Option<f64>,
    /// Value at the configured benchmark quantile.
    pub revenue_target: Option<f64>,
    pub units_target: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: Sku,
    pub product_name: Option<String>,
    pub category: Option<String>,
    pub launch_date: NaiveDate,
    pub days_since_launch: Days,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowScore {
    pub window_days: u32,
    pub revenue: f64,
    pub units: f64,
    pub revenue_score: f64,
    pub units_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchCategory {
    Winner,
    Solid,
    Underperforming,
    Poor,
    InsufficientData,
}

impl LaunchCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            LaunchCategory::Winner           => "winner",
            LaunchCategory::Solid            => "solid",
            LaunchCategory::Underperforming  => "underperforming",
            LaunchCategory::Poor             => "poor",
            LaunchCategory::InsufficientData => "insufficient_data",
        }
    }

    pub fn is_underperformer(self) -> bool {
        matches!(self, LaunchCategory::Underperforming | LaunchCategory::Poor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchScore {
    pub product: NewProduct,
    pub windows: Vec<WindowScore>,
    /// `None` when no window could be scored.
    pub overall_score: Option<f64>,
    pub category: LaunchCategory,
}

impl LaunchScore {
    pub fn sku(&self) -> &str {
        &self.product.sku
    }
}

// ── Operations ───────────────────────────────────────────────────────────────

/// Products launched within the largest window before `now`.
pub fn identify_new_products(
    products: &[ProductInfo],
    windows: &[u32],
    now: NaiveDate,
) -> Vec<NewProduct> {
    let Some(&max_window) = windows.iter().max() else {
        return Vec::new();
    };
    let cutoff = now - chrono::Duration::days(max_window as i64);

    products
        .iter()
        .filter_map(|p| {
            let launch = p.launch_date?;
            (launch >= cutoff).then(|| NewProduct {
                sku: p.sku.clone(),
                product_name: p.product_name.clone(),
                category: p.category.clone(),
                launch_date: launch,
                days_since_launch: (now - launch).num_days(),
            })
        })
        .collect()
}

/// Revenue and units per sku from sales dated 0..=window days after launch.
/// Sales without a date, or skus without a launch date, are excluded.
pub fn window_totals(
    sales: &[SalesRecord],
    launch_dates: &HashMap<&str, NaiveDate>,
    window_days: u32,
) -> BTreeMap<Sku, (f64, f64)> {
    let mut totals: BTreeMap<Sku, (f64, f64)> = BTreeMap::new();
    for sale in sales {
        let (Some(date), Some(launch)) = (sale.date, launch_dates.get(sale.sku.as_str())) else {
            continue;
        };
        let age = (date - *launch).num_days();
        if (0..=window_days as i64).contains(&age) {
            let entry = totals.entry(sale.sku.clone()).or_insert((0.0, 0.0));
            entry.0 += sale.revenue;
            entry.1 += sale.units;
        }
    }
    totals
}

pub fn launch_dates(products: &[ProductInfo]) -> HashMap<&str, NaiveDate> {
    products
        .iter()
        .filter_map(|p| p.launch_date.map(|d| (p.sku.as_str(), d)))
        .collect()
}

pub fn benchmark_for(
    totals: &BTreeMap<Sku, (f64, f64)>,
    window_days: u32,
    benchmark_quantile: f64,
) -> WindowBenchmark {
    let revenue: Vec<f64> = totals.values().map(|t| t.0).collect();
    let units: Vec<f64> = totals.values().map(|t| t.1).collect();
    WindowBenchmark {
        window_days,
        population: totals.len(),
        revenue_p50: stats::quantile_opt(&revenue, 0.5),
        revenue_p75: stats::quantile_opt(&revenue, 0.75),
        revenue_p90: stats::quantile_opt(&revenue, 0.9),
        units_p50: stats::quantile_opt(&units, 0.5),
        units_p75: stats::quantile_opt(&units, 0.75),
        units_p90: stats::quantile_opt(&units, 0.9),
        revenue_target: stats::quantile_opt(&revenue, benchmark_quantile),
        units_target: stats::quantile_opt(&units, benchmark_quantile),
    }
}

/// `min(actual / target, 1)`, or 0 when the target is zero or undefined.
pub fn capped_score(actual: f64, target: Option<f64>) -> f64 {
    match target {
        Some(t) if t > 0.0 => (actual / t).min(1.0),
        _ => 0.0,
    }
}

pub fn categorize(score: Option<f64>, config: &NewProductConfig) -> LaunchCategory {
    match score {
        None => LaunchCategory::InsufficientData,
        Some(s) if s.is_nan() => LaunchCategory::InsufficientData,
        Some(s) if s >= config.winner_score => LaunchCategory::Winner,
        Some(s) if s >= config.solid_score => LaunchCategory::Solid,
        Some(s) if s >= config.underperforming_score => LaunchCategory::Underperforming,
        Some(_) => LaunchCategory::Poor,
    }
}

/// Benchmarks per window and a score for every new product.
pub fn score_launches(
    sales: &[SalesRecord],
    products: &[ProductInfo],
    config: &NewProductConfig,
    now: NaiveDate,
) -> (Vec<WindowBenchmark>, Vec<LaunchScore>) {
    let new_products = identify_new_products(products, &config.windows, now);
    if new_products.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let launches = launch_dates(products);
    let per_window: Vec<(WindowBenchmark, BTreeMap<Sku, (f64, f64)>)> = config
        .windows
        .iter()
        .map(|&w| {
            let totals = window_totals(sales, &launches, w);
            (benchmark_for(&totals, w, config.benchmark_quantile), totals)
        })
        .collect();

    let scores = new_products
        .into_iter()
        .map(|product| {
            let windows: Vec<WindowScore> = per_window
                .iter()
                .map(|(bench, totals)| match totals.get(&product.sku) {
                    Some(&(revenue, units)) => WindowScore {
                        window_days: bench.window_days,
                        revenue,
                        units,
                        revenue_score: capped_score(revenue, bench.revenue_target),
                        units_score: capped_score(units, bench.units_target),
                    },
                    None => WindowScore {
                        window_days: bench.window_days,
                        revenue: 0.0,
                        units: 0.0,
                        revenue_score: 0.0,
                        units_score: 0.0,
                    },
                })
                .collect();

            let revenue_scores: Vec<f64> = windows.iter().map(|w| w.revenue_score).collect();
            let units_scores: Vec<f64> = windows.iter().map(|w| w.units_score).collect();
            let overall_score = match (stats::mean(&revenue_scores), stats::mean(&units_scores)) {
                (Some(r), Some(u)) => Some(r * config.revenue_weight + u * config.units_weight),
                _ => None,
            };

            LaunchScore {
                category: categorize(overall_score, config),
                product,
                windows,
                overall_score,
            }
        })
        .collect();

    let benchmarks = per_window.into_iter().map(|(b, _)| b).collect();
    (benchmarks, scores)
}
