//! merch-runner: headless analysis runner.
//!
//! Usage:
//!   merch-runner --data-dir ./data --days 90
//!   merch-runner --db shop.db --as-of 2024-06-30 --config analysis.json --json
//!
//! Exactly one of --data-dir / --db selects the data source. Without
//! --as-of the run is anchored at today.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use merch_core::{
    config::AnalysisConfig,
    engine::{AnalysisEngine, AnalysisResults},
    source::{DataSource, DateRange, JsonDirSource},
    store::SqliteSource,
    types::Status,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let days = parse_arg(&args, "--days", 90u32);
    let json_output = args.iter().any(|a| a == "--json");
    let sequential = args.iter().any(|a| a == "--sequential");
    let data_dir = flag_value(&args, "--data-dir");
    let db = flag_value(&args, "--db");
    let config_path = flag_value(&args, "--config");

    let as_of = match flag_value(&args, "--as-of") {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .with_context(|| format!("--as-of must be YYYY-MM-DD, got {raw}"))?,
        None => chrono::Local::now().date_naive(),
    };

    let mut config = match config_path {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    if sequential {
        config.parallel = false;
    }

    let source: Box<dyn DataSource> = match (data_dir, db) {
        (Some(dir), None) => Box::new(JsonDirSource::open(dir)?),
        (None, Some(path)) => Box::new(SqliteSource::open(path)?),
        (None, None) => Box::new(JsonDirSource::open("./data")?),
        (Some(_), Some(_)) => bail!("--data-dir and --db are mutually exclusive"),
    };

    if !json_output {
        println!("merch-runner");
        println!("  source:    {}", source.name());
        println!("  as of:     {as_of}");
        println!("  days:      {days}");
        println!("  config:    {}", config_path.unwrap_or("(defaults)"));
        println!("  parallel:  {}", config.parallel);
        println!();
    }

    let engine = AnalysisEngine::build(config);
    let range = DateRange::last_days(as_of, days);
    log::debug!("Fetching {:?}..={:?} from {}", range.start, range.end, source.name());
    let results = engine.run_from_source(source.as_ref(), range, as_of)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_summary(&results);
    }
    Ok(())
}

fn print_summary(results: &AnalysisResults) {
    let summary = &results.executive_summary;
    let metrics = &summary.key_metrics;
    let money = &summary.financial_impact;

    println!("=== RUN SUMMARY ===");
    println!("  as of:            {}", results.as_of);
    println!("  period (days):    {:.0}", results.analysis_period_days);
    println!("  skus:             {}", metrics.total_skus);
    println!("  zombies:          {}", metrics.zombie_skus);
    println!("  profitable skus:  {}", metrics.profitable_skus);
    println!("  losing skus:      {}", metrics.losing_skus);
    println!("  slow movers:      {}", metrics.slow_movers);
    println!("  cannibal pairs:   {}", metrics.cannibalization_pairs);
    println!("  new products:     {}", metrics.new_products);
    println!("  underperforming:  {}", metrics.underperforming_new_products);
    println!("  bundle ideas:     {}", metrics.bundle_opportunities);

    println!();
    println!("=== FINANCIAL IMPACT ===");
    println!("  capital freed:    ${:.0}", money.working_capital_freed);
    println!("  bundle revenue:   ${:.0}", money.potential_bundle_revenue);
    println!("  total profit:     ${:.0}", money.total_profit);
    println!("  revenue at risk:  ${:.0}", money.revenue_at_risk);

    let count = |status: Status| {
        results
            .traffic_light_status
            .values()
            .filter(|e| e.status == status)
            .count()
    };
    println!();
    println!("=== TRAFFIC LIGHT ===");
    println!(
        "  red: {} | yellow: {} | green: {}",
        count(Status::Red),
        count(Status::Yellow),
        count(Status::Green)
    );

    println!();
    println!("=== TOP RECOMMENDATIONS ===");
    if summary.top_recommendations.is_empty() {
        println!("  (No recommendations)");
    }
    for rec in &summary.top_recommendations {
        println!("  [{:<8}] {} | {}", rec.priority.as_str(), rec.action, rec.impact);
    }

    for failure in &results.diagnostics {
        println!();
        println!("  WARNING: {} failed: {}", failure.analysis.name(), failure.message);
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
