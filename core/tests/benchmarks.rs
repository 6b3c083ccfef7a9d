use chrono::NaiveDate;
use merch_core::{
    benchmark::{self, LaunchCategory},
    config::NewProductConfig,
    snapshot::{ProductInfo, SalesRecord},
};
use std::collections::{BTreeMap, HashMap};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn now() -> NaiveDate {
    date(2024, 6, 30)
}

fn product(sku: &str, launch: Option<NaiveDate>) -> ProductInfo {
    ProductInfo {
        sku: sku.into(),
        launch_date: launch,
        ..Default::default()
    }
}

fn sale(sku: &str, on: NaiveDate, revenue: f64, units: f64) -> SalesRecord {
    SalesRecord {
        sku: sku.into(),
        date: Some(on),
        revenue,
        units,
        ..Default::default()
    }
}

/// Four catalog veterans with known first-month sales, plus one launch
/// ten days ago that sold 900.
fn launch_fixture() -> (Vec<SalesRecord>, Vec<ProductInfo>) {
    let veteran_launch = date(2023, 1, 1);
    let mut products = vec![product("NEW", Some(date(2024, 6, 20)))];
    let mut sales = vec![sale("NEW", date(2024, 6, 25), 900.0, 9.0)];
    for (i, revenue) in [100.0, 200.0, 300.0, 400.0].into_iter().enumerate() {
        let sku = format!("OLD{i}");
        products.push(product(&sku, Some(veteran_launch)));
        sales.push(sale(&sku, date(2023, 1, 10), revenue, (i + 1) as f64));
    }
    (sales, products)
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[test]
fn new_products_are_launched_within_the_largest_window() {
    let products = vec![
        product("EDGE", Some(date(2024, 4, 1))),
        product("OLD", Some(date(2024, 3, 31))),
        product("UNDATED", None),
        product("FRESH", Some(date(2024, 6, 29))),
    ];
    let found = benchmark::identify_new_products(&products, &[30, 60, 90], now());
    let skus: Vec<&str> = found.iter().map(|p| p.sku.as_str()).collect();

    assert_eq!(skus, vec!["EDGE", "FRESH"], "Exactly 90 days old still counts");
    assert_eq!(found[0].days_since_launch, 90);
    assert_eq!(found[1].days_since_launch, 1);
}

#[test]
fn benchmark_population_includes_every_launch_curve() {
    let (sales, products) = launch_fixture();
    let launches = benchmark::launch_dates(&products);
    let totals = benchmark::window_totals(&sales, &launches, 30);
    let bench = benchmark::benchmark_for(&totals, 30, 0.75);

    assert_eq!(bench.population, 5, "Veterans and the new launch form the population");
    assert_eq!(bench.revenue_p50, Some(300.0));
    assert_eq!(bench.revenue_p75, Some(400.0));
    assert!((bench.revenue_p90.unwrap() - 700.0).abs() < 1e-9);
    assert_eq!(bench.revenue_target, bench.revenue_p75);
}

#[test]
fn sales_outside_the_window_are_excluded() {
    let launches: HashMap<&str, NaiveDate> = [("A", date(2024, 1, 1))].into_iter().collect();
    let sales = vec![
        sale("A", date(2023, 12, 31), 50.0, 1.0),
        sale("A", date(2024, 1, 1), 10.0, 1.0),
        sale("A", date(2024, 1, 31), 20.0, 1.0),
        sale("A", date(2024, 2, 1), 40.0, 1.0),
        SalesRecord { sku: "A".into(), revenue: 99.0, ..Default::default() },
    ];
    let totals = benchmark::window_totals(&sales, &launches, 30);
    assert_eq!(totals.get("A"), Some(&(30.0, 2.0)), "Days 0 and 30 inclusive, undated excluded");
}

#[test]
fn ten_day_launch_above_p90_caps_revenue_score_at_one() {
    let (sales, products) = launch_fixture();
    let (benchmarks, scores) =
        benchmark::score_launches(&sales, &products, &NewProductConfig::default(), now());

    assert_eq!(benchmarks.len(), 3);
    assert_eq!(scores.len(), 1);
    let launch = &scores[0];
    assert_eq!(launch.sku(), "NEW");
    assert_eq!(launch.product.days_since_launch, 10);

    let first = &launch.windows[0];
    assert_eq!(first.window_days, 30);
    assert!(first.revenue > 2.0 * benchmarks[0].revenue_p75.unwrap());
    assert_eq!(first.revenue_score, 1.0, "Score is capped, never above 1");
    assert_eq!(launch.overall_score, Some(1.0));
    assert_eq!(launch.category, LaunchCategory::Winner);
}

#[test]
fn launch_without_sales_scores_zero() {
    let (sales, mut products) = launch_fixture();
    products.push(product("SILENT", Some(date(2024, 6, 1))));
    let (_, scores) = benchmark::score_launches(&sales, &products, &NewProductConfig::default(), now());

    let silent = scores.iter().find(|s| s.sku() == "SILENT").unwrap();
    assert!(silent.windows.iter().all(|w| w.revenue_score == 0.0 && w.units_score == 0.0));
    assert_eq!(silent.overall_score, Some(0.0));
    assert_eq!(silent.category, LaunchCategory::Poor);
    assert!(silent.category.is_underperformer());
}

#[test]
fn overall_score_weights_revenue_and_units() {
    let launches: HashMap<&str, NaiveDate> =
        [("A", date(2024, 6, 1)), ("B", date(2024, 6, 1))].into_iter().collect();
    let sales = vec![
        sale("A", date(2024, 6, 2), 100.0, 10.0),
        sale("B", date(2024, 6, 2), 50.0, 10.0),
    ];
    let totals = benchmark::window_totals(&sales, &launches, 30);
    let bench = benchmark::benchmark_for(&totals, 30, 0.75);
    // p75 of [50, 100] = 87.5, of [10, 10] = 10
    assert_eq!(bench.revenue_target, Some(87.5));
    assert_eq!(benchmark::capped_score(50.0, bench.revenue_target), 50.0 / 87.5);
    assert_eq!(benchmark::capped_score(10.0, bench.units_target), 1.0);

    let products = vec![product("B", Some(date(2024, 6, 1))), product("A", Some(date(2024, 6, 1)))];
    let config = NewProductConfig { windows: vec![30], ..Default::default() };
    let (_, scores) = benchmark::score_launches(&sales, &products, &config, now());
    let b = scores.iter().find(|s| s.sku() == "B").unwrap();
    let expected = (50.0 / 87.5) * 0.6 + 1.0 * 0.4;
    assert!((b.overall_score.unwrap() - expected).abs() < 1e-12);
    assert_eq!(b.category, LaunchCategory::Solid);
}

#[test]
fn undefined_targets_score_zero() {
    assert_eq!(benchmark::capped_score(10.0, None), 0.0);
    assert_eq!(benchmark::capped_score(10.0, Some(0.0)), 0.0);
    let empty = benchmark::benchmark_for(&BTreeMap::new(), 30, 0.75);
    assert_eq!(empty.population, 0);
    assert_eq!(empty.revenue_target, None);
}

#[test]
fn categories_follow_score_ladder() {
    let config = NewProductConfig::default();
    assert_eq!(benchmark::categorize(None, &config), LaunchCategory::InsufficientData);
    assert_eq!(benchmark::categorize(Some(f64::NAN), &config), LaunchCategory::InsufficientData);
    assert_eq!(benchmark::categorize(Some(0.8), &config), LaunchCategory::Winner);
    assert_eq!(benchmark::categorize(Some(0.6), &config), LaunchCategory::Solid);
    assert_eq!(benchmark::categorize(Some(0.4), &config), LaunchCategory::Underperforming);
    assert_eq!(benchmark::categorize(Some(0.39), &config), LaunchCategory::Poor);
}

#[test]
fn no_new_products_means_no_benchmarks() {
    let products = vec![product("OLD", Some(date(2020, 1, 1)))];
    let (benchmarks, scores) = benchmark::score_launches(&[], &products, &NewProductConfig::default(), now());
    assert!(benchmarks.is_empty());
    assert!(scores.is_empty());
}
