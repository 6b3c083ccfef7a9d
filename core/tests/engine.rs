use chrono::NaiveDate;
use merch_core::{
    analyzer::{AnalysisContext, AnalysisKind, AnalysisReport, Analyzer},
    config::AnalysisConfig,
    engine::AnalysisEngine,
    error::{MerchError, MerchResult},
    margin_analyzer::ContributionMarginAnalyzer,
    rationalization_analyzer::SkuRationalizationAnalyzer,
    recommendation::{ISSUE_CRITICAL_SLOW_MOVER, ISSUE_MONEY_LOSER, ISSUE_ZOMBIE},
    slow_mover_analyzer::InventoryAge,
    snapshot::{DataSnapshot, InventorySnapshot, ProductInfo, PurchaseEvent, SalesRecord, ViewEvent},
    source::{DateRange, InMemorySource},
    types::{Priority, Status},
};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn as_of() -> NaiveDate {
    date(2024, 6, 30)
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

fn stock(sku: &str, qty: f64, cost: f64) -> InventorySnapshot {
    InventorySnapshot {
        sku: sku.into(),
        quantity_on_hand: qty,
        cost_per_unit: cost,
    }
}

fn launched(sku: &str, on: Option<NaiveDate>) -> ProductInfo {
    ProductInfo {
        sku: sku.into(),
        product_name: Some(format!("{sku} product")),
        launch_date: on,
        ..Default::default()
    }
}

fn view(session: &str, sku: &str) -> ViewEvent {
    ViewEvent {
        sku: sku.into(),
        session_id: Some(session.into()),
        ..Default::default()
    }
}

fn bought(customer: &str, sku: &str) -> PurchaseEvent {
    PurchaseEvent {
        customer_id: customer.into(),
        sku: sku.into(),
        date: None,
    }
}

/// A small shop:
///   HERO / TWIN  strong sellers bought and viewed together
///   LOSER        sells below cost
///   ZOMBIE       stock with no sales
///   LAUNCH       twenty-day-old launch that barely sold
///   VIEWONLY     browsed but never sold
fn shop() -> DataSnapshot {
    let veteran = Some(date(2024, 1, 1));
    DataSnapshot {
        sales: vec![
            sale("HERO", date(2024, 1, 5), 800.0, 40.0),
            sale("HERO", date(2024, 6, 1), 1000.0, 50.0),
            sale("TWIN", date(2024, 1, 10), 300.0, 10.0),
            sale("TWIN", date(2024, 6, 29), 400.0, 20.0),
            sale("LOSER", date(2024, 6, 2), 100.0, 10.0),
            sale("LAUNCH", date(2024, 6, 15), 10.0, 1.0),
        ],
        inventory: vec![
            stock("HERO", 20.0, 5.0),
            stock("TWIN", 10.0, 5.0),
            stock("LOSER", 1.0, 20.0),
            stock("ZOMBIE", 50.0, 2.0),
        ],
        products: vec![
            launched("HERO", veteran),
            launched("TWIN", veteran),
            launched("LOSER", None),
            launched("ZOMBIE", None),
            launched("LAUNCH", Some(date(2024, 6, 10))),
        ],
        views: vec![
            view("s1", "HERO"),
            view("s1", "TWIN"),
            view("s2", "HERO"),
            view("s2", "TWIN"),
            view("s3", "VIEWONLY"),
        ],
        purchases: vec![
            bought("c1", "HERO"),
            bought("c1", "TWIN"),
            bought("c2", "HERO"),
            bought("c2", "TWIN"),
        ],
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn run(snapshot: &DataSnapshot) -> merch_core::engine::AnalysisResults {
    init_logging();
    AnalysisEngine::build(AnalysisConfig::default()).run(snapshot, as_of())
}

struct FailingAnalyzer;

impl Analyzer for FailingAnalyzer {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::ContributionMargin
    }

    fn analyze(&self, _ctx: &AnalysisContext<'_>) -> MerchResult<AnalysisReport> {
        Err(MerchError::AnalysisFailed {
            analysis: "contribution_margin".into(),
            reason: "injected".into(),
        })
    }
}

struct PanickingAnalyzer;

impl Analyzer for PanickingAnalyzer {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::BundleOpportunities
    }

    fn analyze(&self, _ctx: &AnalysisContext<'_>) -> MerchResult<AnalysisReport> {
        panic!("injected panic");
    }
}

struct MislabelledAnalyzer;

impl Analyzer for MislabelledAnalyzer {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::Cannibalization
    }

    fn analyze(&self, _ctx: &AnalysisContext<'_>) -> MerchResult<AnalysisReport> {
        Ok(AnalysisReport::empty(AnalysisKind::NewProductScoring))
    }
}

// ── Scenario checks ─────────────────────────────────────────────────────────

#[test]
fn zombie_is_red_with_zombie_issue() {
    let results = run(&shop());

    let zombies = results.sku_rationalization.zombie_skus();
    assert_eq!(zombies, vec!["ZOMBIE"]);
    assert_eq!(results.sku_rationalization.zombie_skus[0].score.working_capital, 100.0);
    assert_eq!(results.sku_rationalization.financial_impact.working_capital_freed, 100.0);

    let entry = results.status_of("ZOMBIE").expect("zombie has a status");
    assert_eq!(entry.status, Status::Red);
    assert_eq!(entry.issues, vec![ISSUE_ZOMBIE, ISSUE_CRITICAL_SLOW_MOVER]);
    assert!(
        entry.recommendations.iter().any(|a| a == "Discontinue SKU: ZOMBIE"),
        "Per-sku actions are attached to the status entry"
    );
}

#[test]
fn money_loser_is_yellow() {
    let results = run(&shop());
    assert_eq!(results.contribution_margin.money_loser_skus(), vec!["LOSER"]);

    let entry = results.status_of("LOSER").unwrap();
    assert_eq!(entry.status, Status::Yellow);
    assert_eq!(entry.issues, vec![ISSUE_MONEY_LOSER]);
}

#[test]
fn identical_buyers_form_a_cannibalization_pair() {
    let results = run(&shop());
    let pairs = &results.cannibalization.cannibalization_pairs;

    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].overlap.value, 1.0);
    assert_eq!(pairs[0].stronger_sku, "HERO");
    assert_eq!(pairs[0].weaker_sku, "TWIN");
    assert_eq!(pairs[0].revenue_at_risk, 700.0, "Risk is the smaller revenue");
    assert_eq!(results.cannibalization.impact.potential_consolidation_savings, 140.0);
    assert_eq!(results.cannibalization.summary["high_risk_pairs"], 1.0);
}

#[test]
fn co_viewed_pair_becomes_a_bundle() {
    let results = run(&shop());
    let bundles = &results.bundle_opportunities.bundle_opportunities;

    assert_eq!(bundles.len(), 1);
    let b = &bundles[0];
    assert_eq!((b.correlation.sku_a.as_str(), b.correlation.sku_b.as_str()), ("HERO", "TWIN"));
    assert_eq!(b.combined_revenue, 2500.0);
    assert!((b.bundle_price - 2250.0).abs() < 1e-9);
    assert!((b.potential_revenue - 2250.0 * 2.0 * 0.15).abs() < 1e-6);
}

#[test]
fn weak_launch_is_an_underperformer() {
    let results = run(&shop());
    let report = &results.new_product_scoring;

    assert_eq!(report.new_products.len(), 1);
    assert_eq!(report.underperformer_skus(), vec!["LAUNCH"]);
    let entry = results.status_of("LAUNCH").unwrap();
    assert_eq!(entry.status, Status::Yellow);
}

#[test]
fn no_sales_means_infinite_supply() {
    let results = run(&shop());
    let zombie = results
        .slow_mover_detection
        .velocity_analysis
        .iter()
        .find(|r| r.sku == "ZOMBIE")
        .unwrap();
    assert_eq!(zombie.days_of_supply, None);
    assert_eq!(zombie.age_category, InventoryAge::NoSales);
    assert_eq!(results.slow_mover_detection.critical_skus(), vec!["ZOMBIE"]);
    assert_eq!(results.analysis_period_days, 176.0, "Jan 5 to Jun 29");
}

#[test]
fn every_observed_sku_has_a_status() {
    let results = run(&shop());
    let skus: Vec<&str> = results.traffic_light_status.keys().map(String::as_str).collect();
    assert_eq!(skus, vec!["HERO", "LAUNCH", "LOSER", "TWIN", "VIEWONLY", "ZOMBIE"]);
    assert_eq!(results.status_of("VIEWONLY").unwrap().status, Status::Green);
}

#[test]
fn consolidated_list_is_priority_sorted_and_stable() {
    let results = run(&shop());
    let ranks: Vec<u8> = results
        .consolidated_recommendations
        .iter()
        .map(|r| r.priority.rank())
        .collect();
    assert!(ranks.windows(2).all(|w| w[0] <= w[1]), "Priorities out of order: {ranks:?}");

    for kind in AnalysisKind::ALL {
        let report = results.report(kind);
        for priority in [0u8, 1, 2, 3] {
            let emitted: Vec<&str> = report
                .recommendations()
                .iter()
                .filter(|r| r.priority.rank() == priority)
                .map(|r| r.action.as_str())
                .collect();
            let consolidated: Vec<&str> = results
                .consolidated_recommendations
                .iter()
                .filter(|r| r.source_analysis == Some(kind) && r.priority.rank() == priority)
                .map(|r| r.action.as_str())
                .collect();
            assert_eq!(emitted, consolidated, "{} lost emission order", kind.name());
        }
    }
}

#[test]
fn executive_summary_reflects_reports() {
    let results = run(&shop());
    let summary = &results.executive_summary;

    assert_eq!(summary.key_metrics.total_skus, 5);
    assert_eq!(summary.key_metrics.zombie_skus, 1);
    assert_eq!(summary.key_metrics.losing_skus, 1);
    assert_eq!(summary.key_metrics.cannibalization_pairs, 1);
    assert_eq!(summary.key_metrics.bundle_opportunities, 1);
    assert_eq!(summary.financial_impact.working_capital_freed, 100.0);
    assert!(summary.top_recommendations.len() <= 10);
    assert_eq!(
        summary.top_recommendations[..],
        results.consolidated_recommendations[..summary.top_recommendations.len()]
    );
}

// ── Ranking and insights ────────────────────────────────────────────────────

#[test]
fn equal_correlation_bundles_rank_by_combined_revenue() {
    let snapshot = DataSnapshot {
        sales: vec![
            sale("A", date(2024, 6, 1), 10.0, 1.0),
            sale("B", date(2024, 6, 1), 10.0, 1.0),
            sale("C", date(2024, 6, 1), 500.0, 5.0),
            sale("D", date(2024, 6, 1), 400.0, 4.0),
        ],
        views: vec![view("s1", "A"), view("s1", "B"), view("s2", "C"), view("s2", "D")],
        ..Default::default()
    };
    let results = run(&snapshot);
    let bundles = &results.bundle_opportunities.bundle_opportunities;

    let order: Vec<(&str, &str)> = bundles
        .iter()
        .map(|b| (b.correlation.sku_a.as_str(), b.correlation.sku_b.as_str()))
        .collect();
    assert_eq!(order, vec![("C", "D"), ("A", "B")], "Ties break on combined revenue");
    assert_eq!(bundles[0].correlation.value, bundles[1].correlation.value);
    assert_eq!(bundles[0].combined_revenue, 900.0);
    assert_eq!(bundles[1].combined_revenue, 20.0);
}

/// BIG sells the most but keeps 5% of it; the rest are healthy.
fn margin_shop() -> DataSnapshot {
    let on = date(2024, 6, 1);
    DataSnapshot {
        sales: vec![
            sale("BIG", on, 1000.0, 10.0),
            sale("S2", on, 300.0, 10.0),
            sale("S3", on, 200.0, 10.0),
            sale("S4", on, 100.0, 10.0),
        ],
        inventory: vec![
            stock("BIG", 1.0, 95.0),
            stock("S2", 1.0, 10.0),
            stock("S3", 1.0, 10.0),
            stock("S4", 1.0, 5.0),
        ],
        ..Default::default()
    }
}

#[test]
fn margin_insights_flag_focus_group_and_thin_bestsellers() {
    init_logging();
    let mut config = AnalysisConfig::default();
    config.margin.top_focus_count = 2;
    let results = AnalysisEngine::build(config).run(&margin_shop(), as_of());
    let recs = &results.contribution_margin.recommendations;

    let kinds: Vec<(&str, Priority)> = recs.iter().map(|r| (r.kind.as_str(), r.priority)).collect();
    assert_eq!(
        kinds,
        vec![("focus_opportunity", Priority::Low), ("low_margin_bestsellers", Priority::Medium)]
    );
    assert_eq!(recs[0].skus, vec!["S2", "S3"], "Top two by contribution margin");
    assert_eq!(recs[0].impact, "Top 2 SKUs generate 75.0% of total profit");
    assert_eq!(recs[1].skus, vec!["BIG"], "Above the p70 revenue cut with a 5% margin");
}

#[test]
fn focus_insight_needs_more_skus_than_the_focus_group() {
    let results = run(&margin_shop());
    let kinds: Vec<&str> = results
        .contribution_margin
        .recommendations
        .iter()
        .map(|r| r.kind.as_str())
        .collect();
    assert_eq!(kinds, vec!["low_margin_bestsellers"], "Four skus never exceed the default 30");
}

// ── Degraded input ──────────────────────────────────────────────────────────

#[test]
fn empty_snapshot_gives_empty_results() {
    let results = run(&DataSnapshot::default());

    assert!(results.diagnostics.is_empty(), "Empty input is not a failure");
    assert!(results.consolidated_recommendations.is_empty());
    assert!(results.traffic_light_status.is_empty());
    assert!(results.sku_rationalization.zombie_skus.is_empty());
    assert!(results.cannibalization.overlap_matrix.is_empty());
    assert_eq!(results.analysis_period_days, 90.0, "Default period without dated sales");
    assert_eq!(results.slow_mover_detection.summary["slow_movers_count"], 0.0);
}

#[test]
fn failing_components_are_contained() {
    init_logging();
    let mut engine = AnalysisEngine::new(AnalysisConfig::default());
    engine.register(Box::new(SkuRationalizationAnalyzer));
    engine.register(Box::new(FailingAnalyzer));
    engine.register(Box::new(PanickingAnalyzer));
    engine.register(Box::new(MislabelledAnalyzer));
    let results = engine.run(&shop(), as_of());

    assert_eq!(results.diagnostics.len(), 3);
    assert!(results.failed(AnalysisKind::ContributionMargin));
    assert!(results.failed(AnalysisKind::BundleOpportunities));
    assert!(results.failed(AnalysisKind::Cannibalization));
    assert!(results.diagnostics[1].message.contains("injected panic"));

    assert!(results.contribution_margin.ranked_products.is_empty());
    assert!(results.bundle_opportunities.bundle_opportunities.is_empty());
    assert_eq!(
        results.sku_rationalization.zombie_skus(),
        vec!["ZOMBIE"],
        "Healthy components keep their results"
    );
    assert_eq!(results.status_of("ZOMBIE").unwrap().status, Status::Red);
    assert_eq!(
        results.status_of("LOSER").unwrap().status,
        Status::Green,
        "Findings of a failed component are absent, not guessed"
    );
}

#[test]
fn registered_order_drives_emission_order() {
    let mut engine = AnalysisEngine::new(AnalysisConfig::default());
    engine.register(Box::new(ContributionMarginAnalyzer));
    engine.register(Box::new(SkuRationalizationAnalyzer));
    let results = engine.run(&shop(), as_of());

    let high: Vec<AnalysisKind> = results
        .consolidated_recommendations
        .iter()
        .filter(|r| r.priority.rank() == 1)
        .filter_map(|r| r.source_analysis)
        .collect();
    assert_eq!(high.first(), Some(&AnalysisKind::ContributionMargin));
    assert_eq!(high.last(), Some(&AnalysisKind::SkuRationalization));
}

#[test]
fn run_from_source_filters_by_range() {
    let source = InMemorySource::new(shop());
    let engine = AnalysisEngine::build(AnalysisConfig::default());
    let range = DateRange::last_days(as_of(), 90);
    let results = engine.run_from_source(&source, range, date(2030, 1, 1)).unwrap();

    assert_eq!(results.as_of, as_of(), "Range end anchors the run");
    let hero = results
        .contribution_margin
        .ranked_products
        .iter()
        .find(|r| r.sku() == "HERO")
        .unwrap();
    assert_eq!(hero.score.revenue(), 1000.0, "January sales fall outside the range");
}
