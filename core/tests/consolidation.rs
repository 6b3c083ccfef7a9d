use merch_core::{
    analyzer::AnalysisKind,
    recommendation::{
        apply_rules, consolidate, merge_status_maps, traffic_light_status, Recommendation, StatusEntry,
        StatusFindings, ISSUE_CRITICAL_SLOW_MOVER, ISSUE_MONEY_LOSER, ISSUE_UNDERPERFORMING_LAUNCH,
        ISSUE_ZOMBIE, MONEY_LOSER_RULE, UNDERPERFORMING_LAUNCH_RULE, ZOMBIE_RULE,
    },
    types::{Priority, Sku, Status},
};
use std::collections::{BTreeMap, BTreeSet};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn rec(kind: &str, priority: Priority) -> Recommendation {
    Recommendation::new(kind, priority, format!("do {kind}"), "", "")
}

fn skus(list: &[&str]) -> BTreeSet<Sku> {
    list.iter().map(|s| s.to_string()).collect()
}

fn owned(list: &[&str]) -> Vec<Sku> {
    list.iter().map(|s| s.to_string()).collect()
}

// ── Consolidation ───────────────────────────────────────────────────────────

#[test]
fn consolidation_sorts_by_priority_and_keeps_emission_order() {
    let first = vec![rec("a1", Priority::Medium), rec("a2", Priority::High), rec("a3", Priority::Medium)];
    let second = vec![rec("b1", Priority::Critical), rec("b2", Priority::Medium), rec("b3", Priority::Low)];

    let merged = consolidate([
        (AnalysisKind::SkuRationalization, first.as_slice()),
        (AnalysisKind::SlowMoverDetection, second.as_slice()),
    ]);
    let kinds: Vec<&str> = merged.iter().map(|r| r.kind.as_str()).collect();

    assert_eq!(kinds, vec!["b1", "a2", "a1", "a3", "b2", "b3"]);
    assert_eq!(merged[0].source_analysis, Some(AnalysisKind::SlowMoverDetection));
    assert_eq!(merged[1].source_analysis, Some(AnalysisKind::SkuRationalization));
}

#[test]
fn consolidating_nothing_is_empty() {
    let merged = consolidate(std::iter::empty::<(AnalysisKind, &[Recommendation])>());
    assert!(merged.is_empty());
}

// ── Status rules ────────────────────────────────────────────────────────────

#[test]
fn every_observed_sku_starts_green() {
    let map = apply_rules(&skus(&["A", "B"]), StatusFindings::default().ordered_rules());
    assert_eq!(map.len(), 2);
    assert!(map.values().all(|e| e.status == Status::Green && e.issues.is_empty()));
}

#[test]
fn zombie_turns_red() {
    let findings = StatusFindings {
        zombies: owned(&["A"]),
        ..Default::default()
    };
    let map = apply_rules(&skus(&["A", "B"]), findings.ordered_rules());
    assert_eq!(map["A"].status, Status::Red);
    assert_eq!(map["A"].issues, vec![ISSUE_ZOMBIE]);
    assert_eq!(map["B"].status, Status::Green);
}

#[test]
fn money_loser_on_red_sku_adds_issue_without_downgrade() {
    let findings = StatusFindings {
        zombies: owned(&["A"]),
        money_losers: owned(&["A", "B"]),
        ..Default::default()
    };
    let map = apply_rules(&skus(&["A", "B"]), findings.ordered_rules());

    assert_eq!(map["A"].status, Status::Red, "Red never drops to yellow");
    assert_eq!(map["A"].issues, vec![ISSUE_ZOMBIE, ISSUE_MONEY_LOSER]);
    assert_eq!(map["B"].status, Status::Yellow);
}

#[test]
fn underperforming_launch_only_flags_green_skus() {
    let findings = StatusFindings {
        money_losers: owned(&["A"]),
        underperforming_launches: owned(&["A", "B"]),
        ..Default::default()
    };
    let map = apply_rules(&skus(&["A", "B"]), findings.ordered_rules());

    assert_eq!(map["A"].status, Status::Yellow);
    assert_eq!(map["A"].issues, vec![ISSUE_MONEY_LOSER], "Rule is skipped for non-green skus");
    assert_eq!(map["B"].status, Status::Yellow);
    assert_eq!(map["B"].issues, vec![ISSUE_UNDERPERFORMING_LAUNCH]);
}

#[test]
fn critical_slow_mover_escalates_yellow_to_red() {
    let findings = StatusFindings {
        money_losers: owned(&["A"]),
        critical_slow_movers: owned(&["A"]),
        ..Default::default()
    };
    let map = apply_rules(&skus(&["A"]), findings.ordered_rules());
    assert_eq!(map["A"].status, Status::Red);
    assert_eq!(map["A"].issues, vec![ISSUE_MONEY_LOSER, ISSUE_CRITICAL_SLOW_MOVER]);
}

#[test]
fn rules_for_unobserved_skus_are_ignored() {
    let findings = StatusFindings {
        zombies: owned(&["GHOST"]),
        ..Default::default()
    };
    let map = apply_rules(&skus(&["A"]), findings.ordered_rules());
    assert!(!map.contains_key("GHOST"));
}

#[test]
fn rule_application_never_lowers_status() {
    let red = StatusEntry::green("A").apply(&ZOMBIE_RULE);
    let after = red.clone().apply(&MONEY_LOSER_RULE).apply(&UNDERPERFORMING_LAUNCH_RULE);
    assert_eq!(after.status, Status::Red);
}

#[test]
fn traffic_light_attaches_recommendation_actions() {
    let recs = vec![
        rec("discontinue_sku", Priority::High).for_skus(["A"]),
        rec("markdown", Priority::High).for_skus(["A", "B"]),
        rec("portfolio", Priority::Low),
    ];
    let map = traffic_light_status(&skus(&["A", "B", "C"]), &StatusFindings::default(), &recs);

    assert_eq!(map["A"].recommendations, vec!["do discontinue_sku", "do markdown"]);
    assert_eq!(map["B"].recommendations, vec!["do markdown"]);
    assert!(map["C"].recommendations.is_empty());
}

#[test]
fn merging_partial_maps_uses_escalation() {
    let left: BTreeMap<Sku, StatusEntry> = [
        ("A".to_string(), StatusEntry::green("A").apply(&MONEY_LOSER_RULE)),
        ("B".to_string(), StatusEntry::green("B")),
    ]
    .into_iter()
    .collect();
    let right: BTreeMap<Sku, StatusEntry> = [
        ("A".to_string(), StatusEntry::green("A").apply(&ZOMBIE_RULE)),
        ("C".to_string(), StatusEntry::green("C").apply(&MONEY_LOSER_RULE)),
    ]
    .into_iter()
    .collect();

    let merged = merge_status_maps(left, right);
    assert_eq!(merged.len(), 3);
    assert_eq!(merged["A"].status, Status::Red);
    assert_eq!(merged["A"].issues, vec![ISSUE_MONEY_LOSER, ISSUE_ZOMBIE]);
    assert_eq!(merged["B"].status, Status::Green);
    assert_eq!(merged["C"].status, Status::Yellow);
}

#[test]
fn recommendations_serialize_with_type_tag() {
    let r = rec("markdown", Priority::Critical).for_skus(["A"]);
    let value = serde_json::to_value(&r).unwrap();
    assert_eq!(value["type"], "markdown");
    assert_eq!(value["priority"], "critical");
    let back: Recommendation = serde_json::from_value(value).unwrap();
    assert_eq!(back, r);
}
