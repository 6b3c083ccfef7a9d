//! Recommendation consolidation and the per-sku traffic-light overlay.
//!
//! RULES:
//!   - Consolidation is a stable sort by priority rank. Equal-priority items
//!     keep emission order (analysis registration order, then the order the
//!     analysis emitted them).
//!   - Status only escalates (green < yellow < red). Each rule may raise a
//!     sku's status and append an issue; nothing ever lowers it.

use crate::{
    analyzer::AnalysisKind,
    types::{Priority, Sku, Status},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ── Recommendations ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: String,
    pub priority: Priority,
    pub action: String,
    pub impact: String,
    pub details: String,
    /// Skus the recommendation is about. Empty for portfolio-level items.
    #[serde(default)]
    pub skus: Vec<Sku>,
    /// Set during consolidation.
    #[serde(default)]
    pub source_analysis: Option<AnalysisKind>,
}

impl Recommendation {
    pub fn new(
        kind: &str,
        priority: Priority,
        action: impl Into<String>,
        impact: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.to_string(),
            priority,
            action: action.into(),
            impact: impact.into(),
            details: details.into(),
            skus: Vec::new(),
            source_analysis: None,
        }
    }

    pub fn for_skus<I, S>(mut self, skus: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Sku>,
    {
        self.skus = skus.into_iter().map(Into::into).collect();
        self
    }
}

/// Concatenate per-analysis lists in the given order, tag each item with its
/// source, then stable-sort by priority.
pub fn consolidate<'a, I>(lists: I) -> Vec<Recommendation>
where
    I: IntoIterator<Item = (AnalysisKind, &'a [Recommendation])>,
{
    let mut all: Vec<Recommendation> = lists
        .into_iter()
        .flat_map(|(kind, recs)| {
            recs.iter().cloned().map(move |mut r| {
                r.source_analysis = Some(kind);
                r
            })
        })
        .collect();
    all.sort_by_key(|r| r.priority.rank());
    all
}

// ── Traffic light ────────────────────────────────────────────────────────────

pub const ISSUE_ZOMBIE: &str = "Zombie product";
pub const ISSUE_MONEY_LOSER: &str = "Losing money";
pub const ISSUE_CRITICAL_SLOW_MOVER: &str = "Critical slow mover";
pub const ISSUE_UNDERPERFORMING_LAUNCH: &str = "Underperforming new product";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub sku: Sku,
    pub status: Status,
    pub issues: Vec<String>,
    /// Actions of consolidated recommendations that name this sku.
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl StatusEntry {
    pub fn green(sku: &str) -> Self {
        Self {
            sku: sku.to_string(),
            status: Status::Green,
            issues: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    /// Apply one rule. Returns the entry unchanged when the rule does not
    /// fire for the current status.
    pub fn apply(mut self, rule: &StatusRule) -> Self {
        if rule.only_if_green && self.status != Status::Green {
            return self;
        }
        self.status = self.status.max(rule.raise_to);
        self.issues.push(rule.issue.to_string());
        self
    }

    /// Combine two partial entries for the same sku with the escalation rule.
    pub fn merge(mut self, other: StatusEntry) -> Self {
        self.status = self.status.max(other.status);
        self.issues.extend(other.issues);
        self.recommendations.extend(other.recommendations);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRule {
    pub raise_to: Status,
    /// Fire only while the sku is still green.
    pub only_if_green: bool,
    pub issue: &'static str,
}

pub const ZOMBIE_RULE: StatusRule = StatusRule {
    raise_to: Status::Red,
    only_if_green: false,
    issue: ISSUE_ZOMBIE,
};

pub const MONEY_LOSER_RULE: StatusRule = StatusRule {
    raise_to: Status::Yellow,
    only_if_green: false,
    issue: ISSUE_MONEY_LOSER,
};

pub const CRITICAL_SLOW_MOVER_RULE: StatusRule = StatusRule {
    raise_to: Status::Red,
    only_if_green: false,
    issue: ISSUE_CRITICAL_SLOW_MOVER,
};

pub const UNDERPERFORMING_LAUNCH_RULE: StatusRule = StatusRule {
    raise_to: Status::Yellow,
    only_if_green: true,
    issue: ISSUE_UNDERPERFORMING_LAUNCH,
};

/// Sku memberships the status rules read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusFindings {
    pub zombies: Vec<Sku>,
    pub money_losers: Vec<Sku>,
    pub critical_slow_movers: Vec<Sku>,
    pub underperforming_launches: Vec<Sku>,
}

impl StatusFindings {
    /// Rules in their fixed application order, each with its sku list.
    pub fn ordered_rules(&self) -> [(StatusRule, &[Sku]); 4] {
        [
            (ZOMBIE_RULE, self.zombies.as_slice()),
            (MONEY_LOSER_RULE, self.money_losers.as_slice()),
            (CRITICAL_SLOW_MOVER_RULE, self.critical_slow_movers.as_slice()),
            (UNDERPERFORMING_LAUNCH_RULE, self.underperforming_launches.as_slice()),
        ]
    }
}

/// Fold `rules` over a fresh all-green map of `skus`. Skus named by a rule
/// but absent from `skus` are ignored.
pub fn apply_rules<'a, I>(skus: &BTreeSet<Sku>, rules: I) -> BTreeMap<Sku, StatusEntry>
where
    I: IntoIterator<Item = (StatusRule, &'a [Sku])>,
{
    let initial: BTreeMap<Sku, StatusEntry> = skus
        .iter()
        .map(|s| (s.clone(), StatusEntry::green(s)))
        .collect();

    rules.into_iter().fold(initial, |mut map, (rule, members)| {
        for sku in members {
            if let Some(entry) = map.remove(sku) {
                map.insert(sku.clone(), entry.apply(&rule));
            }
        }
        map
    })
}

pub fn traffic_light_status(
    skus: &BTreeSet<Sku>,
    findings: &StatusFindings,
    consolidated: &[Recommendation],
) -> BTreeMap<Sku, StatusEntry> {
    let mut map = apply_rules(skus, findings.ordered_rules());
    for rec in consolidated {
        for sku in &rec.skus {
            if let Some(entry) = map.get_mut(sku) {
                entry.recommendations.push(rec.action.clone());
            }
        }
    }
    map
}

/// Merge partial status maps (e.g. from parallel workers).
pub fn merge_status_maps(
    left: BTreeMap<Sku, StatusEntry>,
    right: BTreeMap<Sku, StatusEntry>,
) -> BTreeMap<Sku, StatusEntry> {
    right.into_iter().fold(left, |mut acc, (sku, entry)| {
        let merged = match acc.remove(&sku) {
            Some(existing) => existing.merge(entry),
            None => entry,
        };
        acc.insert(sku, merged);
        acc
    })
}
