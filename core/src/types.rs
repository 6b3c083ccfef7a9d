//! Shared primitive types used across every analysis.

use serde::{Deserialize, Serialize};

/// A stock-keeping unit. The primary join key for every table.
pub type Sku = String;

/// Days elapsed between two calendar dates.
pub type Days = i64;

/// Recommendation urgency. Variant order is the consolidation sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    /// Sort rank: critical=0, high=1, medium=2, low=3.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High     => 1,
            Priority::Medium   => 2,
            Priority::Low      => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High     => "high",
            Priority::Medium   => "medium",
            Priority::Low      => "low",
        }
    }
}

/// Traffic-light severity. Ordered so that `max` is escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Green,
    Yellow,
    Red,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Green  => "green",
            Status::Yellow => "yellow",
            Status::Red    => "red",
        }
    }
}
