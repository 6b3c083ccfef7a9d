//! Input snapshot: the five typed tables one analysis run reads.
//!
//! A snapshot is pulled from a data source once per run and never mutated.
//! Every optional column defaults when absent, and dates that fail to parse
//! become `None` instead of failing the whole table.

use crate::types::Sku;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesRecord {
    pub sku: Sku,
    #[serde(deserialize_with = "lenient_date")]
    pub date: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient_number")]
    pub revenue: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub units: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub fees: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub shipping_cost: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub returns: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventorySnapshot {
    pub sku: Sku,
    #[serde(deserialize_with = "lenient_number")]
    pub quantity_on_hand: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub cost_per_unit: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductInfo {
    pub sku: Sku,
    pub product_name: Option<String>,
    pub category: Option<String>,
    #[serde(deserialize_with = "lenient_optional_number")]
    pub price: Option<f64>,
    #[serde(deserialize_with = "lenient_date")]
    pub launch_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewEvent {
    pub sku: Sku,
    pub session_id: Option<String>,
    pub visitor_id: Option<String>,
    #[serde(deserialize_with = "lenient_date")]
    pub date: Option<NaiveDate>,
}

impl ViewEvent {
    /// Session grouping key. Falls back to date + visitor, then date alone,
    /// when the source carries no explicit session identifier.
    pub fn session_key(&self) -> String {
        if let Some(session) = &self.session_id {
            return session.clone();
        }
        let date = self
            .date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "undated".to_string());
        match &self.visitor_id {
            Some(visitor) => format!("{date}_{visitor}"),
            None => date,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PurchaseEvent {
    pub customer_id: String,
    pub sku: Sku,
    #[serde(deserialize_with = "lenient_date")]
    pub date: Option<NaiveDate>,
}

/// Everything one run reads. Empty tables are valid input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSnapshot {
    pub sales: Vec<SalesRecord>,
    pub inventory: Vec<InventorySnapshot>,
    pub products: Vec<ProductInfo>,
    pub views: Vec<ViewEvent>,
    pub purchases: Vec<PurchaseEvent>,
}

impl DataSnapshot {
    pub fn is_empty(&self) -> bool {
        self.sales.is_empty()
            && self.inventory.is_empty()
            && self.products.is_empty()
            && self.views.is_empty()
            && self.purchases.is_empty()
    }
}

/// Parse a date string in any of the formats the connectors emit.
/// Returns `None` for anything unparseable.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    None
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => {
            let parsed = parse_date(&s);
            if parsed.is_none() {
                log::warn!("Unparseable date '{s}' treated as missing");
            }
            parsed
        }
        _ => None,
    })
}

fn number_from(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Numeric column: numbers and numeric strings pass, anything else is 0.
fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(number_from).unwrap_or(0.0))
}

fn lenient_optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(number_from))
}
