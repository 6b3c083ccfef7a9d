//! Data-source boundary.
//!
//! RULE: The engine depends only on the DataSource trait, never on a
//! concrete connector. A source is pulled once per run; the resulting
//! DataSnapshot is immutable.
//!
//! Missing tables are empty tables, not errors. Date-range filtering
//! happens here: dated rows outside the range are dropped, undated rows
//! are kept (they are excluded from date windows downstream).

use crate::{
    error::{MerchError, MerchResult},
    snapshot::{DataSnapshot, InventorySnapshot, ProductInfo, PurchaseEvent, SalesRecord, ViewEvent},
};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Inclusive date range. An open side is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start: Some(start), end: Some(end) }
    }

    /// From `days` days before `end` through `end`, inclusive of both ends
    /// (`days + 1` calendar days).
    pub fn last_days(end: NaiveDate, days: u32) -> Self {
        Self::between(end - chrono::Duration::days(days as i64), end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    /// Range check for an optional date. Undated rows pass when
    /// `keep_undated` is set.
    pub fn admits(&self, date: Option<NaiveDate>, keep_undated: bool) -> bool {
        match date {
            Some(d) => self.contains(d),
            None => keep_undated,
        }
    }
}

/// The fixed capability set every connector implements.
pub trait DataSource {
    fn name(&self) -> &str;

    fn fetch_sales(&self, range: DateRange) -> MerchResult<Vec<SalesRecord>>;
    fn fetch_inventory(&self) -> MerchResult<Vec<InventorySnapshot>>;
    fn fetch_views(&self, range: DateRange) -> MerchResult<Vec<ViewEvent>>;
    fn fetch_purchases(&self, range: DateRange) -> MerchResult<Vec<PurchaseEvent>>;
    fn fetch_product_info(&self) -> MerchResult<Vec<ProductInfo>>;

    /// Pull all five tables for one run.
    fn fetch_snapshot(&self, range: DateRange) -> MerchResult<DataSnapshot> {
        let snapshot = DataSnapshot {
            sales: self.fetch_sales(range)?,
            inventory: self.fetch_inventory()?,
            products: self.fetch_product_info()?,
            views: self.fetch_views(range)?,
            purchases: self.fetch_purchases(range)?,
        };
        log::info!(
            "Fetched snapshot from {}: {} sales, {} inventory, {} products, {} views, {} purchases",
            self.name(),
            snapshot.sales.len(),
            snapshot.inventory.len(),
            snapshot.products.len(),
            snapshot.views.len(),
            snapshot.purchases.len()
        );
        Ok(snapshot)
    }
}

pub(crate) fn filter_sales(rows: Vec<SalesRecord>, range: DateRange) -> Vec<SalesRecord> {
    rows.into_iter().filter(|r| range.admits(r.date, true)).collect()
}

pub(crate) fn filter_views(rows: Vec<ViewEvent>, range: DateRange) -> Vec<ViewEvent> {
    rows.into_iter().filter(|r| range.admits(r.date, true)).collect()
}

pub(crate) fn filter_purchases(rows: Vec<PurchaseEvent>, range: DateRange) -> Vec<PurchaseEvent> {
    rows.into_iter().filter(|r| range.admits(r.date, true)).collect()
}

// ── In-memory ────────────────────────────────────────────────────────────────

/// Serves a snapshot already held in memory. Used by tests and embedders.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    snapshot: DataSnapshot,
}

impl InMemorySource {
    pub fn new(snapshot: DataSnapshot) -> Self {
        Self { snapshot }
    }
}

impl DataSource for InMemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch_sales(&self, range: DateRange) -> MerchResult<Vec<SalesRecord>> {
        Ok(filter_sales(self.snapshot.sales.clone(), range))
    }

    fn fetch_inventory(&self) -> MerchResult<Vec<InventorySnapshot>> {
        Ok(self.snapshot.inventory.clone())
    }

    fn fetch_views(&self, range: DateRange) -> MerchResult<Vec<ViewEvent>> {
        Ok(filter_views(self.snapshot.views.clone(), range))
    }

    fn fetch_purchases(&self, range: DateRange) -> MerchResult<Vec<PurchaseEvent>> {
        Ok(filter_purchases(self.snapshot.purchases.clone(), range))
    }

    fn fetch_product_info(&self) -> MerchResult<Vec<ProductInfo>> {
        Ok(self.snapshot.products.clone())
    }
}

// ── JSON directory ───────────────────────────────────────────────────────────

pub const SALES_FILE: &str = "sales.json";
pub const INVENTORY_FILE: &str = "inventory.json";
pub const PRODUCTS_FILE: &str = "products.json";
pub const VIEWS_FILE: &str = "views.json";
pub const PURCHASES_FILE: &str = "purchases.json";

/// One JSON array file per table. A missing file is an empty table.
#[derive(Debug, Clone)]
pub struct JsonDirSource {
    dir: PathBuf,
    name: String,
}

impl JsonDirSource {
    pub fn open(dir: impl AsRef<Path>) -> MerchResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(MerchError::SourceUnavailable {
                source_name: dir.display().to_string(),
                reason: "not a directory".to_string(),
            });
        }
        Ok(Self {
            name: format!("json:{}", dir.display()),
            dir,
        })
    }

    fn read_table<T: DeserializeOwned>(&self, file: &str) -> MerchResult<Vec<T>> {
        let path = self.dir.join(file);
        if !path.exists() {
            log::debug!("{} missing; treating as empty", path.display());
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

impl DataSource for JsonDirSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_sales(&self, range: DateRange) -> MerchResult<Vec<SalesRecord>> {
        Ok(filter_sales(self.read_table(SALES_FILE)?, range))
    }

    fn fetch_inventory(&self) -> MerchResult<Vec<InventorySnapshot>> {
        self.read_table(INVENTORY_FILE)
    }

    fn fetch_views(&self, range: DateRange) -> MerchResult<Vec<ViewEvent>> {
        Ok(filter_views(self.read_table(VIEWS_FILE)?, range))
    }

    fn fetch_purchases(&self, range: DateRange) -> MerchResult<Vec<PurchaseEvent>> {
        Ok(filter_purchases(self.read_table(PURCHASES_FILE)?, range))
    }

    fn fetch_product_info(&self) -> MerchResult<Vec<ProductInfo>> {
        self.read_table(PRODUCTS_FILE)
    }
}
