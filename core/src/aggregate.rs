//! Aggregator: folds raw event tables into one summary row per sku.
//!
//! Join policy:
//!   - sales ⟗ inventory (outer): a sku may appear in either source alone.
//!   - ⟕ product info (left): metadata never introduces a new sku.
//!   - Missing numeric fields are 0, missing categorical fields stay `None`.
//!
//! Rows come back sorted by sku so every downstream table is deterministic.

use crate::{
    snapshot::{DataSnapshot, InventorySnapshot, ProductInfo, SalesRecord},
    types::Sku,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub sku: Sku,
    pub product_name: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub launch_date: Option<NaiveDate>,
    // Sales
    pub revenue: f64,
    pub units: f64,
    pub fees: f64,
    pub shipping_cost: f64,
    pub returns: f64,
    // Inventory
    pub quantity_on_hand: f64,
    pub cost_per_unit: f64,
    // Provenance
    pub has_sales: bool,
    pub has_inventory: bool,
}

impl ProductSummary {
    fn empty(sku: &str) -> Self {
        Self {
            sku: sku.to_string(),
            ..Self::default()
        }
    }

    /// Capital tied up in stock.
    pub fn inventory_value(&self) -> f64 {
        self.quantity_on_hand * self.cost_per_unit
    }

    /// Display name, falling back to the sku.
    pub fn display_name(&self) -> &str {
        self.product_name.as_deref().unwrap_or(&self.sku)
    }
}

/// Summary rows plus the product catalog, keyed for lookups.
#[derive(Debug, Clone, Default)]
pub struct AggregatedData {
    pub rows: Vec<ProductSummary>,
    index: HashMap<Sku, usize>,
    catalog: HashMap<Sku, ProductInfo>,
}

impl AggregatedData {
    pub fn get(&self, sku: &str) -> Option<&ProductSummary> {
        self.index.get(sku).map(|&i| &self.rows[i])
    }

    /// Total revenue of a sku, 0 when it has no sales.
    pub fn revenue_of(&self, sku: &str) -> f64 {
        self.get(sku).map(|r| r.revenue).unwrap_or(0.0)
    }

    pub fn product(&self, sku: &str) -> Option<&ProductInfo> {
        self.catalog.get(sku)
    }

    /// Product name for display, falling back to the sku.
    pub fn display_name<'a>(&'a self, sku: &'a str) -> &'a str {
        self.catalog
            .get(sku)
            .and_then(|p| p.product_name.as_deref())
            .unwrap_or(sku)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Build the per-sku summary table. Never fails; empty input gives an
/// empty table.
pub fn aggregate(snapshot: &DataSnapshot) -> AggregatedData {
    let mut rows: BTreeMap<Sku, ProductSummary> = BTreeMap::new();

    for sale in &snapshot.sales {
        add_sale(rows.entry(sale.sku.clone()).or_insert_with(|| ProductSummary::empty(&sale.sku)), sale);
    }

    let mut seen_inventory: HashMap<&str, usize> = HashMap::new();
    for inv in &snapshot.inventory {
        let count = seen_inventory.entry(inv.sku.as_str()).or_insert(0);
        *count += 1;
        if *count == 2 {
            log::warn!("Multiple inventory snapshots for sku {}; keeping the last", inv.sku);
        }
        set_inventory(rows.entry(inv.sku.clone()).or_insert_with(|| ProductSummary::empty(&inv.sku)), inv);
    }

    let mut catalog: HashMap<Sku, ProductInfo> = HashMap::new();
    for product in &snapshot.products {
        catalog.insert(product.sku.clone(), product.clone());
    }

    for row in rows.values_mut() {
        if let Some(product) = catalog.get(&row.sku) {
            row.product_name = product.product_name.clone();
            row.category = product.category.clone();
            row.price = product.price;
            row.launch_date = product.launch_date;
        }
    }

    let rows: Vec<ProductSummary> = rows.into_values().collect();
    let index = rows
        .iter()
        .enumerate()
        .map(|(i, r)| (r.sku.clone(), i))
        .collect();

    log::debug!(
        "Aggregated {} sales rows and {} inventory rows into {} skus",
        snapshot.sales.len(),
        snapshot.inventory.len(),
        rows.len()
    );

    AggregatedData { rows, index, catalog }
}

fn add_sale(row: &mut ProductSummary, sale: &SalesRecord) {
    row.revenue += sale.revenue;
    row.units += sale.units;
    row.fees += sale.fees;
    row.shipping_cost += sale.shipping_cost;
    row.returns += sale.returns;
    row.has_sales = true;
}

fn set_inventory(row: &mut ProductSummary, inv: &InventorySnapshot) {
    row.quantity_on_hand = inv.quantity_on_hand;
    row.cost_per_unit = inv.cost_per_unit;
    row.has_inventory = true;
}
