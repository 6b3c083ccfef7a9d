//! SQLite data source.
//!
//! RULE: Only store.rs talks to the database.
//! One table per input. A missing table is an empty table, and a missing
//! column reads as NULL, which the row decoders treat as absent data.

use crate::{
    error::MerchResult,
    snapshot::{parse_date, DataSnapshot, InventorySnapshot, ProductInfo, PurchaseEvent, SalesRecord, ViewEvent},
    source::{filter_purchases, filter_sales, filter_views, DataSource, DateRange},
};
use chrono::NaiveDate;
use rusqlite::{params, types::ValueRef, Connection, Row};
use std::collections::HashSet;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sales (
    sku           TEXT NOT NULL,
    date          TEXT,
    revenue       REAL,
    units         REAL,
    fees          REAL,
    shipping_cost REAL,
    returns       REAL
);
CREATE TABLE IF NOT EXISTS inventory (
    sku              TEXT NOT NULL,
    quantity_on_hand REAL,
    cost_per_unit    REAL
);
CREATE TABLE IF NOT EXISTS products (
    sku          TEXT NOT NULL,
    product_name TEXT,
    category     TEXT,
    price        REAL,
    launch_date  TEXT
);
CREATE TABLE IF NOT EXISTS views (
    sku        TEXT NOT NULL,
    session_id TEXT,
    visitor_id TEXT,
    date       TEXT
);
CREATE TABLE IF NOT EXISTS purchases (
    customer_id TEXT NOT NULL,
    sku         TEXT NOT NULL,
    date        TEXT
);
";

pub struct SqliteSource {
    conn: Connection,
    name: String,
}

impl SqliteSource {
    /// Open an existing database at `path`.
    pub fn open(path: &str) -> MerchResult<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn, name: format!("sqlite:{path}") })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> MerchResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn, name: "sqlite::memory:".to_string() })
    }

    /// Create any missing input tables.
    pub fn migrate(&self) -> MerchResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Write every table of `snapshot` in one transaction.
    pub fn write_snapshot(&mut self, snapshot: &DataSnapshot) -> MerchResult<()> {
        let tx = self.conn.transaction()?;
        for s in &snapshot.sales {
            tx.execute(
                "INSERT INTO sales (sku, date, revenue, units, fees, shipping_cost, returns)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![s.sku, date_text(s.date), s.revenue, s.units, s.fees, s.shipping_cost, s.returns],
            )?;
        }
        for i in &snapshot.inventory {
            tx.execute(
                "INSERT INTO inventory (sku, quantity_on_hand, cost_per_unit) VALUES (?1, ?2, ?3)",
                params![i.sku, i.quantity_on_hand, i.cost_per_unit],
            )?;
        }
        for p in &snapshot.products {
            tx.execute(
                "INSERT INTO products (sku, product_name, category, price, launch_date)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![p.sku, p.product_name, p.category, p.price, date_text(p.launch_date)],
            )?;
        }
        for v in &snapshot.views {
            tx.execute(
                "INSERT INTO views (sku, session_id, visitor_id, date) VALUES (?1, ?2, ?3, ?4)",
                params![v.sku, v.session_id, v.visitor_id, date_text(v.date)],
            )?;
        }
        for p in &snapshot.purchases {
            tx.execute(
                "INSERT INTO purchases (customer_id, sku, date) VALUES (?1, ?2, ?3)",
                params![p.customer_id, p.sku, date_text(p.date)],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    // ── Reading ────────────────────────────────────────────────

    fn columns(&self, table: &str) -> MerchResult<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
        let names = stmt
            .query_map(params![table], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(names)
    }

    /// Select `wanted` from `table`, substituting NULL for absent columns.
    /// Returns no rows when the table does not exist.
    fn select<T, F>(&self, table: &str, wanted: &[&str], decode: F) -> MerchResult<Vec<T>>
    where
        F: Fn(&Row<'_>) -> rusqlite::Result<T>,
    {
        let present = self.columns(table)?;
        if present.is_empty() {
            log::debug!("Table {table} missing in {}; treating as empty", self.name);
            return Ok(Vec::new());
        }
        let list: Vec<String> = wanted
            .iter()
            .map(|c| if present.contains(*c) { c.to_string() } else { format!("NULL AS {c}") })
            .collect();
        let sql = format!("SELECT {} FROM {table} ORDER BY rowid", list.join(", "));
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| decode(row))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

impl DataSource for SqliteSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_sales(&self, range: DateRange) -> MerchResult<Vec<SalesRecord>> {
        let rows = self.select(
            "sales",
            &["sku", "date", "revenue", "units", "fees", "shipping_cost", "returns"],
            |row| {
                Ok(SalesRecord {
                    sku: text(row, 0)?.unwrap_or_default(),
                    date: date(row, 1)?,
                    revenue: number(row, 2)?,
                    units: number(row, 3)?,
                    fees: number(row, 4)?,
                    shipping_cost: number(row, 5)?,
                    returns: number(row, 6)?,
                })
            },
        )?;
        Ok(filter_sales(rows, range))
    }

    fn fetch_inventory(&self) -> MerchResult<Vec<InventorySnapshot>> {
        self.select("inventory", &["sku", "quantity_on_hand", "cost_per_unit"], |row| {
            Ok(InventorySnapshot {
                sku: text(row, 0)?.unwrap_or_default(),
                quantity_on_hand: number(row, 1)?,
                cost_per_unit: number(row, 2)?,
            })
        })
    }

    fn fetch_views(&self, range: DateRange) -> MerchResult<Vec<ViewEvent>> {
        let rows = self.select("views", &["sku", "session_id", "visitor_id", "date"], |row| {
            Ok(ViewEvent {
                sku: text(row, 0)?.unwrap_or_default(),
                session_id: text(row, 1)?,
                visitor_id: text(row, 2)?,
                date: date(row, 3)?,
            })
        })?;
        Ok(filter_views(rows, range))
    }

    fn fetch_purchases(&self, range: DateRange) -> MerchResult<Vec<PurchaseEvent>> {
        let rows = self.select("purchases", &["customer_id", "sku", "date"], |row| {
            Ok(PurchaseEvent {
                customer_id: text(row, 0)?.unwrap_or_default(),
                sku: text(row, 1)?.unwrap_or_default(),
                date: date(row, 2)?,
            })
        })?;
        Ok(filter_purchases(rows, range))
    }

    fn fetch_product_info(&self) -> MerchResult<Vec<ProductInfo>> {
        self.select(
            "products",
            &["sku", "product_name", "category", "price", "launch_date"],
            |row| {
                Ok(ProductInfo {
                    sku: text(row, 0)?.unwrap_or_default(),
                    product_name: text(row, 1)?,
                    category: text(row, 2)?,
                    price: optional_number(row, 3)?,
                    launch_date: date(row, 4)?,
                })
            },
        )
    }
}

// ── Column decoders ──────────────────────────────────────────────────────────

fn date_text(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

fn text(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
    })
}

/// Numbers, numeric text, or 0.
fn number(row: &Row<'_>, idx: usize) -> rusqlite::Result<f64> {
    Ok(optional_number(row, idx)?.unwrap_or(0.0))
}

fn optional_number(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<f64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Text(t) => std::str::from_utf8(t).ok().and_then(|s| s.trim().parse().ok()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
    .filter(|v| v.is_finite()))
}

fn date(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw = text(row, idx)?;
    let parsed = raw.as_deref().and_then(parse_date);
    if let (Some(raw), None) = (&raw, parsed) {
        log::warn!("Unparseable date '{raw}'; treating as missing");
    }
    Ok(parsed)
}
