//! Mapping gateway rows to catalog records.
//!
//! Columns are looked up by name, so the mapping is indifferent to column
//! order and tolerates extra columns. Values that cannot be read are
//! defaulted and reported as [`ReadIssue`]s rather than failing the read.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::de::DeserializeOwned;
use tracing::warn;

use tarstock_core::{
    AttributeKind, InventoryId, InventoryItem, Product, ProductId, decode_attributes,
};

use super::{Fetched, ReadIssue, ReadIssueKind};
use crate::gateway::{StatementResult, Value};

const PRODUCTS: &str = "products";
const INVENTORY: &str = "inventory";

/// Map a `SELECT * FROM products` result to products.
#[must_use]
pub fn products_from_result(result: &StatementResult) -> Fetched<Product> {
    map_rows(result, PRODUCTS, product_from_row)
}

/// Map a `SELECT * FROM inventory` result to inventory items.
#[must_use]
pub fn inventory_from_result(result: &StatementResult) -> Fetched<InventoryItem> {
    map_rows(result, INVENTORY, inventory_from_row)
}

fn map_rows<T>(
    result: &StatementResult,
    table: &'static str,
    map: fn(&mut RowReader<'_>, i64) -> T,
) -> Fetched<T> {
    let names: Vec<Option<&str>> = result.cols.iter().map(|c| c.name.as_deref()).collect();
    let mut records = Vec::with_capacity(result.rows.len());
    let mut issues = Vec::new();

    for cells in &result.rows {
        let mut row = RowReader::new(table, &names, cells);
        if let Some(id) = row.id() {
            records.push(map(&mut row, id));
        }
        issues.append(&mut row.issues);
    }

    for issue in &issues {
        warn!(%issue, "Degraded read");
    }

    Fetched { records, issues }
}

fn product_from_row(row: &mut RowReader<'_>, id: i64) -> Product {
    Product {
        id: ProductId::new(id),
        store_id: row.text("storeid").unwrap_or_default(),
        name: row.text("name").unwrap_or_default(),
        images: [
            row.text("f1"),
            row.text("f2"),
            row.text("f3"),
            row.text("f4"),
            row.text("f5"),
        ],
        product_type: row.text("type"),
        category: row.text("category"),
        collection: row.text("collection"),
        unit: row.text("unit"),
        price: row.decimal("price").unwrap_or(Decimal::ZERO),
        stock: row.int("stock").unwrap_or(0),
        vendor: row.text("vendor"),
        brand: row.text("brand"),
        options: row.attributes(AttributeKind::Options),
        modifiers: row.attributes(AttributeKind::Modifiers),
        metafields: row.attributes(AttributeKind::Metafields),
        channels: row.attributes(AttributeKind::Channels),
        notes: row.text("notes"),
    }
}

fn inventory_from_row(row: &mut RowReader<'_>, id: i64) -> InventoryItem {
    InventoryItem {
        id: InventoryId::new(id),
        product_id: ProductId::new(row.int("product_id").unwrap_or(0)),
        name: row.text("name").unwrap_or_default(),
        image: row.text("f"),
        sku: row.text("sku").unwrap_or_default(),
        barcode: row.text("barcode"),
        available: row.int("available").unwrap_or(0),
        committed: row.int("committed").unwrap_or(0),
        instock: row.int("instock"),
        price: row.decimal("price"),
        compare_at_price: row.decimal("compare"),
        cost: row.decimal("cost"),
        location: row.text("location"),
        modifiers: row.attributes(AttributeKind::Modifiers),
        metafields: row.attributes(AttributeKind::Metafields),
    }
}

/// One row, addressable by column name.
struct RowReader<'a> {
    table: &'static str,
    cells: HashMap<&'a str, &'a Value>,
    record_id: Option<i64>,
    issues: Vec<ReadIssue>,
}

impl<'a> RowReader<'a> {
    fn new(table: &'static str, names: &[Option<&'a str>], cells: &'a [Value]) -> Self {
        let cells = names
            .iter()
            .zip(cells)
            .filter_map(|(name, value)| name.map(|n| (n, value)))
            .collect();
        Self {
            table,
            cells,
            record_id: None,
            issues: Vec::new(),
        }
    }

    /// Read the row id. Rows without a positive id are skipped.
    fn id(&mut self) -> Option<i64> {
        let id = self.int("id").filter(|id| *id > 0);
        if id.is_none() {
            self.issue("id", ReadIssueKind::InvalidId);
        }
        self.record_id = id;
        id
    }

    fn cell(&self, column: &str) -> Option<&'a Value> {
        self.cells.get(column).copied().filter(|v| !v.is_null())
    }

    fn text(&self, column: &str) -> Option<String> {
        match self.cell(column)? {
            Value::Text { value } | Value::Integer { value } => Some(value.clone()),
            Value::Float { value } => Some(value.to_string()),
            Value::Null | Value::Blob { .. } => None,
        }
    }

    fn int(&mut self, column: &str) -> Option<i64> {
        let parsed = match self.cell(column)? {
            Value::Integer { value } | Value::Text { value } => parse_int(value),
            Value::Float { value } => float_to_int(*value),
            Value::Null | Value::Blob { .. } => None,
        };
        if parsed.is_none() {
            self.invalid_number(column);
        }
        parsed
    }

    fn decimal(&mut self, column: &str) -> Option<Decimal> {
        let parsed = match self.cell(column)? {
            Value::Integer { value } | Value::Text { value } => {
                Decimal::from_str(value.trim()).ok()
            }
            Value::Float { value } => Decimal::from_f64(*value),
            Value::Null | Value::Blob { .. } => None,
        };
        if parsed.is_none() {
            self.invalid_number(column);
        }
        parsed
    }

    fn attributes<T: DeserializeOwned>(&mut self, kind: AttributeKind) -> Vec<T> {
        let raw = self.text(kind.column());
        decode_attributes(kind, raw.as_deref()).unwrap_or_else(|e| {
            self.issue(
                kind.column(),
                ReadIssueKind::InvalidAttributes {
                    message: e.to_string(),
                },
            );
            Vec::new()
        })
    }

    fn invalid_number(&mut self, column: &str) {
        let raw = match self.cell(column) {
            Some(Value::Integer { value } | Value::Text { value }) => value.clone(),
            Some(Value::Float { value }) => value.to_string(),
            Some(Value::Blob { .. }) => "<blob>".to_string(),
            Some(Value::Null) | None => String::new(),
        };
        self.issue(column, ReadIssueKind::InvalidNumber { raw });
    }

    fn issue(&mut self, column: &str, kind: ReadIssueKind) {
        self.issues.push(ReadIssue {
            table: self.table,
            record_id: self.record_id,
            column: column.to_string(),
            kind,
        });
    }
}

/// Parse an integer, accepting a decimal fraction that gets truncated.
fn parse_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().and_then(float_to_int))
}

#[allow(clippy::cast_possible_truncation)] // Range is checked before the cast
fn float_to_int(value: f64) -> Option<i64> {
    const LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53
    (value.is_finite() && value.abs() < LIMIT).then(|| value.trunc() as i64)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::gateway::Column;

    fn cols(names: &[&str]) -> Vec<Column> {
        names
            .iter()
            .map(|n| Column {
                name: Some((*n).to_string()),
                decltype: None,
            })
            .collect()
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int(" 7 "), Some(7));
        assert_eq!(parse_int("12.9"), Some(12));
        assert_eq!(parse_int("twelve"), None);
        assert_eq!(parse_int("NaN"), None);
    }

    #[test]
    fn test_product_mapping() {
        let result = StatementResult {
            cols: cols(&["id", "storeid", "name", "f1", "price", "stock", "options", "channels"]),
            rows: vec![vec![
                Value::integer(1),
                Value::text("S1"),
                Value::text("Latte"),
                Value::text("https://img/latte.jpg"),
                Value::Float { value: 4.5 },
                Value::text("12"),
                Value::text(r#"[{"name":"Size","values":["S","L"]}]"#),
                Value::text("{}"),
            ]],
            ..StatementResult::default()
        };

        let fetched = products_from_result(&result);
        assert!(!fetched.is_degraded());
        let product = &fetched.records[0];
        assert_eq!(product.id, ProductId::new(1));
        assert_eq!(product.name, "Latte");
        assert_eq!(product.images[0].as_deref(), Some("https://img/latte.jpg"));
        assert_eq!(product.price, Decimal::new(45, 1));
        assert_eq!(product.stock, 12);
        assert_eq!(product.options[0].values, vec!["S", "L"]);
        assert!(product.channels.is_empty());
        assert!(product.modifiers.is_empty());
    }

    #[test]
    fn test_bad_number_defaults_and_reports() {
        let result = StatementResult {
            cols: cols(&["id", "name", "price", "stock"]),
            rows: vec![vec![
                Value::integer(5),
                Value::text("Mocha"),
                Value::text("four"),
                Value::Null,
            ]],
            ..StatementResult::default()
        };

        let fetched = products_from_result(&result);
        let product = &fetched.records[0];
        assert_eq!(product.price, Decimal::ZERO);
        assert_eq!(product.stock, 0);
        assert_eq!(
            fetched.issues,
            vec![ReadIssue {
                table: "products",
                record_id: Some(5),
                column: "price".to_string(),
                kind: ReadIssueKind::InvalidNumber {
                    raw: "four".to_string()
                },
            }]
        );
    }

    #[test]
    fn test_bad_attributes_left_empty_and_reported() {
        let result = StatementResult {
            cols: cols(&["id", "name", "metafields"]),
            rows: vec![vec![
                Value::integer(2),
                Value::text("Tea"),
                Value::text("not json"),
            ]],
            ..StatementResult::default()
        };

        let fetched = products_from_result(&result);
        assert!(fetched.records[0].metafields.is_empty());
        assert_eq!(fetched.issues.len(), 1);
        assert_eq!(fetched.issues[0].column, "metafields");
        assert!(matches!(
            fetched.issues[0].kind,
            ReadIssueKind::InvalidAttributes { .. }
        ));
    }

    #[test]
    fn test_row_without_id_is_skipped() {
        let result = StatementResult {
            cols: cols(&["id", "name"]),
            rows: vec![
                vec![Value::Null, Value::text("Ghost")],
                vec![Value::integer(0), Value::text("Zero")],
                vec![Value::integer(3), Value::text("Real")],
            ],
            ..StatementResult::default()
        };

        let fetched = products_from_result(&result);
        assert_eq!(fetched.records.len(), 1);
        assert_eq!(fetched.records[0].name, "Real");
        assert_eq!(fetched.issues.len(), 2);
        assert!(
            fetched
                .issues
                .iter()
                .all(|i| i.kind == ReadIssueKind::InvalidId)
        );
    }

    #[test]
    fn test_inventory_mapping_keeps_missing_instock() {
        let result = StatementResult {
            cols: cols(&[
                "id",
                "product_id",
                "name",
                "sku",
                "available",
                "committed",
                "instock",
                "price",
                "compare",
                "cost",
            ]),
            rows: vec![vec![
                Value::integer(11),
                Value::integer(42),
                Value::text("Large"),
                Value::text("LAT-L"),
                Value::integer(10),
                Value::text("3"),
                Value::Null,
                Value::Float { value: 5.25 },
                Value::Null,
                Value::text("1.10"),
            ]],
            ..StatementResult::default()
        };

        let fetched = inventory_from_result(&result);
        assert!(!fetched.is_degraded());
        let item = &fetched.records[0];
        assert_eq!(item.id, InventoryId::new(11));
        assert_eq!(item.product_id, ProductId::new(42));
        assert_eq!(item.committed, 3);
        assert_eq!(item.instock, None);
        assert_eq!(item.effective_instock(), 7);
        assert_eq!(item.price, Some(Decimal::new(525, 2)));
        assert_eq!(item.compare_at_price, None);
        assert_eq!(item.cost, Some(Decimal::new(110, 2)));
    }
}
