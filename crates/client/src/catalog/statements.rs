//! Parameterised SQL for the `products` and `inventory` tables.
//!
//! Values never appear in SQL text; every one travels as a typed argument.

use std::sync::LazyLock;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use tarstock_core::{
    AttributeError, AttributeKind, InventoryId, InventoryItem, NewProduct, Product, ProductId,
    encode_attributes,
};

use crate::gateway::{Statement, Value};

/// Writable `products` columns, in argument order.
const PRODUCT_COLUMNS: [&str; 20] = [
    "storeid",
    "name",
    "f1",
    "f2",
    "f3",
    "f4",
    "f5",
    "type",
    "category",
    "collection",
    "unit",
    "price",
    "stock",
    "vendor",
    "brand",
    "options",
    "modifiers",
    "metafields",
    "channels",
    "notes",
];

/// Writable `inventory` columns, in argument order.
const INVENTORY_COLUMNS: [&str; 14] = [
    "product_id",
    "name",
    "f",
    "sku",
    "barcode",
    "available",
    "committed",
    "instock",
    "price",
    "compare",
    "cost",
    "location",
    "modifiers",
    "metafields",
];

static INSERT_PRODUCT: LazyLock<String> =
    LazyLock::new(|| insert_sql("products", &PRODUCT_COLUMNS));
static UPDATE_PRODUCT: LazyLock<String> =
    LazyLock::new(|| update_sql("products", &PRODUCT_COLUMNS));
static INSERT_INVENTORY: LazyLock<String> =
    LazyLock::new(|| insert_sql("inventory", &INVENTORY_COLUMNS));
static UPDATE_INVENTORY: LazyLock<String> =
    LazyLock::new(|| update_sql("inventory", &INVENTORY_COLUMNS));

fn insert_sql(table: &str, columns: &[&str]) -> String {
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders})",
        columns.join(", ")
    )
}

fn update_sql(table: &str, columns: &[&str]) -> String {
    let assignments: Vec<String> = columns.iter().map(|c| format!("{c} = ?")).collect();
    format!("UPDATE {table} SET {} WHERE id = ?", assignments.join(", "))
}

pub fn select_products() -> Statement {
    Statement::new("SELECT * FROM products")
}

pub fn select_inventory_for_product(product_id: ProductId) -> Statement {
    Statement::new("SELECT * FROM inventory WHERE product_id = ?").bind(product_id.as_i64())
}

pub fn select_all_inventory() -> Statement {
    Statement::new("SELECT * FROM inventory")
}

/// Reads back the rowid of the previous insert on the same connection.
pub fn last_insert_id() -> Statement {
    Statement::new("SELECT last_insert_rowid() AS id")
}

// NewProduct and Product share their column fields; this binds them in
// PRODUCT_COLUMNS order for either.
macro_rules! bind_product_columns {
    ($stmt:expr, $product:expr) => {{
        let p = $product;
        let [f1, f2, f3, f4, f5] = p.images.clone();
        $stmt
            .bind(p.store_id.as_str())
            .bind(p.name.as_str())
            .bind(f1)
            .bind(f2)
            .bind(f3)
            .bind(f4)
            .bind(f5)
            .bind(p.product_type.clone())
            .bind(p.category.clone())
            .bind(p.collection.clone())
            .bind(p.unit.clone())
            .bind(decimal(p.price))
            .bind(p.stock)
            .bind(p.vendor.clone())
            .bind(p.brand.clone())
            .bind(encode_attributes(AttributeKind::Options, &p.options)?)
            .bind(encode_attributes(AttributeKind::Modifiers, &p.modifiers)?)
            .bind(encode_attributes(AttributeKind::Metafields, &p.metafields)?)
            .bind(encode_attributes(AttributeKind::Channels, &p.channels)?)
            .bind(p.notes.clone())
    }};
}

pub fn insert_product(product: &NewProduct) -> Result<Statement, AttributeError> {
    Ok(bind_product_columns!(
        Statement::new(INSERT_PRODUCT.as_str()),
        product
    ))
}

pub fn update_product(product: &Product) -> Result<Statement, AttributeError> {
    let stmt = bind_product_columns!(Statement::new(UPDATE_PRODUCT.as_str()), product);
    Ok(stmt.bind(product.id.as_i64()))
}

fn bind_inventory_columns(
    stmt: Statement,
    item: &InventoryItem,
) -> Result<Statement, AttributeError> {
    Ok(stmt
        .bind(item.product_id.as_i64())
        .bind(item.name.as_str())
        .bind(item.image.clone())
        .bind(item.sku.as_str())
        .bind(item.barcode.clone())
        .bind(item.available)
        .bind(item.committed)
        .bind(item.instock)
        .bind(item.price.map(decimal))
        .bind(item.compare_at_price.map(decimal))
        .bind(item.cost.map(decimal))
        .bind(item.location.clone())
        .bind(encode_attributes(AttributeKind::Modifiers, &item.modifiers)?)
        .bind(encode_attributes(
            AttributeKind::Metafields,
            &item.metafields,
        )?))
}

pub fn insert_inventory_item(item: &InventoryItem) -> Result<Statement, AttributeError> {
    bind_inventory_columns(Statement::new(INSERT_INVENTORY.as_str()), item)
}

pub fn update_inventory_item(item: &InventoryItem) -> Result<Statement, AttributeError> {
    Ok(bind_inventory_columns(Statement::new(UPDATE_INVENTORY.as_str()), item)?
        .bind(item.id.as_i64()))
}

pub fn delete_inventory_item(id: InventoryId) -> Statement {
    Statement::new("DELETE FROM inventory WHERE id = ?").bind(id.as_i64())
}

/// Money columns are REAL.
fn decimal(value: Decimal) -> Value {
    value.to_f64().map_or(Value::Null, Value::from)
}
