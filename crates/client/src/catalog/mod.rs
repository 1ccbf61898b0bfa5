//! Remote data access for products and inventory.
//!
//! [`CatalogStore`] is the seam between the product service and the database:
//! [`RemoteCatalog`] implements it over the [gateway](crate::gateway), and tests
//! substitute an in-memory fake.
//!
//! # Tables
//!
//! - `products` - one row per product; `options`, `modifiers`, `metafields`
//!   and `channels` hold JSON text
//! - `inventory` - one row per variant, `product_id` references `products.id`;
//!   `modifiers` and `metafields` hold JSON text

mod remote;
mod rows;
mod statements;

pub use remote::RemoteCatalog;
pub use rows::{inventory_from_result, products_from_result};

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use tarstock_core::{
    AttributeError, InventoryId, InventoryItem, NewProduct, Product, ProductId, ValidationError,
};

use crate::gateway::GatewayError;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The gateway call failed.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The record was rejected before any request was sent.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// An attribute list could not be encoded for storage.
    #[error("attribute error: {0}")]
    Attributes(#[from] AttributeError),

    /// The insert succeeded but no id came back.
    #[error("database did not return the new {0} id")]
    MissingInsertId(&'static str),

    /// Update or delete matched no row.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Data access for products and inventory.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Every product.
    async fn fetch_products(&self) -> Result<Fetched<Product>, StoreError>;

    /// Inventory items of one product.
    async fn fetch_inventory_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Fetched<InventoryItem>, StoreError>;

    /// Every inventory item of every product.
    async fn fetch_all_inventory(&self) -> Result<Fetched<InventoryItem>, StoreError>;

    /// Insert a product and return it with its new id.
    async fn create_product(&self, product: NewProduct) -> Result<Product, StoreError>;

    /// Replace every mutable column of an existing product.
    async fn update_product(&self, product: &Product) -> Result<(), StoreError>;

    /// Insert an inventory item and return it with its new id and in-stock count.
    async fn create_inventory_item(&self, item: InventoryItem)
    -> Result<InventoryItem, StoreError>;

    /// Replace every mutable column of an existing inventory item.
    async fn update_inventory_item(&self, item: &InventoryItem) -> Result<(), StoreError>;

    /// Delete an inventory item.
    async fn delete_inventory_item(&self, id: InventoryId) -> Result<(), StoreError>;
}

/// Records read from the database along with anything that had to be
/// defaulted while reading them.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub records: Vec<T>,
    pub issues: Vec<ReadIssue>,
}

impl<T> Fetched<T> {
    /// A clean read.
    #[must_use]
    pub const fn clean(records: Vec<T>) -> Self {
        Self {
            records,
            issues: Vec::new(),
        }
    }

    /// Whether any value was defaulted or any row skipped.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// A value that could not be read as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadIssue {
    pub table: &'static str,
    /// Row id, when it could be read.
    pub record_id: Option<i64>,
    pub column: String,
    pub kind: ReadIssueKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReadIssueKind {
    /// A number column held something unparsable; the field was defaulted.
    InvalidNumber { raw: String },
    /// A JSON column did not match its schema; the list was left empty.
    InvalidAttributes { message: String },
    /// The row id was missing or not a positive integer; the row was skipped.
    InvalidId,
}

impl fmt::Display for ReadIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self
            .record_id
            .map_or_else(|| "?".to_string(), |id| id.to_string());
        match &self.kind {
            ReadIssueKind::InvalidNumber { raw } => write!(
                f,
                "{}#{id}.{}: invalid number {raw:?}, defaulted",
                self.table, self.column
            ),
            ReadIssueKind::InvalidAttributes { message } => write!(
                f,
                "{}#{id}.{}: {message}, left empty",
                self.table, self.column
            ),
            ReadIssueKind::InvalidId => {
                write!(f, "{}#{id}: invalid id, row skipped", self.table)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::from(ValidationError::EmptyProductName);
        assert_eq!(
            err.to_string(),
            "validation failed: product name cannot be empty"
        );

        let err = StoreError::NotFound("product 7".to_string());
        assert_eq!(err.to_string(), "not found: product 7");
    }

    #[test]
    fn test_read_issue_display() {
        let issue = ReadIssue {
            table: "products",
            record_id: Some(3),
            column: "price".to_string(),
            kind: ReadIssueKind::InvalidNumber {
                raw: "abc".to_string(),
            },
        };
        assert_eq!(
            issue.to_string(),
            "products#3.price: invalid number \"abc\", defaulted"
        );
    }

    #[test]
    fn test_fetched_degraded() {
        let clean = Fetched::clean(vec![1, 2]);
        assert!(!clean.is_degraded());

        let degraded = Fetched {
            records: vec![1],
            issues: vec![ReadIssue {
                table: "inventory",
                record_id: None,
                column: "id".to_string(),
                kind: ReadIssueKind::InvalidId,
            }],
        };
        assert!(degraded.is_degraded());
    }
}
