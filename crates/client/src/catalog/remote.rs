//! [`CatalogStore`] over the database gateway.

use async_trait::async_trait;
use tracing::{info, instrument};

use tarstock_core::{InventoryId, InventoryItem, NewProduct, Product, ProductId};

use super::rows::{inventory_from_result, products_from_result};
use super::{CatalogStore, Fetched, StoreError, statements};
use crate::gateway::{GatewayClient, Statement, StatementResult, Value};

/// Catalog backed by the hosted database.
#[derive(Debug, Clone)]
pub struct RemoteCatalog {
    gateway: GatewayClient,
}

impl RemoteCatalog {
    #[must_use]
    pub const fn new(gateway: GatewayClient) -> Self {
        Self { gateway }
    }

    /// Run an insert and read back its rowid on the same connection.
    async fn insert(
        &self,
        table: &'static str,
        insert: Statement,
    ) -> Result<i64, StoreError> {
        let results = self
            .gateway
            .execute_batch(vec![insert, statements::last_insert_id()])
            .await?;
        inserted_id(&results).ok_or(StoreError::MissingInsertId(table))
    }
}

/// The id from `SELECT last_insert_rowid()`, or failing that the rowid the
/// insert itself reported.
fn inserted_id(results: &[StatementResult]) -> Option<i64> {
    let selected = results
        .get(1)
        .and_then(|r| r.rows.first())
        .and_then(|row| row.first())
        .and_then(|cell| match cell {
            Value::Integer { value } | Value::Text { value } => value.parse().ok(),
            _ => None,
        });

    selected
        .or_else(|| {
            results
                .first()
                .and_then(|r| r.last_insert_rowid.as_deref())
                .and_then(|id| id.parse().ok())
        })
        .filter(|id| *id > 0)
}

#[async_trait]
impl CatalogStore for RemoteCatalog {
    #[instrument(skip(self))]
    async fn fetch_products(&self) -> Result<Fetched<Product>, StoreError> {
        let result = self.gateway.execute(statements::select_products()).await?;
        let fetched = products_from_result(&result);
        info!(
            count = fetched.records.len(),
            issues = fetched.issues.len(),
            "Fetched products"
        );
        Ok(fetched)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn fetch_inventory_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Fetched<InventoryItem>, StoreError> {
        let result = self
            .gateway
            .execute(statements::select_inventory_for_product(product_id))
            .await?;
        let fetched = inventory_from_result(&result);
        info!(
            count = fetched.records.len(),
            issues = fetched.issues.len(),
            "Fetched inventory"
        );
        Ok(fetched)
    }

    #[instrument(skip(self))]
    async fn fetch_all_inventory(&self) -> Result<Fetched<InventoryItem>, StoreError> {
        let result = self
            .gateway
            .execute(statements::select_all_inventory())
            .await?;
        let fetched = inventory_from_result(&result);
        info!(
            count = fetched.records.len(),
            issues = fetched.issues.len(),
            "Fetched all inventory"
        );
        Ok(fetched)
    }

    #[instrument(skip(self, product), fields(name = %product.name))]
    async fn create_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        product.validate()?;
        let insert = statements::insert_product(&product)?;
        let id = ProductId::new(self.insert("product", insert).await?);
        info!(product_id = %id, "Created product");
        Ok(product.with_id(id))
    }

    #[instrument(skip(self, product), fields(product_id = %product.id))]
    async fn update_product(&self, product: &Product) -> Result<(), StoreError> {
        product.validate()?;
        let result = self
            .gateway
            .execute(statements::update_product(product)?)
            .await?;
        if result.affected_row_count == 0 {
            return Err(StoreError::NotFound(format!("product {}", product.id)));
        }
        info!("Updated product");
        Ok(())
    }

    #[instrument(skip(self, item), fields(product_id = %item.product_id, sku = %item.sku))]
    async fn create_inventory_item(
        &self,
        item: InventoryItem,
    ) -> Result<InventoryItem, StoreError> {
        item.validate()?;
        let item = item.with_derived_instock();
        let insert = statements::insert_inventory_item(&item)?;
        let id = InventoryId::new(self.insert("inventory item", insert).await?);
        info!(inventory_id = %id, "Created inventory item");
        Ok(InventoryItem { id, ..item })
    }

    #[instrument(skip(self, item), fields(inventory_id = %item.id))]
    async fn update_inventory_item(&self, item: &InventoryItem) -> Result<(), StoreError> {
        item.validate()?;
        let item = item.clone().with_derived_instock();
        let result = self
            .gateway
            .execute(statements::update_inventory_item(&item)?)
            .await?;
        if result.affected_row_count == 0 {
            return Err(StoreError::NotFound(format!("inventory item {}", item.id)));
        }
        info!("Updated inventory item");
        Ok(())
    }

    #[instrument(skip(self), fields(inventory_id = %id))]
    async fn delete_inventory_item(&self, id: InventoryId) -> Result<(), StoreError> {
        let result = self
            .gateway
            .execute(statements::delete_inventory_item(id))
            .await?;
        if result.affected_row_count == 0 {
            return Err(StoreError::NotFound(format!("inventory item {id}")));
        }
        info!("Deleted inventory item");
        Ok(())
    }
}
