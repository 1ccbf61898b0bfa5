//! Test support for the Tarstock client.
//!
//! [`FakeStore`] is an in-memory [`CatalogStore`] that counts the requests
//! that would have reached the database, can be told to fail the next call
//! of an operation, and can delay fetches so tests can overlap them.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p tarstock-integration-tests
//! ```
//!
//! No network or database is needed.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use tarstock_client::catalog::{CatalogStore, Fetched, StoreError};
use tarstock_client::gateway::GatewayError;
use tarstock_client::{ProductService, ReadIssue};
use tarstock_core::{InventoryId, InventoryItem, NewProduct, Product, ProductId};

/// Store operations, for counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    FetchProducts,
    FetchInventory(ProductId),
    FetchAllInventory,
    CreateProduct,
    UpdateProduct,
    CreateInventoryItem,
    UpdateInventoryItem,
    DeleteInventoryItem,
}

#[derive(Default)]
struct FakeState {
    products: Vec<Product>,
    inventory: Vec<InventoryItem>,
    product_issues: Vec<ReadIssue>,
    calls: HashMap<Op, usize>,
    fail_next: HashSet<Op>,
    delays: HashMap<Op, Duration>,
}

/// In-memory catalog.
///
/// Validation runs before a request is counted, the way the remote catalog
/// rejects records before contacting the gateway.
pub struct FakeStore {
    state: Mutex<FakeState>,
    next_id: AtomicI64,
}

impl Default for FakeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            next_id: AtomicI64::new(1000),
        }
    }

    /// Store seeded with products.
    #[must_use]
    pub fn with_products(products: Vec<Product>) -> Self {
        let store = Self::new();
        store.lock().products = products;
        store
    }

    /// Add inventory rows.
    #[must_use]
    pub fn and_inventory(self, inventory: Vec<InventoryItem>) -> Self {
        self.lock().inventory.extend(inventory);
        self
    }

    /// Report these issues with every product fetch.
    pub fn set_product_issues(&self, issues: Vec<ReadIssue>) {
        self.lock().product_issues = issues;
    }

    /// Make the next call of `op` fail with a gateway error.
    pub fn fail_next(&self, op: Op) {
        self.lock().fail_next.insert(op);
    }

    /// Delay every call of `op`.
    pub fn delay(&self, op: Op, delay: Duration) {
        self.lock().delays.insert(op, delay);
    }

    /// How many requests for `op` would have reached the database.
    #[must_use]
    pub fn calls(&self, op: Op) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Requests of any kind that would have reached the database.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    /// Stored inventory rows.
    #[must_use]
    pub fn stored_inventory(&self) -> Vec<InventoryItem> {
        self.lock().inventory.clone()
    }

    /// Stored products.
    #[must_use]
    pub fn stored_products(&self) -> Vec<Product> {
        self.lock().products.clone()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count a request, wait out any delay, then fail it if a failure is
    /// pending.
    async fn request(&self, op: Op) -> Result<(), StoreError> {
        let delay = {
            let mut state = self.lock();
            *state.calls.entry(op).or_default() += 1;
            state.delays.get(&op).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.lock().fail_next.remove(&op) {
            return Err(StoreError::Gateway(GatewayError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            }));
        }
        Ok(())
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogStore for FakeStore {
    async fn fetch_products(&self) -> Result<Fetched<Product>, StoreError> {
        self.request(Op::FetchProducts).await?;
        let state = self.lock();
        Ok(Fetched {
            records: state.products.clone(),
            issues: state.product_issues.clone(),
        })
    }

    async fn fetch_inventory_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Fetched<InventoryItem>, StoreError> {
        self.request(Op::FetchInventory(product_id)).await?;
        let records = self
            .lock()
            .inventory
            .iter()
            .filter(|i| i.product_id == product_id)
            .cloned()
            .collect();
        Ok(Fetched::clean(records))
    }

    async fn fetch_all_inventory(&self) -> Result<Fetched<InventoryItem>, StoreError> {
        self.request(Op::FetchAllInventory).await?;
        Ok(Fetched::clean(self.lock().inventory.clone()))
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        product.validate()?;
        self.request(Op::CreateProduct).await?;
        let created = product.with_id(ProductId::new(self.next_id()));
        self.lock().products.push(created.clone());
        Ok(created)
    }

    async fn update_product(&self, product: &Product) -> Result<(), StoreError> {
        product.validate()?;
        self.request(Op::UpdateProduct).await?;
        let mut state = self.lock();
        let stored = state
            .products
            .iter_mut()
            .find(|p| p.id == product.id)
            .ok_or_else(|| StoreError::NotFound(format!("product {}", product.id)))?;
        stored.clone_from(product);
        Ok(())
    }

    async fn create_inventory_item(
        &self,
        item: InventoryItem,
    ) -> Result<InventoryItem, StoreError> {
        item.validate()?;
        self.request(Op::CreateInventoryItem).await?;
        let created = InventoryItem {
            id: InventoryId::new(self.next_id()),
            ..item.with_derived_instock()
        };
        self.lock().inventory.push(created.clone());
        Ok(created)
    }

    async fn update_inventory_item(&self, item: &InventoryItem) -> Result<(), StoreError> {
        item.validate()?;
        self.request(Op::UpdateInventoryItem).await?;
        let mut state = self.lock();
        let stored = state
            .inventory
            .iter_mut()
            .find(|i| i.id == item.id)
            .ok_or_else(|| StoreError::NotFound(format!("inventory item {}", item.id)))?;
        *stored = item.clone().with_derived_instock();
        Ok(())
    }

    async fn delete_inventory_item(&self, id: InventoryId) -> Result<(), StoreError> {
        self.request(Op::DeleteInventoryItem).await?;
        let mut state = self.lock();
        let before = state.inventory.len();
        state.inventory.retain(|i| i.id != id);
        if state.inventory.len() == before {
            return Err(StoreError::NotFound(format!("inventory item {id}")));
        }
        Ok(())
    }
}

/// A service over `store`, in store `S1` with unit `pcs`.
#[must_use]
pub fn service(store: &Arc<FakeStore>) -> ProductService {
    ProductService::new(Arc::clone(store) as Arc<dyn CatalogStore>, "S1", "pcs")
}

/// A saved product.
#[must_use]
pub fn product(id: i64, name: &str) -> Product {
    NewProduct {
        name: name.to_string(),
        ..NewProduct::default()
    }
    .with_id(ProductId::new(id))
}

/// A saved inventory item.
#[must_use]
pub fn inventory_item(id: i64, product_id: i64, name: &str, sku: &str) -> InventoryItem {
    InventoryItem {
        id: InventoryId::new(id),
        name: name.to_string(),
        sku: sku.to_string(),
        ..InventoryItem::draft(ProductId::new(product_id))
    }
}
