//! Product service: the cached catalog state the app screens work from.
//!
//! [`ProductService`] owns the product list, the current selection and the
//! selected product's inventory, and routes every change through a
//! [`CatalogStore`]. It is constructed explicitly around its store so tests
//! can substitute a fake.
//!
//! Loads go through `moka` caches keyed by what is being fetched; concurrent
//! loads of the same key share one pending request. The cache only holds a
//! load while it is in flight: the lists themselves live in the service state
//! and are updated in place by mutations. Nothing is retried automatically.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use moka::future::Cache;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};

use tarstock_core::{InventoryId, InventoryItem, NewProduct, Product, ProductId};

use crate::catalog::{CatalogStore, Fetched, ReadIssue, RemoteCatalog, StoreError};
use crate::config::ClientConfig;
use crate::gateway::{GatewayClient, GatewayError};

/// Errors surfaced by the product service.
///
/// Cheap to clone so the last one can be kept on the service for display.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(Arc<StoreError>),

    /// An inventory operation was attempted with no product selected.
    #[error("no product selected")]
    NoProductSelected,
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        Self::Store(Arc::new(err))
    }
}

/// State of the selected product's inventory panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InventoryStatus {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Error,
}

/// A completed fetch, shared by every caller that waited on it.
#[derive(Debug)]
struct Loaded<T> {
    records: Arc<Vec<T>>,
    issues: Vec<ReadIssue>,
}

impl<T> From<Fetched<T>> for Loaded<T> {
    fn from(fetched: Fetched<T>) -> Self {
        Self {
            records: Arc::new(fetched.records),
            issues: fetched.issues,
        }
    }
}

#[derive(Debug, Default)]
struct ServiceState {
    products: Arc<Vec<Product>>,
    products_loaded: bool,
    selected: Option<Product>,
    inventory: Arc<Vec<InventoryItem>>,
    inventory_status: InventoryStatus,
    last_error: Option<ServiceError>,
    read_issues: Vec<ReadIssue>,
}

impl ServiceState {
    fn selected_id(&self) -> Option<ProductId> {
        self.selected.as_ref().map(|p| p.id)
    }

    fn record_error(&mut self, err: ServiceError) {
        self.last_error = Some(err);
    }
}

/// Cached catalog state and the operations that change it.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ProductService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    store: Arc<dyn CatalogStore>,
    product_loads: Cache<(), Arc<Loaded<Product>>>,
    inventory_loads: Cache<ProductId, Arc<Loaded<InventoryItem>>>,
    state: RwLock<ServiceState>,
    in_flight: AtomicUsize,
    product_loads_in_flight: AtomicUsize,
    store_id: String,
    default_unit: String,
}

impl std::fmt::Debug for ProductService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductService")
            .field("store_id", &self.inner.store_id)
            .field("in_flight", &self.inner.in_flight.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Marks a store call in flight for as long as it lives.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ProductService {
    /// Create a service over `store`.
    ///
    /// New products are created in `store_id` with `default_unit`.
    #[must_use]
    pub fn new(
        store: Arc<dyn CatalogStore>,
        store_id: impl Into<String>,
        default_unit: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                store,
                product_loads: Cache::builder().max_capacity(1).build(),
                inventory_loads: Cache::builder().max_capacity(64).build(),
                state: RwLock::new(ServiceState::default()),
                in_flight: AtomicUsize::new(0),
                product_loads_in_flight: AtomicUsize::new(0),
                store_id: store_id.into(),
                default_unit: default_unit.into(),
            }),
        }
    }

    /// Create a service backed by the hosted database.
    ///
    /// # Errors
    ///
    /// Returns error if the gateway client fails to build.
    pub fn from_config(config: &ClientConfig) -> Result<Self, GatewayError> {
        let gateway = GatewayClient::new(&config.gateway)?;
        Ok(Self::new(
            Arc::new(RemoteCatalog::new(gateway)),
            config.store_id.clone(),
            config.default_unit.clone(),
        ))
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// The product list, fetching it unless it is already loaded and non-empty.
    ///
    /// While a product fetch is in flight the cached list is stale, so the
    /// call joins that fetch instead.
    ///
    /// # Errors
    ///
    /// Returns the store error, which is also kept as the last error.
    pub async fn load_products(&self) -> Result<Arc<Vec<Product>>, ServiceError> {
        {
            let state = self.inner.state.read().await;
            let pending = self.inner.product_loads_in_flight.load(Ordering::SeqCst) > 0;
            if state.products_loaded && !state.products.is_empty() && !pending {
                debug!(count = state.products.len(), "Product list served from cache");
                return Ok(Arc::clone(&state.products));
            }
        }
        self.fetch_products().await
    }

    /// Fetch the product list again regardless of what is cached.
    ///
    /// # Errors
    ///
    /// Returns the store error, which is also kept as the last error.
    pub async fn refresh_products(&self) -> Result<Arc<Vec<Product>>, ServiceError> {
        self.fetch_products().await
    }

    #[instrument(skip(self))]
    async fn fetch_products(&self) -> Result<Arc<Vec<Product>>, ServiceError> {
        let _loading = InFlight::start(&self.inner.in_flight);
        let _fetching = InFlight::start(&self.inner.product_loads_in_flight);
        let store = Arc::clone(&self.inner.store);
        let result = self
            .inner
            .product_loads
            .try_get_with((), async move {
                store.fetch_products().await.map(|f| Arc::new(Loaded::from(f)))
            })
            .await;
        self.inner.product_loads.invalidate(&()).await;

        let mut state = self.inner.state.write().await;
        match result {
            Ok(loaded) => {
                state.products = Arc::clone(&loaded.records);
                state.products_loaded = true;
                state.read_issues.clone_from(&loaded.issues);
                state.last_error = None;
                Ok(Arc::clone(&loaded.records))
            }
            Err(err) => {
                error!(error = %err, "Failed to load products");
                let err = ServiceError::Store(err);
                state.record_error(err.clone());
                Err(err)
            }
        }
    }

    /// Save edits to an existing product.
    ///
    /// On success the cached list and the selection pick up the new values.
    /// On failure the error is kept as the last error and `false` returned.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn update_product_details(&self, product: Product) -> bool {
        let _loading = InFlight::start(&self.inner.in_flight);
        let result = self.inner.store.update_product(&product).await;

        let mut state = self.inner.state.write().await;
        match result {
            Ok(()) => {
                if let Some(entry) = Arc::make_mut(&mut state.products)
                    .iter_mut()
                    .find(|p| p.id == product.id)
                {
                    entry.clone_from(&product);
                }
                if state.selected_id() == Some(product.id) {
                    state.selected = Some(product);
                }
                state.last_error = None;
                info!("Product details saved");
                true
            }
            Err(err) => {
                error!(error = %err, "Failed to update product");
                state.record_error(err.into());
                false
            }
        }
    }

    /// Create a product, put it at the head of the list and select it.
    ///
    /// On failure the error is kept as the last error and `None` returned.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create_new_product(&self, product: NewProduct) -> Option<Product> {
        let _loading = InFlight::start(&self.inner.in_flight);
        let result = self.inner.store.create_product(product).await;

        let mut state = self.inner.state.write().await;
        match result {
            Ok(created) => {
                Arc::make_mut(&mut state.products).insert(0, created.clone());
                state.products_loaded = true;
                state.selected = Some(created.clone());
                // Nothing to fetch for a product that was just created.
                state.inventory = Arc::default();
                state.inventory_status = InventoryStatus::Loaded;
                state.last_error = None;
                info!(product_id = %created.id, "Product created");
                Some(created)
            }
            Err(err) => {
                error!(error = %err, "Failed to create product");
                state.record_error(err.into());
                None
            }
        }
    }

    /// Blank product for a creation form.
    #[must_use]
    pub fn new_product_template(&self) -> NewProduct {
        NewProduct::template(&self.inner.store_id, &self.inner.default_unit)
    }

    // =========================================================================
    // Selection and inventory
    // =========================================================================

    /// Select a product and load its inventory.
    ///
    /// # Errors
    ///
    /// Returns the store error if the inventory fetch fails.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn select_product(&self, product: Product) -> Result<(), ServiceError> {
        let id = product.id;
        {
            let mut state = self.inner.state.write().await;
            state.selected = Some(product);
            state.inventory = Arc::default();
            state.inventory_status = InventoryStatus::Loading;
        }
        self.load_inventory(id).await
    }

    /// Fetch the selected product's inventory again.
    ///
    /// # Errors
    ///
    /// Returns `NoProductSelected` without a selection, otherwise the store
    /// error if the fetch fails.
    pub async fn reload_inventory(&self) -> Result<(), ServiceError> {
        let id = {
            let mut state = self.inner.state.write().await;
            let id = state.selected_id().ok_or(ServiceError::NoProductSelected)?;
            state.inventory_status = InventoryStatus::Loading;
            id
        };
        self.load_inventory(id).await
    }

    #[instrument(skip(self))]
    async fn load_inventory(&self, product_id: ProductId) -> Result<(), ServiceError> {
        let _loading = InFlight::start(&self.inner.in_flight);
        let store = Arc::clone(&self.inner.store);
        let result = self
            .inner
            .inventory_loads
            .try_get_with(product_id, async move {
                store
                    .fetch_inventory_for_product(product_id)
                    .await
                    .map(|f| Arc::new(Loaded::from(f)))
            })
            .await;
        self.inner.inventory_loads.invalidate(&product_id).await;

        let mut state = self.inner.state.write().await;
        let current = state.selected_id() == Some(product_id);
        if !current {
            debug!("Selection changed while loading; inventory discarded");
        }

        match result {
            Ok(loaded) => {
                if current {
                    state.inventory = Arc::clone(&loaded.records);
                    state.inventory_status = InventoryStatus::Loaded;
                    state.read_issues.clone_from(&loaded.issues);
                    state.last_error = None;
                }
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "Failed to load inventory");
                let err = ServiceError::Store(err);
                if current {
                    state.inventory_status = InventoryStatus::Error;
                    state.record_error(err.clone());
                }
                Err(err)
            }
        }
    }

    /// Put an unsaved item at the head of the selected product's inventory.
    ///
    /// Returns the existing draft if there already is one.
    ///
    /// # Errors
    ///
    /// Returns `NoProductSelected` without a selection.
    pub async fn add_inventory_draft(&self) -> Result<InventoryItem, ServiceError> {
        let mut state = self.inner.state.write().await;
        let product_id = state.selected_id().ok_or(ServiceError::NoProductSelected)?;

        if let Some(draft) = state.inventory.iter().find(|i| i.is_unsaved()) {
            return Ok(draft.clone());
        }

        let draft = InventoryItem::draft(product_id);
        Arc::make_mut(&mut state.inventory).insert(0, draft.clone());
        Ok(draft)
    }

    /// Create or update an inventory item.
    ///
    /// Unsaved items are created and replace the draft; saved items are
    /// updated in place. On failure the error is kept as the last error and
    /// `None` returned.
    #[instrument(skip(self, item), fields(inventory_id = %item.id, product_id = %item.product_id))]
    pub async fn save_inventory_item(&self, item: InventoryItem) -> Option<InventoryItem> {
        let _loading = InFlight::start(&self.inner.in_flight);
        let was_draft = item.is_unsaved();
        let result = if was_draft {
            self.inner.store.create_inventory_item(item).await
        } else {
            let saved = item.clone().with_derived_instock();
            self.inner
                .store
                .update_inventory_item(&item)
                .await
                .map(|()| saved)
        };

        let mut state = self.inner.state.write().await;
        match result {
            Ok(saved) => {
                if state.selected_id() == Some(saved.product_id) {
                    let inventory = Arc::make_mut(&mut state.inventory);
                    // A created item takes the draft's place, an update its own.
                    let slot = if was_draft {
                        inventory.iter().position(InventoryItem::is_unsaved)
                    } else {
                        inventory.iter().position(|i| i.id == saved.id)
                    };
                    match slot {
                        Some(index) => {
                            if let Some(entry) = inventory.get_mut(index) {
                                entry.clone_from(&saved);
                            }
                        }
                        None => inventory.insert(0, saved.clone()),
                    }
                }
                state.last_error = None;
                info!(inventory_id = %saved.id, "Inventory item saved");
                Some(saved)
            }
            Err(err) => {
                error!(error = %err, "Failed to save inventory item");
                state.record_error(err.into());
                None
            }
        }
    }

    /// Delete an inventory item. An unsaved draft is dropped locally.
    ///
    /// On failure the error is kept as the last error and `false` returned.
    #[instrument(skip(self), fields(inventory_id = %id))]
    pub async fn delete_inventory_item(&self, id: InventoryId) -> bool {
        if id.is_unsaved() {
            let mut state = self.inner.state.write().await;
            Arc::make_mut(&mut state.inventory).retain(|i| !i.is_unsaved());
            debug!("Draft discarded");
            return true;
        }

        let _loading = InFlight::start(&self.inner.in_flight);
        let result = self.inner.store.delete_inventory_item(id).await;

        let mut state = self.inner.state.write().await;
        match result {
            Ok(()) => {
                Arc::make_mut(&mut state.inventory).retain(|i| i.id != id);
                state.last_error = None;
                info!("Inventory item deleted");
                true
            }
            Err(err) => {
                error!(error = %err, "Failed to delete inventory item");
                state.record_error(err.into());
                false
            }
        }
    }

    // =========================================================================
    // State
    // =========================================================================

    pub async fn products(&self) -> Arc<Vec<Product>> {
        Arc::clone(&self.inner.state.read().await.products)
    }

    pub async fn selected_product(&self) -> Option<Product> {
        self.inner.state.read().await.selected.clone()
    }

    /// Inventory of the selected product, draft first if there is one.
    pub async fn inventory(&self) -> Arc<Vec<InventoryItem>> {
        Arc::clone(&self.inner.state.read().await.inventory)
    }

    /// Whether any store call is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst) > 0
    }

    pub async fn last_error(&self) -> Option<ServiceError> {
        self.inner.state.read().await.last_error.clone()
    }

    pub async fn clear_error(&self) {
        self.inner.state.write().await.last_error = None;
    }

    pub async fn products_loaded(&self) -> bool {
        self.inner.state.read().await.products_loaded
    }

    pub async fn inventory_status(&self) -> InventoryStatus {
        self.inner.state.read().await.inventory_status
    }

    /// Values that had to be defaulted in the most recent fetch.
    pub async fn read_issues(&self) -> Vec<ReadIssue> {
        self.inner.state.read().await.read_issues.clone()
    }

    /// Drop cached lists and reset to the initial state.
    pub async fn shutdown(&self) {
        self.inner.product_loads.invalidate_all();
        self.inner.inventory_loads.invalidate_all();
        self.inner.product_loads.run_pending_tasks().await;
        self.inner.inventory_loads.run_pending_tasks().await;
        *self.inner.state.write().await = ServiceState::default();
        info!("Product service reset");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    /// Store whose reads succeed empty and whose writes are never expected.
    struct EmptyStore;

    #[async_trait]
    impl CatalogStore for EmptyStore {
        async fn fetch_products(&self) -> Result<Fetched<Product>, StoreError> {
            Ok(Fetched::clean(Vec::new()))
        }

        async fn fetch_inventory_for_product(
            &self,
            _product_id: ProductId,
        ) -> Result<Fetched<InventoryItem>, StoreError> {
            Ok(Fetched::clean(Vec::new()))
        }

        async fn fetch_all_inventory(&self) -> Result<Fetched<InventoryItem>, StoreError> {
            Ok(Fetched::clean(Vec::new()))
        }

        async fn create_product(&self, product: NewProduct) -> Result<Product, StoreError> {
            Ok(product.with_id(ProductId::new(1)))
        }

        async fn update_product(&self, product: &Product) -> Result<(), StoreError> {
            Err(StoreError::NotFound(format!("product {}", product.id)))
        }

        async fn create_inventory_item(
            &self,
            item: InventoryItem,
        ) -> Result<InventoryItem, StoreError> {
            Ok(InventoryItem {
                id: InventoryId::new(100),
                ..item.with_derived_instock()
            })
        }

        async fn update_inventory_item(&self, _item: &InventoryItem) -> Result<(), StoreError> {
            Ok(())
        }

        async fn delete_inventory_item(&self, _id: InventoryId) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn service() -> ProductService {
        ProductService::new(Arc::new(EmptyStore), "S7", "kg")
    }

    #[test]
    fn test_new_product_template_uses_configured_defaults() {
        let template = service().new_product_template();
        assert_eq!(template.store_id, "S7");
        assert_eq!(template.unit.as_deref(), Some("kg"));
        assert!(template.name.is_empty());
        assert!(template.options.is_empty());
    }

    #[test]
    fn test_in_flight_guard() {
        let counter = AtomicUsize::new(0);
        {
            let _a = InFlight::start(&counter);
            let _b = InFlight::start(&counter);
            assert_eq!(counter.load(Ordering::SeqCst), 2);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_list_is_not_a_cache_hit() {
        let service = service();
        let first = service.load_products().await.unwrap();
        let second = service.load_products().await.unwrap();
        assert!(first.is_empty());
        // An empty list is fetched again, so the second load is a new list.
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(service.products_loaded().await);
    }

    #[tokio::test]
    async fn test_draft_requires_selection() {
        let service = service();
        assert!(matches!(
            service.add_inventory_draft().await,
            Err(ServiceError::NoProductSelected)
        ));
        assert!(matches!(
            service.reload_inventory().await,
            Err(ServiceError::NoProductSelected)
        ));
    }

    #[tokio::test]
    async fn test_single_draft_saved_in_place() {
        let service = service();
        let product = service
            .create_new_product(NewProduct {
                name: "Latte".to_string(),
                ..service.new_product_template()
            })
            .await
            .unwrap();
        assert_eq!(service.inventory_status().await, InventoryStatus::Loaded);

        let draft = service.add_inventory_draft().await.unwrap();
        let again = service.add_inventory_draft().await.unwrap();
        assert_eq!(draft, again);
        assert_eq!(service.inventory().await.len(), 1);

        let saved = service
            .save_inventory_item(InventoryItem {
                name: "Large".to_string(),
                sku: "LAT-L".to_string(),
                available: 4,
                committed: 1,
                ..draft
            })
            .await
            .unwrap();
        assert_eq!(saved.id, InventoryId::new(100));
        assert_eq!(saved.product_id, product.id);
        assert_eq!(saved.instock, Some(3));

        let inventory = service.inventory().await;
        assert_eq!(inventory.as_slice(), std::slice::from_ref(&saved));
    }

    #[tokio::test]
    async fn test_discard_draft_is_local() {
        let service = service();
        service
            .create_new_product(NewProduct {
                name: "Tea".to_string(),
                ..service.new_product_template()
            })
            .await
            .unwrap();
        service.add_inventory_draft().await.unwrap();

        assert!(service.delete_inventory_item(InventoryId::UNSAVED).await);
        assert!(service.inventory().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_update_records_error() {
        let service = service();
        let product = NewProduct {
            name: "Mocha".to_string(),
            ..service.new_product_template()
        }
        .with_id(ProductId::new(9));

        assert!(!service.update_product_details(product).await);
        let err = service.last_error().await.unwrap();
        assert_eq!(err.to_string(), "not found: product 9");
        assert!(!service.is_loading());

        service.clear_error().await;
        assert!(service.last_error().await.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_resets_state() {
        let service = service();
        service
            .create_new_product(NewProduct {
                name: "Chai".to_string(),
                ..service.new_product_template()
            })
            .await
            .unwrap();

        service.shutdown().await;
        assert!(service.products().await.is_empty());
        assert!(service.selected_product().await.is_none());
        assert!(!service.products_loaded().await);
        assert_eq!(service.inventory_status().await, InventoryStatus::Unloaded);
    }
}
