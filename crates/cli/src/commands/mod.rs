//! Command implementations.

pub mod images;
pub mod inventory;
pub mod products;

use thiserror::Error;

use tarstock_client::{
    ClientConfig, ConfigError, GatewayError, ProductService, ServiceError, StorageError,
    StoreError,
};
use tarstock_core::{InventoryId, Product, ProductId};

/// Errors a command can end with.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Image commands need the `STORAGE_*` variables.
    #[error("object storage is not configured (set the STORAGE_* variables)")]
    StorageNotConfigured,

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("inventory item {0} not found")]
    InventoryItemNotFound(InventoryId),

    #[error("product {0} has no free image slot")]
    ImageSlotsFull(ProductId),

    /// Slots are numbered from 1 as printed by `images upload`.
    #[error("product {product} has no image in slot {slot}")]
    ImageSlotEmpty { product: ProductId, slot: usize },

    /// A service operation reported failure.
    #[error("{action} failed: {reason}")]
    Failed {
        action: &'static str,
        reason: String,
    },
}

/// Configuration and service shared by every command.
pub struct Context {
    pub config: ClientConfig,
    pub service: ProductService,
}

impl Context {
    /// Load configuration and connect.
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid or the gateway client fails to
    /// build.
    pub fn from_env() -> Result<Self, CommandError> {
        let config = ClientConfig::from_env()?;
        let service = ProductService::from_config(&config)?;
        Ok(Self { config, service })
    }

    /// Load the product list and select one product, loading its inventory.
    ///
    /// # Errors
    ///
    /// Returns `ProductNotFound` for an unknown id, otherwise the load error.
    pub async fn select(&self, id: ProductId) -> Result<Product, CommandError> {
        let products = self.service.load_products().await?;
        let product = products
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(CommandError::ProductNotFound(id))?;
        self.service.select_product(product.clone()).await?;
        Ok(product)
    }

    /// Turn the service's last error into a command failure.
    pub async fn failure(&self, action: &'static str) -> CommandError {
        let reason = self
            .service
            .last_error()
            .await
            .map_or_else(|| "unknown error".to_string(), |e| e.to_string());
        CommandError::Failed { action, reason }
    }
}
