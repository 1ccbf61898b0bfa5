//! Catalog products.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::attributes::{Channel, Metafield, Modifier, ProductOption};
use super::id::ProductId;
use super::validation::{self, ValidationError};

/// Store a product belongs to when none is configured.
pub const DEFAULT_STORE_ID: &str = "S1";

/// Unit a new product starts with when none is configured.
pub const DEFAULT_UNIT: &str = "pcs";

/// Number of image slots on a product.
pub const MAX_IMAGES: usize = 5;

/// A product that has not been persisted yet.
///
/// Holds every product attribute except the id, which the database assigns
/// on creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub store_id: String,
    pub name: String,
    /// Image URLs, one per slot (`f1`..`f5` columns).
    pub images: [Option<String>; MAX_IMAGES],
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    pub category: Option<String>,
    pub collection: Option<String>,
    pub unit: Option<String>,
    pub price: Decimal,
    pub stock: i64,
    pub vendor: Option<String>,
    pub brand: Option<String>,
    pub options: Vec<ProductOption>,
    pub modifiers: Vec<Modifier>,
    pub metafields: Vec<Metafield>,
    pub channels: Vec<Channel>,
    pub notes: Option<String>,
}

impl NewProduct {
    /// Zero-valued product used to seed a creation form.
    #[must_use]
    pub fn template(store_id: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
            name: String::new(),
            images: Default::default(),
            product_type: Some(String::new()),
            category: Some(String::new()),
            collection: None,
            unit: Some(unit.into()),
            price: Decimal::ZERO,
            stock: 0,
            vendor: Some(String::new()),
            brand: Some(String::new()),
            options: Vec::new(),
            modifiers: Vec::new(),
            metafields: Vec::new(),
            channels: Vec::new(),
            notes: None,
        }
    }

    /// Attach the database-assigned id.
    #[must_use]
    pub fn with_id(self, id: ProductId) -> Product {
        Product {
            id,
            store_id: self.store_id,
            name: self.name,
            images: self.images,
            product_type: self.product_type,
            category: self.category,
            collection: self.collection,
            unit: self.unit,
            price: self.price,
            stock: self.stock,
            vendor: self.vendor,
            brand: self.brand,
            options: self.options,
            modifiers: self.modifiers,
            metafields: self.metafields,
            channels: self.channels,
            notes: self.notes,
        }
    }

    /// Check the record can be persisted.
    ///
    /// # Errors
    ///
    /// Returns the first rule the record breaks.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.name, &self.options, &self.modifiers, &self.metafields)
    }
}

impl Default for NewProduct {
    fn default() -> Self {
        Self::template(DEFAULT_STORE_ID, DEFAULT_UNIT)
    }
}

/// A persisted catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub store_id: String,
    pub name: String,
    pub images: [Option<String>; MAX_IMAGES],
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    pub category: Option<String>,
    pub collection: Option<String>,
    pub unit: Option<String>,
    pub price: Decimal,
    pub stock: i64,
    pub vendor: Option<String>,
    pub brand: Option<String>,
    pub options: Vec<ProductOption>,
    pub modifiers: Vec<Modifier>,
    pub metafields: Vec<Metafield>,
    pub channels: Vec<Channel>,
    pub notes: Option<String>,
}

impl Product {
    /// Check the record can be persisted.
    ///
    /// # Errors
    ///
    /// Returns the first rule the record breaks.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.name, &self.options, &self.modifiers, &self.metafields)
    }

    /// Image URLs that are set, in slot order.
    pub fn image_urls(&self) -> impl Iterator<Item = &str> {
        self.images.iter().filter_map(|slot| slot.as_deref())
    }

    /// Put an image into the first free slot.
    ///
    /// Returns the slot index, or `None` when all slots are taken.
    pub fn add_image(&mut self, url: impl Into<String>) -> Option<usize> {
        let index = self.images.iter().position(Option::is_none)?;
        if let Some(slot) = self.images.get_mut(index) {
            *slot = Some(url.into());
        }
        Some(index)
    }

    /// Clear an image slot, returning what it held.
    pub fn remove_image(&mut self, index: usize) -> Option<String> {
        self.images.get_mut(index).and_then(Option::take)
    }

    /// Whether the named channel is enabled.
    #[must_use]
    pub fn channel_enabled(&self, name: &str) -> bool {
        self.channels.iter().any(|c| c.name == name && c.enabled)
    }
}

fn validate_fields(
    name: &str,
    options: &[ProductOption],
    modifiers: &[Modifier],
    metafields: &[Metafield],
) -> Result<(), ValidationError> {
    validation::require_product_name(name)?;
    validation::check_options(options)?;
    validation::check_modifiers(modifiers)?;
    validation::check_metafields(metafields)
}
