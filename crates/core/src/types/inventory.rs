//! Inventory items (variants) belonging to a product.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::attributes::{Metafield, Modifier};
use super::id::{InventoryId, ProductId};
use super::validation::{self, ValidationError};

/// A stock-keeping unit of a product.
///
/// A locally created item that has not been saved carries
/// [`InventoryId::UNSAVED`] until the database assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: InventoryId,
    pub product_id: ProductId,
    pub name: String,
    /// Image URL (`f` column).
    pub image: Option<String>,
    pub sku: String,
    pub barcode: Option<String>,
    pub available: i64,
    pub committed: i64,
    /// Explicit in-stock count. When absent it is `available - committed`.
    pub instock: Option<i64>,
    pub price: Option<Decimal>,
    /// Compare-at price (`compare` column).
    pub compare_at_price: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub location: Option<String>,
    pub modifiers: Vec<Modifier>,
    pub metafields: Vec<Metafield>,
}

impl InventoryItem {
    /// Empty local item for a product, not yet persisted.
    #[must_use]
    pub fn draft(product_id: ProductId) -> Self {
        Self {
            id: InventoryId::UNSAVED,
            product_id,
            name: String::new(),
            image: None,
            sku: String::new(),
            barcode: Some(String::new()),
            available: 0,
            committed: 0,
            instock: None,
            price: Some(Decimal::ZERO),
            compare_at_price: None,
            cost: None,
            location: Some(String::new()),
            modifiers: Vec::new(),
            metafields: Vec::new(),
        }
    }

    /// Whether this item exists only locally.
    #[must_use]
    pub const fn is_unsaved(&self) -> bool {
        self.id.is_unsaved()
    }

    /// In-stock count, derived from available and committed when not set.
    #[must_use]
    pub fn effective_instock(&self) -> i64 {
        self.instock
            .unwrap_or_else(|| self.available.saturating_sub(self.committed))
    }

    /// Fill in the in-stock count if it was not given explicitly.
    #[must_use]
    pub fn with_derived_instock(mut self) -> Self {
        self.instock = Some(self.effective_instock());
        self
    }

    /// Check the record can be persisted.
    ///
    /// # Errors
    ///
    /// Returns the first rule the record breaks.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::require_inventory_fields(&self.name, &self.sku)?;
        validation::check_modifiers(&self.modifiers)?;
        validation::check_metafields(&self.metafields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(available: i64, committed: i64, instock: Option<i64>) -> InventoryItem {
        InventoryItem {
            name: "Small".to_string(),
            sku: "LAT-S".to_string(),
            available,
            committed,
            instock,
            ..InventoryItem::draft(ProductId::new(1))
        }
    }

    #[test]
    fn test_instock_derived_when_absent() {
        assert_eq!(item(10, 3, None).effective_instock(), 7);
        assert_eq!(item(5, 5, None).effective_instock(), 0);
    }

    #[test]
    fn test_explicit_instock_wins() {
        assert_eq!(item(10, 3, Some(4)).effective_instock(), 4);
    }

    #[test]
    fn test_with_derived_instock() {
        let derived = item(10, 3, None).with_derived_instock();
        assert_eq!(derived.instock, Some(7));
    }

    #[test]
    fn test_draft_is_unsaved_and_invalid() {
        let draft = InventoryItem::draft(ProductId::new(9));
        assert!(draft.is_unsaved());
        assert_eq!(draft.product_id, ProductId::new(9));
        assert_eq!(draft.validate(), Err(ValidationError::EmptyInventoryName));
    }

    #[test]
    fn test_validate_requires_sku() {
        let mut record = item(1, 0, None);
        record.sku = String::new();
        assert_eq!(record.validate(), Err(ValidationError::EmptySku));
    }

    #[test]
    fn test_validate_checks_modifiers() {
        let mut record = item(1, 0, None);
        record.modifiers = vec![Modifier::new("Milk", " ")];
        assert_eq!(record.validate(), Err(ValidationError::IncompleteModifier));
    }
}
