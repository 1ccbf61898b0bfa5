//! Validation rules applied before a record is persisted.

use thiserror::Error;

use super::attributes::{Metafield, Modifier, ProductOption};

/// Maximum number of options a product may define.
pub const MAX_OPTIONS: usize = 3;

/// A record failed validation and must not be sent to the database.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("product name cannot be empty")]
    EmptyProductName,

    #[error("inventory item name cannot be empty")]
    EmptyInventoryName,

    #[error("inventory item SKU cannot be empty")]
    EmptySku,

    #[error("at most {max} options are allowed (got {count})")]
    TooManyOptions { max: usize, count: usize },

    #[error("option name cannot be empty")]
    EmptyOptionName,

    #[error("modifier name and value cannot be empty")]
    IncompleteModifier,

    #[error("metafield key and value cannot be empty")]
    IncompleteMetafield,
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

pub(crate) fn require_product_name(name: &str) -> Result<(), ValidationError> {
    if is_blank(name) {
        return Err(ValidationError::EmptyProductName);
    }
    Ok(())
}

pub(crate) fn check_options(options: &[ProductOption]) -> Result<(), ValidationError> {
    if options.len() > MAX_OPTIONS {
        return Err(ValidationError::TooManyOptions {
            max: MAX_OPTIONS,
            count: options.len(),
        });
    }
    if options.iter().any(|o| is_blank(&o.name)) {
        return Err(ValidationError::EmptyOptionName);
    }
    Ok(())
}

pub(crate) fn check_modifiers(modifiers: &[Modifier]) -> Result<(), ValidationError> {
    if modifiers
        .iter()
        .any(|m| is_blank(&m.name) || is_blank(&m.value))
    {
        return Err(ValidationError::IncompleteModifier);
    }
    Ok(())
}

pub(crate) fn check_metafields(metafields: &[Metafield]) -> Result<(), ValidationError> {
    if metafields
        .iter()
        .any(|m| is_blank(&m.key) || is_blank(&m.value))
    {
        return Err(ValidationError::IncompleteMetafield);
    }
    Ok(())
}

pub(crate) fn require_inventory_fields(name: &str, sku: &str) -> Result<(), ValidationError> {
    if is_blank(name) {
        return Err(ValidationError::EmptyInventoryName);
    }
    if is_blank(sku) {
        return Err(ValidationError::EmptySku);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_name_rejected() {
        assert_eq!(
            require_product_name("   "),
            Err(ValidationError::EmptyProductName)
        );
        assert!(require_product_name("Latte").is_ok());
    }

    #[test]
    fn test_option_limit() {
        let options: Vec<_> = ["Size", "Color", "Milk", "Cup"]
            .into_iter()
            .map(ProductOption::new)
            .collect();
        assert_eq!(
            check_options(&options),
            Err(ValidationError::TooManyOptions { max: 3, count: 4 })
        );
        assert!(check_options(&options[..3]).is_ok());
    }

    #[test]
    fn test_inventory_requires_name_before_sku() {
        assert_eq!(
            require_inventory_fields("", ""),
            Err(ValidationError::EmptyInventoryName)
        );
        assert_eq!(
            require_inventory_fields("Small", " "),
            Err(ValidationError::EmptySku)
        );
        assert!(require_inventory_fields("Small", "LAT-S").is_ok());
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::TooManyOptions { max: 3, count: 5 };
        assert_eq!(err.to_string(), "at most 3 options are allowed (got 5)");
    }
}
