//! Core types for Tarstock.
//!
//! This module provides type-safe wrappers for catalog records.

pub mod attributes;
pub mod id;
pub mod inventory;
pub mod product;
pub mod validation;

pub use attributes::{
    AttributeError, AttributeId, AttributeKind, Channel, Metafield, Modifier, ProductOption,
    decode_attributes, encode_attributes,
};
pub use id::*;
pub use inventory::InventoryItem;
pub use product::{DEFAULT_STORE_ID, DEFAULT_UNIT, MAX_IMAGES, NewProduct, Product};
pub use validation::{MAX_OPTIONS, ValidationError};
