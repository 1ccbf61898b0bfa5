//! Tarstock Core - catalog records and the rules they must satisfy.
//!
//! Products and their inventory items are plain data here. The `client`
//! crate moves them to and from the database gateway and caches them; the
//! `cli` crate edits them from a terminal.
//!
//! Nothing in this crate performs I/O. Validation ([`Product::validate`],
//! [`InventoryItem::validate`]) lives next to the types so every store
//! applies the same checks before writing.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, products, inventory items, and their nested
//!   attributes (options, modifiers, metafields, channels)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
