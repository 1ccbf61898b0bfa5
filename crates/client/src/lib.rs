//! Tarstock client: everything between the app screens and the hosted
//! database and image bucket.
//!
//! # Layers
//!
//! - [`config`] - Environment configuration
//! - [`gateway`] - HTTP client for the database's pipeline endpoint
//! - [`catalog`] - Product and inventory reads and writes ([`CatalogStore`])
//! - [`storage`] - Presigned uploads and downloads of product images
//! - [`service`] - Cached product/inventory state ([`ProductService`])
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use tarstock_client::{ClientConfig, ProductService};
//!
//! let config = ClientConfig::from_env()?;
//! let service = ProductService::from_config(&config)?;
//! let products = service.load_products().await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod gateway;
pub mod service;
pub mod storage;

pub use catalog::{CatalogStore, Fetched, ReadIssue, ReadIssueKind, RemoteCatalog, StoreError};
pub use config::{ClientConfig, ConfigError};
pub use gateway::{GatewayClient, GatewayError};
pub use service::{InventoryStatus, ProductService, ServiceError};
pub use storage::{ObjectStorage, StorageError};
