//! Tarstock CLI - browse and edit the product catalog from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # List products (served from the cache after the first load)
//! tarstock products list
//!
//! # Show one product with its inventory
//! tarstock products show 42
//!
//! # Create and edit products
//! tarstock products create --name "Oat Latte" --price 4.50 --category Coffee
//! tarstock products update 42 --stock 12
//!
//! # Manage inventory
//! tarstock inventory add 42 --name Large --sku LAT-L --available 10 --committed 3
//! tarstock inventory update 42 7 --committed 5
//! tarstock inventory delete 42 7
//!
//! # Images
//! tarstock images upload ./latte.jpg --product 42
//! tarstock images detach 42 2
//! tarstock images link products/1718000000000-k3j9x0a1b2c3d.jpg
//! ```
//!
//! Configuration comes from the environment (see `tarstock_client::config`).
//! Set `TARSTOCK_LOG_JSON` for JSON log output.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tarstock_core::{InventoryId, ProductId};

mod commands;

use commands::inventory::InventoryFields;
use commands::products::ProductFields;
use commands::{CommandError, Context};

#[derive(Parser)]
#[command(name = "tarstock")]
#[command(author, version, about = "Tarstock catalog tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse and edit products
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Manage a product's inventory items
    Inventory {
        #[command(subcommand)]
        action: InventoryAction,
    },
    /// Upload and link product images
    Images {
        #[command(subcommand)]
        action: ImageAction,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// List all products
    List {
        /// Fetch again instead of using the cached list
        #[arg(long)]
        refresh: bool,
    },
    /// Show a product and its inventory
    Show { id: i64 },
    /// Create a product
    Create {
        #[command(flatten)]
        fields: ProductFields,
    },
    /// Update a product
    Update {
        id: i64,
        #[command(flatten)]
        fields: ProductFields,
    },
}

#[derive(Subcommand)]
enum InventoryAction {
    /// List inventory of every product
    List,
    /// Add an inventory item to a product
    Add {
        product_id: i64,
        #[command(flatten)]
        fields: InventoryFields,
    },
    /// Update an inventory item
    Update {
        product_id: i64,
        item_id: i64,
        #[command(flatten)]
        fields: InventoryFields,
    },
    /// Delete an inventory item
    Delete { product_id: i64, item_id: i64 },
}

#[derive(Subcommand)]
enum ImageAction {
    /// Upload an image and print its public URL
    Upload {
        path: PathBuf,
        /// Attach the image to this product
        #[arg(long)]
        product: Option<i64>,
    },
    /// Clear a product's image slot (1-5)
    Detach { product_id: i64, slot: usize },
    /// Print a presigned download link for an object key
    Link { key: String },
    /// Download an object to a local file
    Download { key: String, destination: PathBuf },
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tarstock=info,tarstock_client=info".into());

    // JSON for log shipping, text otherwise
    let json = std::env::var("TARSTOCK_LOG_JSON").is_ok();
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    let ctx = Context::from_env()?;

    match cli.command {
        Commands::Products { action } => match action {
            ProductAction::List { refresh } => commands::products::list(&ctx, refresh).await?,
            ProductAction::Show { id } => commands::products::show(&ctx, ProductId::new(id)).await?,
            ProductAction::Create { fields } => commands::products::create(&ctx, fields).await?,
            ProductAction::Update { id, fields } => {
                commands::products::update(&ctx, ProductId::new(id), fields).await?;
            }
        },
        Commands::Inventory { action } => match action {
            InventoryAction::List => commands::inventory::list_all(&ctx).await?,
            InventoryAction::Add { product_id, fields } => {
                commands::inventory::add(&ctx, ProductId::new(product_id), fields).await?;
            }
            InventoryAction::Update {
                product_id,
                item_id,
                fields,
            } => {
                commands::inventory::update(
                    &ctx,
                    ProductId::new(product_id),
                    InventoryId::new(item_id),
                    fields,
                )
                .await?;
            }
            InventoryAction::Delete {
                product_id,
                item_id,
            } => {
                commands::inventory::delete(
                    &ctx,
                    ProductId::new(product_id),
                    InventoryId::new(item_id),
                )
                .await?;
            }
        },
        Commands::Images { action } => match action {
            ImageAction::Upload { path, product } => {
                commands::images::upload(&ctx, &path, product.map(ProductId::new)).await?;
            }
            ImageAction::Detach { product_id, slot } => {
                commands::images::detach(&ctx, ProductId::new(product_id), slot).await?;
            }
            ImageAction::Link { key } => commands::images::link(&ctx, &key)?,
            ImageAction::Download { key, destination } => {
                commands::images::download(&ctx, &key, &destination).await?;
            }
        },
    }

    ctx.service.shutdown().await;
    Ok(())
}
