//! Product commands.

use rust_decimal::Decimal;
use tracing::{info, warn};

use tarstock_core::{NewProduct, Product, ProductId};

use super::{CommandError, Context};

/// Editable product fields; `None` leaves a field unchanged.
#[derive(Debug, clap::Args)]
pub struct ProductFields {
    /// Product name
    #[arg(long)]
    pub name: Option<String>,

    /// Unit price
    #[arg(long)]
    pub price: Option<Decimal>,

    /// Units in stock
    #[arg(long)]
    pub stock: Option<i64>,

    #[arg(long)]
    pub category: Option<String>,

    /// Product type
    #[arg(long = "type")]
    pub product_type: Option<String>,

    #[arg(long)]
    pub vendor: Option<String>,

    #[arg(long)]
    pub brand: Option<String>,

    /// Unit of sale (e.g. pcs, kg)
    #[arg(long)]
    pub unit: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

macro_rules! apply_fields {
    ($fields:expr, $target:expr) => {{
        let fields = $fields;
        let target = $target;
        if let Some(name) = fields.name {
            target.name = name;
        }
        if let Some(price) = fields.price {
            target.price = price;
        }
        if let Some(stock) = fields.stock {
            target.stock = stock;
        }
        if fields.category.is_some() {
            target.category = fields.category;
        }
        if fields.product_type.is_some() {
            target.product_type = fields.product_type;
        }
        if fields.vendor.is_some() {
            target.vendor = fields.vendor;
        }
        if fields.brand.is_some() {
            target.brand = fields.brand;
        }
        if fields.unit.is_some() {
            target.unit = fields.unit;
        }
        if fields.notes.is_some() {
            target.notes = fields.notes;
        }
    }};
}

/// Print every product.
///
/// # Errors
///
/// Returns error if the product list cannot be loaded.
#[allow(clippy::print_stdout)]
pub async fn list(ctx: &Context, refresh: bool) -> Result<(), CommandError> {
    let products = if refresh {
        ctx.service.refresh_products().await?
    } else {
        ctx.service.load_products().await?
    };

    for issue in ctx.service.read_issues().await {
        warn!(%issue, "Product list is degraded");
    }

    println!("{:>6}  {:<32}  {:>10}  {:>6}  CATEGORY", "ID", "NAME", "PRICE", "STOCK");
    for product in products.iter() {
        println!(
            "{:>6}  {:<32}  {:>10}  {:>6}  {}",
            product.id.as_i64(),
            product.name,
            product.price.to_string(),
            product.stock,
            product.category.as_deref().unwrap_or("")
        );
    }
    info!(count = products.len(), "Listed products");
    Ok(())
}

/// Print one product with its inventory.
///
/// # Errors
///
/// Returns `ProductNotFound` for an unknown id, otherwise the load error.
#[allow(clippy::print_stdout)]
pub async fn show(ctx: &Context, id: ProductId) -> Result<(), CommandError> {
    let product = ctx.select(id).await?;
    print_product(&product);

    let inventory = ctx.service.inventory().await;
    println!("inventory ({}):", inventory.len());
    for item in inventory.iter() {
        println!(
            "  {:>6}  {:<24}  sku={:<12}  available={:<4}  committed={:<4}  instock={}",
            item.id.as_i64(),
            item.name,
            item.sku,
            item.available,
            item.committed,
            item.effective_instock()
        );
    }
    Ok(())
}

/// Create a product from the template and the given fields.
///
/// # Errors
///
/// Returns `Failed` with the service's reason if creation is rejected.
pub async fn create(ctx: &Context, fields: ProductFields) -> Result<(), CommandError> {
    let mut product: NewProduct = ctx.service.new_product_template();
    apply_fields!(fields, &mut product);

    let Some(created) = ctx.service.create_new_product(product).await else {
        return Err(ctx.failure("create product").await);
    };
    print_product(&created);
    Ok(())
}

/// Apply the given fields to an existing product.
///
/// # Errors
///
/// Returns `ProductNotFound` for an unknown id or `Failed` with the service's
/// reason if the update is rejected.
pub async fn update(
    ctx: &Context,
    id: ProductId,
    fields: ProductFields,
) -> Result<(), CommandError> {
    let mut product = ctx.select(id).await?;
    apply_fields!(fields, &mut product);

    if !ctx.service.update_product_details(product.clone()).await {
        return Err(ctx.failure("update product").await);
    }
    print_product(&product);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_product(product: &Product) {
    println!("id:        {}", product.id);
    println!("name:      {}", product.name);
    println!("store:     {}", product.store_id);
    println!("price:     {}", product.price);
    println!("stock:     {}", product.stock);
    for (label, value) in [
        ("type", &product.product_type),
        ("category", &product.category),
        ("vendor", &product.vendor),
        ("brand", &product.brand),
        ("unit", &product.unit),
    ] {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            println!("{:<10} {value}", format!("{label}:"));
        }
    }
    for url in product.image_urls() {
        println!("image:     {url}");
    }
    for option in &product.options {
        println!("option:    {} = {}", option.name, option.values.join(", "));
    }
    for channel in &product.channels {
        println!(
            "channel:   {} ({})",
            channel.name,
            if channel.enabled { "on" } else { "off" }
        );
    }
}
