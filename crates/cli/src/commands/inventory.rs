//! Inventory commands.

use rust_decimal::Decimal;
use tracing::warn;

use tarstock_client::{CatalogStore, GatewayClient, RemoteCatalog};
use tarstock_core::{InventoryId, InventoryItem, ProductId};

use super::{CommandError, Context};

/// Editable inventory fields; `None` leaves a field unchanged.
#[derive(Debug, clap::Args)]
pub struct InventoryFields {
    /// Variant name
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub sku: Option<String>,

    #[arg(long)]
    pub barcode: Option<String>,

    #[arg(long)]
    pub available: Option<i64>,

    #[arg(long)]
    pub committed: Option<i64>,

    /// Explicit in-stock count (derived from available and committed if omitted)
    #[arg(long)]
    pub instock: Option<i64>,

    #[arg(long)]
    pub price: Option<Decimal>,

    /// Compare-at price
    #[arg(long)]
    pub compare: Option<Decimal>,

    #[arg(long)]
    pub cost: Option<Decimal>,

    #[arg(long)]
    pub location: Option<String>,
}

impl InventoryFields {
    fn apply(self, item: &mut InventoryItem) {
        if let Some(name) = self.name {
            item.name = name;
        }
        if let Some(sku) = self.sku {
            item.sku = sku;
        }
        if let Some(available) = self.available {
            item.available = available;
            item.instock = None;
        }
        if let Some(committed) = self.committed {
            item.committed = committed;
            item.instock = None;
        }
        if self.instock.is_some() {
            item.instock = self.instock;
        }
        if self.barcode.is_some() {
            item.barcode = self.barcode;
        }
        if self.price.is_some() {
            item.price = self.price;
        }
        if self.compare.is_some() {
            item.compare_at_price = self.compare;
        }
        if self.cost.is_some() {
            item.cost = self.cost;
        }
        if self.location.is_some() {
            item.location = self.location;
        }
    }
}

/// Print inventory of every product.
///
/// # Errors
///
/// Returns error if the inventory cannot be fetched.
#[allow(clippy::print_stdout)]
pub async fn list_all(ctx: &Context) -> Result<(), CommandError> {
    let catalog = RemoteCatalog::new(GatewayClient::new(&ctx.config.gateway)?);
    let fetched = catalog.fetch_all_inventory().await?;
    for issue in &fetched.issues {
        warn!(%issue, "Inventory list is degraded");
    }

    println!(
        "{:>6}  {:>8}  {:<24}  {:<12}  INSTOCK",
        "ID", "PRODUCT", "NAME", "SKU"
    );
    for item in &fetched.records {
        println!(
            "{:>6}  {:>8}  {:<24}  {:<12}  {}",
            item.id.as_i64(),
            item.product_id.as_i64(),
            item.name,
            item.sku,
            item.effective_instock()
        );
    }
    Ok(())
}

/// Add an inventory item to a product.
///
/// # Errors
///
/// Returns `ProductNotFound` for an unknown product or `Failed` with the
/// service's reason if the item is rejected.
pub async fn add(
    ctx: &Context,
    product_id: ProductId,
    fields: InventoryFields,
) -> Result<(), CommandError> {
    ctx.select(product_id).await?;
    let mut draft = ctx.service.add_inventory_draft().await?;
    fields.apply(&mut draft);

    let Some(saved) = ctx.service.save_inventory_item(draft).await else {
        // Leave nothing half-added in the service state.
        ctx.service.delete_inventory_item(InventoryId::UNSAVED).await;
        return Err(ctx.failure("add inventory item").await);
    };
    print_item(&saved);
    Ok(())
}

/// Apply the given fields to an existing inventory item.
///
/// # Errors
///
/// Returns `ProductNotFound`/`InventoryItemNotFound` for unknown ids or
/// `Failed` with the service's reason if the update is rejected.
pub async fn update(
    ctx: &Context,
    product_id: ProductId,
    item_id: InventoryId,
    fields: InventoryFields,
) -> Result<(), CommandError> {
    ctx.select(product_id).await?;
    let mut item = ctx
        .service
        .inventory()
        .await
        .iter()
        .find(|i| i.id == item_id)
        .cloned()
        .ok_or(CommandError::InventoryItemNotFound(item_id))?;
    fields.apply(&mut item);

    let Some(saved) = ctx.service.save_inventory_item(item).await else {
        return Err(ctx.failure("update inventory item").await);
    };
    print_item(&saved);
    Ok(())
}

/// Delete an inventory item.
///
/// # Errors
///
/// Returns `ProductNotFound` for an unknown product or `Failed` with the
/// service's reason if the delete is rejected.
#[allow(clippy::print_stdout)]
pub async fn delete(
    ctx: &Context,
    product_id: ProductId,
    item_id: InventoryId,
) -> Result<(), CommandError> {
    ctx.select(product_id).await?;
    if !ctx.service.delete_inventory_item(item_id).await {
        return Err(ctx.failure("delete inventory item").await);
    }
    println!("deleted inventory item {item_id}");
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_item(item: &InventoryItem) {
    println!("id:         {}", item.id);
    println!("product:    {}", item.product_id);
    println!("name:       {}", item.name);
    println!("sku:        {}", item.sku);
    println!("available:  {}", item.available);
    println!("committed:  {}", item.committed);
    println!("instock:    {}", item.effective_instock());
    if let Some(price) = item.price {
        println!("price:      {price}");
    }
    if let Some(compare) = item.compare_at_price {
        println!("compare at: {compare}");
    }
    if let Some(cost) = item.cost {
        println!("cost:       {cost}");
    }
}
