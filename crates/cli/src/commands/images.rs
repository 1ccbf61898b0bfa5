//! Image commands.

use std::path::Path;

use tarstock_client::ObjectStorage;
use tarstock_core::ProductId;

use super::{CommandError, Context};

fn storage(ctx: &Context) -> Result<ObjectStorage, CommandError> {
    let config = ctx
        .config
        .storage()
        .ok_or(CommandError::StorageNotConfigured)?;
    Ok(ObjectStorage::new(config)?)
}

/// Upload an image and print its public URL, optionally attaching it to a
/// product's first free image slot.
///
/// # Errors
///
/// Returns error if storage is not configured, the upload fails, or the
/// product cannot take another image.
#[allow(clippy::print_stdout)]
pub async fn upload(
    ctx: &Context,
    path: &Path,
    product_id: Option<ProductId>,
) -> Result<(), CommandError> {
    let storage = storage(ctx)?;

    // Check the product first so a full product doesn't leave an orphaned upload.
    let product = match product_id {
        Some(id) => {
            let product = ctx.select(id).await?;
            if product.images.iter().all(Option::is_some) {
                return Err(CommandError::ImageSlotsFull(id));
            }
            Some(product)
        }
        None => None,
    };

    let url = storage.upload_product_image(path).await?;

    if let Some(mut product) = product {
        let slot = product
            .add_image(url.clone())
            .ok_or(CommandError::ImageSlotsFull(product.id))?;
        if !ctx.service.update_product_details(product).await {
            return Err(ctx.failure("attach image").await);
        }
        println!("attached to slot {}", slot + 1);
    }

    println!("{url}");
    Ok(())
}

/// Clear one of a product's image slots (numbered from 1).
///
/// The object itself stays in the bucket.
///
/// # Errors
///
/// Returns `ImageSlotEmpty` when the slot holds nothing, otherwise the
/// service's reason if saving the product fails.
#[allow(clippy::print_stdout)]
pub async fn detach(
    ctx: &Context,
    product_id: ProductId,
    slot: usize,
) -> Result<(), CommandError> {
    let mut product = ctx.select(product_id).await?;
    let url = slot
        .checked_sub(1)
        .and_then(|index| product.remove_image(index))
        .ok_or(CommandError::ImageSlotEmpty {
            product: product_id,
            slot,
        })?;

    if !ctx.service.update_product_details(product).await {
        return Err(ctx.failure("detach image").await);
    }
    println!("detached {url}");
    Ok(())
}

/// Print a time-limited download link for an object.
///
/// # Errors
///
/// Returns error if storage is not configured or signing fails.
#[allow(clippy::print_stdout)]
pub fn link(ctx: &Context, key: &str) -> Result<(), CommandError> {
    println!("{}", storage(ctx)?.presign_get(key)?);
    Ok(())
}

/// Download an object to a local file.
///
/// # Errors
///
/// Returns error if storage is not configured or the download fails.
#[allow(clippy::print_stdout)]
pub async fn download(ctx: &Context, key: &str, destination: &Path) -> Result<(), CommandError> {
    let bytes = storage(ctx)?.download_object(key, destination).await?;
    println!("wrote {bytes} bytes to {}", destination.display());
    Ok(())
}
