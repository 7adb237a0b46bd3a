//! Cart display and inventory commands.

use rocketshoes_cart::{CartStore, Inventory, InventoryError};
use rocketshoes_core::{CurrencyCode, ProductId};
use tracing::info;

use super::Session;

/// Log the cart contents and totals.
pub fn show(store: &CartStore, currency: CurrencyCode) {
    let cart = store.cart();

    if cart.is_empty() {
        info!("Cart is empty");
        return;
    }

    for item in &cart {
        info!(
            id = %item.id,
            title = %item.title().unwrap_or("(untitled)"),
            amount = item.amount,
            price = %item.price(currency).map_or_else(|| "-".to_string(), |p| p.display()),
            total = %item.line_total(currency).map_or_else(|| "-".to_string(), |p| p.display()),
            "Line item"
        );
    }

    info!(
        products = cart.len(),
        units = cart.item_count(),
        subtotal = %cart.subtotal(currency).display(),
        "Cart totals"
    );
}

/// Log current stock for a product.
///
/// # Errors
///
/// Returns `InventoryError` if the lookup fails.
pub async fn stock(session: &Session, product_id: ProductId) -> Result<(), InventoryError> {
    let stock = session.inventory.stock(product_id).await?;
    let in_cart = session.store.cart().amount_of(product_id);

    info!(
        id = %product_id,
        available = stock.amount,
        in_cart,
        "Stock"
    );
    Ok(())
}
