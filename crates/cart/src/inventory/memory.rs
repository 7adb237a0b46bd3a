//! Fixture inventory held in memory.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rocketshoes_core::ProductId;

use super::{Inventory, InventoryError};
use crate::model::{Product, Stock};

/// Inventory backed by in-process maps.
///
/// Counts lookups so callers can check that stock is consulted on every
/// mutation, and can be switched offline to exercise failure paths.
#[derive(Debug, Default)]
pub struct InMemoryInventory {
    state: Mutex<InventoryState>,
}

#[derive(Debug, Default)]
struct InventoryState {
    stock: HashMap<ProductId, i64>,
    products: HashMap<ProductId, Product>,
    stock_lookups: usize,
    product_lookups: usize,
    offline: bool,
}

impl InMemoryInventory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a product with the given stock.
    #[must_use]
    pub fn with_product(self, product: Product, stock: i64) -> Self {
        {
            let mut state = self.lock();
            state.stock.insert(product.id, stock);
            state.products.insert(product.id, product);
        }
        self
    }

    /// Set stock for a product. Products without details can still be
    /// stock-checked but fail the product lookup. Negative values are
    /// served as-is, the way a misbehaving API would.
    pub fn set_stock(&self, product_id: ProductId, amount: i64) {
        self.lock().stock.insert(product_id, amount);
    }

    /// Make every lookup fail with `InventoryError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Number of stock lookups served or refused so far.
    #[must_use]
    pub fn stock_lookups(&self) -> usize {
        self.lock().stock_lookups
    }

    /// Number of product lookups served or refused so far.
    #[must_use]
    pub fn product_lookups(&self) -> usize {
        self.lock().product_lookups
    }

    fn lock(&self) -> MutexGuard<'_, InventoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Inventory for InMemoryInventory {
    async fn stock(&self, product_id: ProductId) -> Result<Stock, InventoryError> {
        let mut state = self.lock();
        state.stock_lookups += 1;
        if state.offline {
            return Err(InventoryError::Unavailable("inventory is offline".to_string()));
        }
        state
            .stock
            .get(&product_id)
            .map(|&amount| Stock {
                id: product_id,
                amount,
            })
            .ok_or_else(|| InventoryError::NotFound(format!("stock/{product_id}")))
    }

    async fn product(&self, product_id: ProductId) -> Result<Product, InventoryError> {
        let mut state = self.lock();
        state.product_lookups += 1;
        if state.offline {
            return Err(InventoryError::Unavailable("inventory is offline".to_string()));
        }
        state
            .products
            .get(&product_id)
            .cloned()
            .ok_or_else(|| InventoryError::NotFound(format!("products/{product_id}")))
    }
}
