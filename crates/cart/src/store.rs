//! The cart store.
//!
//! [`CartStore`] owns the shopper's [`CartState`] and is the only way to
//! change it. Each operation:
//!
//! 1. checks the requested quantity against fresh stock from the inventory
//! 2. computes the next state without touching the current one
//! 3. writes the next state to storage
//! 4. publishes it to subscribers
//!
//! If any step fails the operation stops there, so storage and the
//! published state never diverge. The failure is returned as a
//! [`CartError`] and the matching [`CartWarning`](crate::CartWarning) goes
//! to the notifier.
//!
//! Operations on one store run one at a time; a second call waits for the
//! first to finish before it reads stock.

use std::sync::Arc;

use rocketshoes_core::ProductId;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument, warn};

use crate::error::{CartError, CartOperation, Result};
use crate::inventory::Inventory;
use crate::model::{CartState, LineItem, Stock};
use crate::notify::Notifier;
use crate::storage::{CartStorage, StorageError};

/// External services the store depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub inventory: Arc<dyn Inventory>,
    pub storage: Arc<dyn CartStorage>,
    pub notifier: Arc<dyn Notifier>,
}

/// Handle to a shopper's cart.
///
/// Cheap to clone; clones share the same cart.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    inventory: Arc<dyn Inventory>,
    storage: Arc<dyn CartStorage>,
    notifier: Arc<dyn Notifier>,
    storage_key: String,
    state: watch::Sender<CartState>,
    mutation: Mutex<()>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("storage_key", &self.inner.storage_key)
            .field("cart", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Create a store from whatever is persisted under `storage_key`.
    ///
    /// A missing slot yields an empty cart. A slot that cannot be parsed is
    /// logged and also yields an empty cart; it is left as-is until the next
    /// successful mutation overwrites it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the slot cannot be read.
    pub fn load(collaborators: Collaborators, storage_key: impl Into<String>) -> Result<Self> {
        let storage_key = storage_key.into();
        let Collaborators {
            inventory,
            storage,
            notifier,
        } = collaborators;

        let cart = match storage.get_item(&storage_key)? {
            Some(raw) => CartState::from_persisted(&raw).unwrap_or_else(|e| {
                warn!(
                    key = %storage_key,
                    error = %e,
                    "Persisted cart is unreadable, starting empty"
                );
                CartState::new()
            }),
            None => CartState::new(),
        };
        info!(key = %storage_key, products = cart.len(), "Cart loaded");

        let (state, _) = watch::channel(cart);

        Ok(Self {
            inner: Arc::new(CartStoreInner {
                inventory,
                storage,
                notifier,
                storage_key,
                state,
                mutation: Mutex::new(()),
            }),
        })
    }

    /// Snapshot of the current cart.
    #[must_use]
    pub fn cart(&self) -> CartState {
        self.inner.state.borrow().clone()
    }

    /// Receiver that observes every published cart.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.inner.state.subscribe()
    }

    /// Storage slot this cart is persisted under.
    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.inner.storage_key
    }

    /// Add one unit of `product_id`.
    ///
    /// New products are looked up and appended with amount 1. For products
    /// already in the cart the add becomes an amount update to one more
    /// unit: stock is read again and failures from that step are reported
    /// as update failures.
    ///
    /// # Errors
    ///
    /// - `CartError::StockExceeded` if one more unit is not available
    /// - `CartError::Inventory` / `CartError::Storage` if a collaborator fails
    #[instrument(skip(self))]
    pub async fn add_product(&self, product_id: ProductId) -> Result<()> {
        let _guard = self.inner.mutation.lock().await;
        match self.try_add(product_id).await {
            Ok(None) => Ok(()),
            Ok(Some(requested)) => {
                let result = self.try_update(product_id, requested).await;
                self.settle(CartOperation::Update, result)
            }
            Err(err) => self.settle(CartOperation::Add, Err(err)),
        }
    }

    /// Remove `product_id` from the cart entirely.
    ///
    /// # Errors
    ///
    /// - `CartError::ProductNotFound` if the product is not in the cart
    /// - `CartError::Storage` if the write fails
    #[instrument(skip(self))]
    pub async fn remove_product(&self, product_id: ProductId) -> Result<()> {
        let _guard = self.inner.mutation.lock().await;
        let result = self.try_remove(product_id);
        self.settle(CartOperation::Remove, result)
    }

    /// Set the amount of a product already in the cart.
    ///
    /// Non-positive amounts are ignored: the call succeeds and nothing
    /// changes. Use [`remove_product`](Self::remove_product) to delete a line.
    ///
    /// # Errors
    ///
    /// - `CartError::StockExceeded` if `amount` is above current stock
    /// - `CartError::ProductNotFound` if the product is not in the cart
    /// - `CartError::Inventory` / `CartError::Storage` if a collaborator fails
    #[instrument(skip(self))]
    pub async fn update_product_amount(&self, product_id: ProductId, amount: i64) -> Result<()> {
        if amount <= 0 {
            debug!("Ignoring non-positive amount");
            return Ok(());
        }

        let _guard = self.inner.mutation.lock().await;
        let result = self.try_update(product_id, amount.unsigned_abs()).await;
        self.settle(CartOperation::Update, result)
    }

    /// Returns the amount to hand over to the update path when the product
    /// is already in the cart.
    async fn try_add(&self, product_id: ProductId) -> Result<Option<u64>> {
        let stock = self.inner.inventory.stock(product_id).await?;
        let cart = self.cart();
        let current = cart.amount_of(product_id);
        let requested = u64::from(current) + 1;
        let amount = within_stock(product_id, requested, &stock)?;

        if current > 0 {
            return Ok(Some(requested));
        }

        let product = self.inner.inventory.product(product_id).await?;
        self.commit(cart.with_line(LineItem::from_product(product, amount)))?;
        Ok(None)
    }

    fn try_remove(&self, product_id: ProductId) -> Result<()> {
        let next = self
            .cart()
            .without(product_id)
            .ok_or(CartError::ProductNotFound(product_id))?;
        self.commit(next)
    }

    async fn try_update(&self, product_id: ProductId, requested: u64) -> Result<()> {
        let stock = self.inner.inventory.stock(product_id).await?;
        let amount = within_stock(product_id, requested, &stock)?;
        let next = self
            .cart()
            .with_amount(product_id, amount)
            .ok_or(CartError::ProductNotFound(product_id))?;
        self.commit(next)
    }

    /// Persist `next`, then publish it.
    fn commit(&self, next: CartState) -> Result<()> {
        let raw = next.to_json().map_err(StorageError::from)?;
        self.inner.storage.set_item(&self.inner.storage_key, &raw)?;
        debug!(products = next.len(), units = next.item_count(), "Cart committed");
        self.inner.state.send_replace(next);
        Ok(())
    }

    /// Report a failed operation to the notifier and the log.
    fn settle(&self, operation: CartOperation, result: Result<()>) -> Result<()> {
        if let Err(err) = &result {
            warn!(operation = %operation, kind = ?err.kind(), error = %err, "Cart operation aborted");
            self.inner.notifier.notify(err.warning(operation));
        }
        result
    }
}

/// `requested` as a line amount, if stock allows it.
///
/// Stock below zero is treated like no stock at all.
fn within_stock(product_id: ProductId, requested: u64, stock: &Stock) -> Result<u32> {
    i64::try_from(requested)
        .ok()
        .filter(|&amount| amount <= stock.amount)
        .and_then(|amount| u32::try_from(amount).ok())
        .ok_or(CartError::StockExceeded {
            product_id,
            requested,
            available: stock.amount,
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::error::CartErrorKind;
    use crate::inventory::InMemoryInventory;
    use crate::model::Product;
    use crate::notify::{CartWarning, RecordingNotifier};
    use crate::storage::{DEFAULT_STORAGE_KEY, MemoryStorage};

    /// Storage whose writes always fail.
    struct ReadOnlyStorage(MemoryStorage);

    impl CartStorage for ReadOnlyStorage {
        fn get_item(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
            self.0.get_item(key)
        }

        fn set_item(&self, _key: &str, _value: &str) -> std::result::Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }
    }

    /// Storage that accepts one write and refuses the rest.
    #[derive(Default)]
    struct FailAfterFirstWrite {
        inner: MemoryStorage,
        writes: AtomicUsize,
    }

    impl CartStorage for FailAfterFirstWrite {
        fn get_item(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
            self.inner.get_item(key)
        }

        fn set_item(&self, key: &str, value: &str) -> std::result::Result<(), StorageError> {
            if self.writes.fetch_add(1, Ordering::SeqCst) > 0 {
                return Err(StorageError::Unavailable("quota exceeded".to_string()));
            }
            self.inner.set_item(key, value)
        }
    }

    struct Harness {
        store: CartStore,
        inventory: Arc<InMemoryInventory>,
        storage: Arc<MemoryStorage>,
        notifier: Arc<RecordingNotifier>,
    }

    impl Harness {
        fn persisted(&self) -> CartState {
            let raw = self.storage.get_item(DEFAULT_STORAGE_KEY).unwrap().unwrap();
            CartState::from_persisted(&raw).unwrap()
        }
    }

    fn product(id: i32) -> Product {
        serde_json::from_value(json!({
            "id": id,
            "title": format!("Tênis {id}"),
            "price": 179.9,
            "image": format!("https://cdn.example.com/{id}.jpg"),
        }))
        .unwrap()
    }

    fn harness(stock: &[(i32, i64)], persisted: Option<&str>) -> Harness {
        let inventory = stock
            .iter()
            .fold(InMemoryInventory::new(), |inv, &(id, amount)| {
                inv.with_product(product(id), amount)
            });
        let inventory = Arc::new(inventory);
        let storage = Arc::new(persisted.map_or_else(MemoryStorage::new, |raw| {
            MemoryStorage::with_item(DEFAULT_STORAGE_KEY, raw)
        }));
        let notifier = Arc::new(RecordingNotifier::new());

        let store = CartStore::load(
            Collaborators {
                inventory: inventory.clone(),
                storage: storage.clone(),
                notifier: notifier.clone(),
            },
            DEFAULT_STORAGE_KEY,
        )
        .unwrap();

        Harness {
            store,
            inventory,
            storage,
            notifier,
        }
    }

    #[tokio::test]
    async fn test_load_empty_when_nothing_persisted() {
        let h = harness(&[], None);
        assert!(h.store.cart().is_empty());
        assert_eq!(h.store.storage_key(), "@RocketShoes:cart");
    }

    #[tokio::test]
    async fn test_load_restores_persisted_cart() {
        let h = harness(&[], Some(r#"[{"id":5,"amount":2,"title":"Tênis 5"}]"#));
        let cart = h.store.cart();
        assert_eq!(cart.amount_of(ProductId::new(5)), 2);
        assert_eq!(cart.items()[0].title(), Some("Tênis 5"));
    }

    #[tokio::test]
    async fn test_load_unreadable_slot_starts_empty_and_keeps_slot() {
        let h = harness(&[], Some("not json"));
        assert!(h.store.cart().is_empty());
        assert_eq!(
            h.storage.get_item(DEFAULT_STORAGE_KEY).unwrap().as_deref(),
            Some("not json")
        );
    }

    #[tokio::test]
    async fn test_add_new_product() {
        let h = harness(&[(5, 3)], None);

        h.store.add_product(ProductId::new(5)).await.unwrap();

        let cart = h.store.cart();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.amount_of(ProductId::new(5)), 1);
        assert_eq!(cart.items()[0].title(), Some("Tênis 5"));
        assert_eq!(h.persisted(), cart);
        assert!(h.notifier.take().is_empty());
    }

    #[tokio::test]
    async fn test_add_existing_product_increments() {
        let h = harness(&[(5, 3)], None);

        h.store.add_product(ProductId::new(5)).await.unwrap();
        h.store.add_product(ProductId::new(5)).await.unwrap();

        assert_eq!(h.store.cart().len(), 1);
        assert_eq!(h.store.cart().amount_of(ProductId::new(5)), 2);
        assert_eq!(h.persisted(), h.store.cart());
        assert_eq!(h.inventory.stock_lookups(), 3);
        assert_eq!(h.inventory.product_lookups(), 1);
    }

    #[tokio::test]
    async fn test_add_existing_product_storage_failure_reports_update() {
        let inventory = Arc::new(InMemoryInventory::new().with_product(product(5), 3));
        let notifier = Arc::new(RecordingNotifier::new());
        let store = CartStore::load(
            Collaborators {
                inventory: inventory.clone(),
                storage: Arc::new(FailAfterFirstWrite::default()),
                notifier: notifier.clone(),
            },
            DEFAULT_STORAGE_KEY,
        )
        .unwrap();

        store.add_product(ProductId::new(5)).await.unwrap();
        let err = store.add_product(ProductId::new(5)).await.unwrap_err();

        assert!(matches!(err, CartError::Storage(_)));
        assert_eq!(notifier.take(), vec![CartWarning::UpdateFailed]);
        assert_eq!(store.cart().amount_of(ProductId::new(5)), 1);
        assert_eq!(inventory.stock_lookups(), 3);
    }

    #[tokio::test]
    async fn test_add_beyond_stock_is_refused() {
        let h = harness(&[(5, 1)], Some(r#"[{"id":5,"amount":1}]"#));
        let before = h.store.cart();

        let err = h.store.add_product(ProductId::new(5)).await.unwrap_err();

        assert_eq!(err.kind(), CartErrorKind::StockExceeded);
        assert_eq!(h.notifier.take(), vec![CartWarning::StockExceeded]);
        assert_eq!(h.store.cart(), before);
        assert_eq!(h.persisted(), before);
    }

    #[tokio::test]
    async fn test_add_out_of_stock_product_skips_product_lookup() {
        let h = harness(&[(5, 0)], None);

        let err = h.store.add_product(ProductId::new(5)).await.unwrap_err();

        assert_eq!(err.kind(), CartErrorKind::StockExceeded);
        assert_eq!(h.inventory.product_lookups(), 0);
        assert!(h.store.cart().is_empty());
    }

    #[tokio::test]
    async fn test_add_unknown_product_fails() {
        let h = harness(&[], None);

        let err = h.store.add_product(ProductId::new(42)).await.unwrap_err();

        assert_eq!(err.kind(), CartErrorKind::CollaboratorFailure);
        assert_eq!(h.notifier.take(), vec![CartWarning::AddFailed]);
        assert!(h.store.cart().is_empty());
        assert_eq!(h.storage.get_item(DEFAULT_STORAGE_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_add_with_stock_but_no_product_details_fails() {
        let h = harness(&[], None);
        h.inventory.set_stock(ProductId::new(7), 4);

        let err = h.store.add_product(ProductId::new(7)).await.unwrap_err();

        assert!(matches!(err, CartError::Inventory(_)));
        assert_eq!(h.notifier.take(), vec![CartWarning::AddFailed]);
        assert!(h.store.cart().is_empty());
    }

    #[tokio::test]
    async fn test_add_storage_failure_leaves_state_unchanged() {
        let inventory = Arc::new(InMemoryInventory::new().with_product(product(5), 3));
        let notifier = Arc::new(RecordingNotifier::new());
        let store = CartStore::load(
            Collaborators {
                inventory,
                storage: Arc::new(ReadOnlyStorage(MemoryStorage::new())),
                notifier: notifier.clone(),
            },
            DEFAULT_STORAGE_KEY,
        )
        .unwrap();
        let mut rx = store.subscribe();

        let err = store.add_product(ProductId::new(5)).await.unwrap_err();

        assert!(matches!(err, CartError::Storage(_)));
        assert_eq!(notifier.take(), vec![CartWarning::AddFailed]);
        assert!(store.cart().is_empty());
        assert!(!rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_empty());
    }

    #[tokio::test]
    async fn test_remove_product() {
        let h = harness(&[], Some(r#"[{"id":5,"amount":2},{"id":6,"amount":1}]"#));

        h.store.remove_product(ProductId::new(5)).await.unwrap();

        assert!(!h.store.cart().contains(ProductId::new(5)));
        assert_eq!(h.store.cart().len(), 1);
        assert_eq!(h.persisted(), h.store.cart());
    }

    #[tokio::test]
    async fn test_remove_last_product_persists_empty_list() {
        let h = harness(&[], Some(r#"[{"id":5,"amount":2}]"#));

        h.store.remove_product(ProductId::new(5)).await.unwrap();

        assert!(h.store.cart().is_empty());
        assert_eq!(
            h.storage.get_item(DEFAULT_STORAGE_KEY).unwrap().as_deref(),
            Some("[]")
        );
    }

    #[tokio::test]
    async fn test_remove_twice_reports_second_failure() {
        let h = harness(&[], Some(r#"[{"id":5,"amount":2}]"#));

        h.store.remove_product(ProductId::new(5)).await.unwrap();
        let err = h.store.remove_product(ProductId::new(5)).await.unwrap_err();

        assert_eq!(err.kind(), CartErrorKind::ProductNotFound);
        assert_eq!(h.notifier.take(), vec![CartWarning::RemoveFailed]);
        assert!(h.store.cart().is_empty());
    }

    #[tokio::test]
    async fn test_remove_never_checks_stock() {
        let h = harness(&[], Some(r#"[{"id":5,"amount":2}]"#));
        h.inventory.set_offline(true);

        h.store.remove_product(ProductId::new(5)).await.unwrap();

        assert_eq!(h.inventory.stock_lookups(), 0);
    }

    #[tokio::test]
    async fn test_update_amount() {
        let h = harness(&[(5, 10)], Some(r#"[{"id":5,"amount":2}]"#));

        h.store
            .update_product_amount(ProductId::new(5), 10)
            .await
            .unwrap();

        assert_eq!(h.store.cart().amount_of(ProductId::new(5)), 10);
        assert_eq!(h.persisted(), h.store.cart());
    }

    #[tokio::test]
    async fn test_update_non_positive_is_silent_noop() {
        let h = harness(&[(5, 10)], Some(r#"[{"id":5,"amount":2}]"#));

        h.store
            .update_product_amount(ProductId::new(5), 0)
            .await
            .unwrap();
        h.store
            .update_product_amount(ProductId::new(5), -3)
            .await
            .unwrap();

        assert_eq!(h.store.cart().amount_of(ProductId::new(5)), 2);
        assert!(h.notifier.take().is_empty());
        assert_eq!(h.inventory.stock_lookups(), 0);
    }

    #[tokio::test]
    async fn test_update_beyond_stock_is_refused() {
        let h = harness(&[(5, 3)], Some(r#"[{"id":5,"amount":2}]"#));

        let err = h
            .store
            .update_product_amount(ProductId::new(5), 4)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CartError::StockExceeded {
                requested: 4,
                available: 3,
                ..
            }
        ));
        assert_eq!(h.notifier.take(), vec![CartWarning::StockExceeded]);
        assert_eq!(h.store.cart().amount_of(ProductId::new(5)), 2);
    }

    #[tokio::test]
    async fn test_negative_stock_refuses_add_and_update() {
        let h = harness(&[(5, -2)], None);

        let err = h.store.add_product(ProductId::new(5)).await.unwrap_err();
        assert!(matches!(
            err,
            CartError::StockExceeded {
                requested: 1,
                available: -2,
                ..
            }
        ));
        assert_eq!(h.notifier.take(), vec![CartWarning::StockExceeded]);
        assert!(h.store.cart().is_empty());
        assert_eq!(h.inventory.product_lookups(), 0);

        let h = harness(&[(5, -1)], Some(r#"[{"id":5,"amount":1}]"#));
        let err = h
            .store
            .update_product_amount(ProductId::new(5), 1)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CartErrorKind::StockExceeded);
        assert_eq!(h.notifier.take(), vec![CartWarning::StockExceeded]);
        assert_eq!(h.persisted().amount_of(ProductId::new(5)), 1);
    }

    #[tokio::test]
    async fn test_update_huge_amount_is_stock_exceeded() {
        let h = harness(&[(5, 3)], Some(r#"[{"id":5,"amount":2}]"#));

        let err = h
            .store
            .update_product_amount(ProductId::new(5), i64::MAX)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), CartErrorKind::StockExceeded);
    }

    #[tokio::test]
    async fn test_update_missing_product_fails() {
        let h = harness(&[(5, 3)], None);

        let err = h
            .store
            .update_product_amount(ProductId::new(5), 1)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), CartErrorKind::ProductNotFound);
        assert_eq!(h.notifier.take(), vec![CartWarning::UpdateFailed]);
        assert!(h.store.cart().is_empty());
    }

    #[tokio::test]
    async fn test_update_inventory_failure() {
        let h = harness(&[(5, 3)], Some(r#"[{"id":5,"amount":2}]"#));
        h.inventory.set_offline(true);

        let err = h
            .store
            .update_product_amount(ProductId::new(5), 1)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), CartErrorKind::CollaboratorFailure);
        assert_eq!(h.notifier.take(), vec![CartWarning::UpdateFailed]);
        assert_eq!(h.store.cart().amount_of(ProductId::new(5)), 2);
    }

    #[tokio::test]
    async fn test_subscribers_see_each_commit() {
        let h = harness(&[(5, 3)], None);
        let mut rx = h.store.subscribe();

        h.store.add_product(ProductId::new(5)).await.unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), h.store.cart());

        let _ = h.store.remove_product(ProductId::new(99)).await;
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_adds_respect_stock() {
        let h = harness(&[(5, 1)], None);
        let other = h.store.clone();

        let (first, second) = tokio::join!(
            h.store.add_product(ProductId::new(5)),
            other.add_product(ProductId::new(5)),
        );

        assert_eq!(usize::from(first.is_ok()) + usize::from(second.is_ok()), 1);
        assert_eq!(h.store.cart().amount_of(ProductId::new(5)), 1);
        assert_eq!(h.notifier.take(), vec![CartWarning::StockExceeded]);
    }
}
