//! Cart data model.
//!
//! A cart is an ordered list of [`LineItem`]s, unique by product id. Product
//! display fields (name, price, image, ...) are carried verbatim in
//! `details` so whatever the product lookup returns is what gets persisted
//! and rendered.
//!
//! All transitions on [`CartState`] are pure: they return a new state and
//! leave the receiver untouched, so the store can persist the next state
//! before anything observable changes.

use rocketshoes_core::{CurrencyCode, Price, ProductId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One product currently in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product identifier.
    pub id: ProductId,
    /// Requested quantity, always at least 1.
    pub amount: u32,
    /// Opaque product fields copied from the product lookup.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl LineItem {
    /// Build a line for `product` with the given quantity.
    ///
    /// Any `amount` the product payload carries is discarded; the line's own
    /// quantity wins.
    #[must_use]
    pub fn from_product(product: Product, amount: u32) -> Self {
        let Product { id, mut details } = product;
        details.shift_remove("amount");
        Self {
            id,
            amount,
            details,
        }
    }

    /// Product title, if the lookup provided one.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.details.get("title").and_then(Value::as_str)
    }

    /// Product image URL, if the lookup provided one.
    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.details.get("image").and_then(Value::as_str)
    }

    /// Unit price, if the lookup provided a numeric one.
    #[must_use]
    pub fn price(&self, currency: CurrencyCode) -> Option<Price> {
        self.details
            .get("price")
            .and_then(|value| Price::from_json(value, currency).ok())
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self, currency: CurrencyCode) -> Option<Price> {
        self.price(currency).map(|price| price.times(self.amount))
    }
}

/// Product details returned by the product lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Stock level returned by the inventory lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    pub id: ProductId,
    /// Units currently available. Kept signed so a negative reading from
    /// the API still parses and is refused by the stock check.
    pub amount: i64,
}

/// The full ordered set of line items for one shopper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartState(Vec<LineItem>);

impl CartState {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Restore a cart from its persisted JSON form.
    ///
    /// Entries with a zero amount and repeated ids (after the first) are
    /// dropped so a hand-edited or stale slot cannot break uniqueness.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if the slot is not a list of line items.
    pub fn from_persisted(raw: &str) -> Result<Self, serde_json::Error> {
        let items: Vec<LineItem> = serde_json::from_str(raw)?;
        let mut cart = Vec::with_capacity(items.len());

        for item in items {
            if item.amount == 0 {
                tracing::warn!(product_id = %item.id, "Dropping persisted line with zero amount");
                continue;
            }
            if cart.iter().any(|existing: &LineItem| existing.id == item.id) {
                tracing::warn!(product_id = %item.id, "Dropping duplicate persisted line");
                continue;
            }
            cart.push(item);
        }

        Ok(Self(cart))
    }

    /// Serialize to the persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if a pass-through field cannot be encoded.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.0
    }

    /// Iterate over line items in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, LineItem> {
        self.0.iter()
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The line for `id`, if present.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&LineItem> {
        self.0.iter().find(|item| item.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.get(id).is_some()
    }

    /// Quantity currently requested for `id` (0 when absent).
    #[must_use]
    pub fn amount_of(&self, id: ProductId) -> u32 {
        self.get(id).map_or(0, |item| item.amount)
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.0.iter().map(|item| u64::from(item.amount)).sum()
    }

    /// Sum of `price * amount` over lines with a readable price.
    #[must_use]
    pub fn subtotal(&self, currency: CurrencyCode) -> Price {
        self.0
            .iter()
            .filter_map(|item| item.line_total(currency))
            .fold(Price::zero(currency), |acc, total| acc + total)
    }

    /// A cart with `item` in place of any existing line for the same id, or
    /// appended when the product is new.
    #[must_use]
    pub fn with_line(&self, item: LineItem) -> Self {
        let mut items = self.0.clone();
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
        Self(items)
    }

    /// A cart with the line for `id` set to `amount`, or `None` if the
    /// product is not in the cart.
    #[must_use]
    pub fn with_amount(&self, id: ProductId, amount: u32) -> Option<Self> {
        let mut items = self.0.clone();
        let item = items.iter_mut().find(|item| item.id == id)?;
        item.amount = amount;
        Some(Self(items))
    }

    /// A cart without the line for `id`, or `None` if the product is not in
    /// the cart.
    #[must_use]
    pub fn without(&self, id: ProductId) -> Option<Self> {
        if !self.contains(id) {
            return None;
        }
        Some(Self(
            self.0.iter().filter(|item| item.id != id).cloned().collect(),
        ))
    }
}

impl<'a> IntoIterator for &'a CartState {
    type Item = &'a LineItem;
    type IntoIter = std::slice::Iter<'a, LineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
