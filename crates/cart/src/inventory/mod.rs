//! Stock and product lookups.
//!
//! # Architecture
//!
//! - [`Inventory`] is the port the cart store depends on
//! - [`HttpInventory`] talks to the storefront REST API with `reqwest`
//!   and caches product details (never stock) with `moka`
//! - [`InMemoryInventory`] is a fixture backend for tests and demos
//!
//! Stock must be read fresh on every mutation: the cart's quantity ceiling
//! is whatever the inventory service reported most recently.

mod http;
mod memory;

pub use http::HttpInventory;
pub use memory::InMemoryInventory;

use async_trait::async_trait;
use rocketshoes_core::ProductId;
use thiserror::Error;

use crate::model::{Product, Stock};

/// Errors that can occur when looking up stock or product details.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API answered with a non-success status.
    #[error("Inventory API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The API answered for a different product than the one requested.
    #[error("Lookup for product {requested} returned product {returned}")]
    UnexpectedProduct {
        requested: ProductId,
        returned: ProductId,
    },

    /// Backend is not reachable.
    #[error("Inventory unavailable: {0}")]
    Unavailable(String),
}

/// Source of stock levels and product details.
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Current stock for `product_id`.
    async fn stock(&self, product_id: ProductId) -> Result<Stock, InventoryError>;

    /// Full display attributes for `product_id`.
    async fn product(&self, product_id: ProductId) -> Result<Product, InventoryError>;
}
