//! REST client for the storefront inventory API.
//!
//! Endpoints, relative to the configured base URL:
//!
//! - `GET stock/{id}` - `{ "id": 5, "amount": 3 }`
//! - `GET products/{id}` - product JSON (`id`, `title`, `price`, `image`, ...)

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use rocketshoes_core::ProductId;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::{Inventory, InventoryError};
use crate::config::InventoryConfig;
use crate::model::{Product, Stock};

/// Longest response body excerpt carried into errors and logs.
const BODY_EXCERPT_CHARS: usize = 200;

/// Client for the inventory REST API.
///
/// Cheap to clone; clones share the connection pool and product cache.
#[derive(Clone)]
pub struct HttpInventory {
    inner: Arc<HttpInventoryInner>,
}

struct HttpInventoryInner {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
    products: Cache<ProductId, Product>,
}

impl std::fmt::Debug for HttpInventory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpInventory")
            .field("base_url", &self.inner.base_url.as_str())
            .field("token", &self.inner.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpInventory {
    /// Create a new inventory client.
    #[must_use]
    pub fn new(config: &InventoryConfig) -> Self {
        let products = Cache::builder()
            .max_capacity(config.product_cache_capacity)
            .time_to_live(config.product_cache_ttl)
            .build();

        Self {
            inner: Arc::new(HttpInventoryInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.clone(),
                token: config.token.clone(),
                products,
            }),
        }
    }

    /// Build the URL for `{resource}/{id}`.
    fn endpoint(&self, resource: &str, id: ProductId) -> Result<Url, InventoryError> {
        Ok(self.inner.base_url.join(&format!("{resource}/{id}"))?)
    }

    /// GET a JSON resource.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, InventoryError> {
        let mut request = self.inner.client.get(url.clone());
        if let Some(token) = &self.inner.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(InventoryError::NotFound(url.path().to_string()));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(InventoryError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            let excerpt = body.chars().take(BODY_EXCERPT_CHARS).collect::<String>();
            tracing::error!(
                status = %status,
                url = %url,
                body = %excerpt,
                "Inventory API returned non-success status"
            );
            return Err(InventoryError::Status {
                status: status.as_u16(),
                body: excerpt,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                url = %url,
                body = %body.chars().take(BODY_EXCERPT_CHARS).collect::<String>(),
                "Failed to parse inventory response"
            );
            InventoryError::Parse(e)
        })
    }
}

#[async_trait]
impl Inventory for HttpInventory {
    #[instrument(skip(self))]
    async fn stock(&self, product_id: ProductId) -> Result<Stock, InventoryError> {
        let stock: Stock = self.get_json(self.endpoint("stock", product_id)?).await?;
        if stock.id != product_id {
            return Err(InventoryError::UnexpectedProduct {
                requested: product_id,
                returned: stock.id,
            });
        }
        debug!(available = stock.amount, "Fetched stock");
        Ok(stock)
    }

    #[instrument(skip(self))]
    async fn product(&self, product_id: ProductId) -> Result<Product, InventoryError> {
        if let Some(product) = self.inner.products.get(&product_id).await {
            debug!("Product cache hit");
            return Ok(product);
        }

        let product: Product = self.get_json(self.endpoint("products", product_id)?).await?;
        if product.id != product_id {
            return Err(InventoryError::UnexpectedProduct {
                requested: product_id,
                returned: product.id,
            });
        }

        self.inner.products.insert(product_id, product.clone()).await;
        Ok(product)
    }
}
