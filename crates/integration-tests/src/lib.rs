//! Integration test fixtures for the RocketShoes cart.
//!
//! # Test Categories
//!
//! - `cart_scenarios` - store behaviour over in-memory collaborators
//! - `http_inventory` - REST adapter and file storage against a local
//!   `axum` server standing in for the inventory API

#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rocketshoes_cart::Product;
use serde_json::json;

/// Product ID the fake API always answers with HTTP 500.
pub const BROKEN_PRODUCT_ID: i32 = 500;

/// Build a product payload the way the storefront API returns it.
pub fn product(id: i32, title: &str, price: f64) -> Product {
    serde_json::from_value(json!({
        "id": id,
        "title": title,
        "price": price,
        "image": format!("https://rocketseat-cdn.s3-sa-east-1.amazonaws.com/modulo-redux/tenis{id}.jpg"),
    }))
    .unwrap()
}

/// A local stand-in for the inventory REST API.
#[derive(Clone, Default)]
pub struct FakeApi {
    inner: Arc<FakeApiInner>,
}

#[derive(Default)]
struct FakeApiInner {
    stock: Mutex<HashMap<i32, i64>>,
    products: Mutex<HashMap<i32, Product>>,
    stock_hits: AtomicUsize,
    product_hits: AtomicUsize,
    last_authorization: Mutex<Option<String>>,
}

impl FakeApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a product with its stock.
    #[must_use]
    pub fn with_product(self, product: Product, stock: i64) -> Self {
        let id = product.id.as_i32();
        self.inner.stock.lock().unwrap().insert(id, stock);
        self.inner.products.lock().unwrap().insert(id, product);
        self
    }

    pub fn set_stock(&self, id: i32, amount: i64) {
        self.inner.stock.lock().unwrap().insert(id, amount);
    }

    #[must_use]
    pub fn stock_hits(&self) -> usize {
        self.inner.stock_hits.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn product_hits(&self) -> usize {
        self.inner.product_hits.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn last_authorization(&self) -> Option<String> {
        self.inner.last_authorization.lock().unwrap().clone()
    }

    /// Serve the API on an ephemeral local port and return its base URL.
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/api/stock/{id}", get(stock))
            .route("/api/products/{id}", get(product_details))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}/api")
    }

    fn record_authorization(&self, headers: &HeaderMap) {
        let value = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        *self.inner.last_authorization.lock().unwrap() = value;
    }
}

async fn stock(State(api): State<FakeApi>, Path(id): Path<i32>, headers: HeaderMap) -> Response {
    api.inner.stock_hits.fetch_add(1, Ordering::SeqCst);
    api.record_authorization(&headers);

    if id == BROKEN_PRODUCT_ID {
        return (StatusCode::INTERNAL_SERVER_ERROR, "inventory database offline").into_response();
    }

    let amount = api.inner.stock.lock().unwrap().get(&id).copied();
    match amount {
        Some(amount) => Json(json!({ "id": id, "amount": amount })).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn product_details(
    State(api): State<FakeApi>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> Response {
    api.inner.product_hits.fetch_add(1, Ordering::SeqCst);
    api.record_authorization(&headers);

    let product = api.inner.products.lock().unwrap().get(&id).cloned();
    match product {
        Some(product) => Json(product).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
