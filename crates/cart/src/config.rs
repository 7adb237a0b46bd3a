//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CART_API_URL` - Base URL of the inventory/product REST API
//!
//! ## Optional
//! - `CART_API_TOKEN` - Bearer token sent with every API request
//! - `CART_STORAGE_DIR` - Directory holding the persisted cart (default: .rocketshoes)
//! - `CART_STORAGE_KEY` - Slot name for the persisted cart (default: @RocketShoes:cart)
//! - `CART_PRODUCT_CACHE_TTL_SECS` - Product details cache TTL (default: 300)
//! - `CART_PRODUCT_CACHE_CAPACITY` - Product details cache size (default: 1000)

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::storage::DEFAULT_STORAGE_KEY;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Inventory API configuration
    pub api: InventoryConfig,
    /// Directory for the persisted cart
    pub storage_dir: PathBuf,
    /// Storage slot name
    pub storage_key: String,
}

/// Inventory API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct InventoryConfig {
    /// Base URL; always ends in `/` so endpoints join under it
    pub base_url: Url,
    /// Optional bearer token
    pub token: Option<SecretString>,
    /// How long product details stay cached
    pub product_cache_ttl: Duration,
    /// Maximum cached products
    pub product_cache_capacity: u64,
}

impl std::fmt::Debug for InventoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("product_cache_ttl", &self.product_cache_ttl)
            .field("product_cache_capacity", &self.product_cache_capacity)
            .finish()
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(&lookup);

        let api = InventoryConfig {
            base_url: normalize_base_url(&vars.required("CART_API_URL")?).map_err(|e| {
                ConfigError::InvalidEnvVar("CART_API_URL".to_string(), e.to_string())
            })?,
            token: vars
                .optional("CART_API_TOKEN")
                .filter(|token| !token.trim().is_empty())
                .map(SecretString::from),
            product_cache_ttl: Duration::from_secs(
                vars.parsed_or("CART_PRODUCT_CACHE_TTL_SECS", 300)?,
            ),
            product_cache_capacity: vars.parsed_or("CART_PRODUCT_CACHE_CAPACITY", 1000)?,
        };

        Ok(Self {
            api,
            storage_dir: PathBuf::from(vars.or_default("CART_STORAGE_DIR", ".rocketshoes")),
            storage_key: vars.or_default("CART_STORAGE_KEY", DEFAULT_STORAGE_KEY),
        })
    }
}

/// Parse a base URL and make sure it ends with `/`.
///
/// `Url::join` replaces the last path segment unless the base ends with a
/// slash, so `http://host/api` would otherwise resolve `stock/1` to
/// `http://host/stock/1`.
///
/// # Errors
///
/// Returns `url::ParseError` if the value is not an absolute URL.
pub fn normalize_base_url(raw: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(raw.trim())?;
    // "localhost:3333" parses as scheme "localhost" with an opaque path
    if url.cannot_be_a_base() {
        return Err(url::ParseError::RelativeUrlWithoutBase);
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Vars<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }
}
