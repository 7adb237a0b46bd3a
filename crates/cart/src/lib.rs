//! RocketShoes cart library.
//!
//! Tracks which products a shopper has selected and in what quantity,
//! checks every quantity against a remote inventory service, and mirrors
//! each successful change to durable key-value storage.
//!
//! # Architecture
//!
//! - [`store::CartStore`] owns the cart and is passed explicitly to whatever
//!   needs it; observers subscribe to a `tokio::sync::watch` channel
//! - [`inventory::Inventory`] is the stock and product lookup port
//!   ([`inventory::HttpInventory`] for the REST API)
//! - [`storage::CartStorage`] is the persisted slot
//!   ([`storage::FileStorage`], [`storage::MemoryStorage`])
//! - [`notify::Notifier`] receives the user-facing warning when an operation
//!   aborts
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rocketshoes_cart::{
//!     CartConfig, CartStore, Collaborators, FileStorage, HttpInventory, LogNotifier, ProductId,
//! };
//!
//! let config = CartConfig::from_env()?;
//! let store = CartStore::load(
//!     Collaborators {
//!         inventory: Arc::new(HttpInventory::new(&config.api)),
//!         storage: Arc::new(FileStorage::open(&config.storage_dir)?),
//!         notifier: Arc::new(LogNotifier),
//!     },
//!     &config.storage_key,
//! )?;
//!
//! store.add_product(ProductId::new(5)).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod inventory;
pub mod model;
pub mod notify;
pub mod storage;
pub mod store;

pub use config::{CartConfig, ConfigError, InventoryConfig};
pub use error::{CartError, CartErrorKind, CartOperation};
pub use inventory::{HttpInventory, InMemoryInventory, Inventory, InventoryError};
pub use model::{CartState, LineItem, Product, Stock};
pub use notify::{CartWarning, LogNotifier, Notifier, RecordingNotifier};
pub use rocketshoes_core::ProductId;
pub use storage::{CartStorage, DEFAULT_STORAGE_KEY, FileStorage, MemoryStorage, StorageError};
pub use store::{CartStore, Collaborators};
