//! Command implementations.

pub mod cart;

use std::sync::Arc;

use rocketshoes_cart::{
    CartConfig, CartError, CartStore, Collaborators, ConfigError, FileStorage, HttpInventory,
    InventoryError, LogNotifier, StorageError,
};
use thiserror::Error;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Cart(#[from] CartError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),
}

/// Everything a command needs, wired from the environment.
pub struct Session {
    pub store: CartStore,
    pub inventory: HttpInventory,
}

impl Session {
    /// Load configuration and open the persisted cart.
    ///
    /// # Errors
    ///
    /// Returns `CommandError` if configuration is invalid or the storage
    /// directory cannot be opened or read.
    pub fn open() -> Result<Self, CommandError> {
        let config = CartConfig::from_env()?;
        tracing::debug!(?config, "Loaded configuration");

        let inventory = HttpInventory::new(&config.api);
        let storage = FileStorage::open(&config.storage_dir)?;

        let store = CartStore::load(
            Collaborators {
                inventory: Arc::new(inventory.clone()),
                storage: Arc::new(storage),
                notifier: Arc::new(LogNotifier),
            },
            config.storage_key,
        )?;

        Ok(Self { store, inventory })
    }
}
