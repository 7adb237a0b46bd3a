//! Persistent key-value storage for the serialized cart.
//!
//! The cart lives in a single string-keyed slot that is read once when the
//! store starts and overwritten wholesale on every successful mutation.
//! Storage is synchronous: implementations are expected to be local and fast
//! (a file, browser local storage, an in-process map).

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use std::path::PathBuf;

use thiserror::Error;

/// Slot name the cart is persisted under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "@RocketShoes:cart";

/// Errors that can occur when reading or writing a storage slot.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cart could not be encoded for persistence.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Backend refused the operation.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// A string-keyed storage slot provider.
pub trait CartStorage: Send + Sync {
    /// Read the value stored under `key`, or `None` if nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written. On error the
    /// previous value must still be readable.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
}
