//! Cart operation errors.
//!
//! Every store operation returns `Result<(), CartError>` and, on failure,
//! also sends the matching [`CartWarning`] to the notifier. Nothing here is
//! fatal: retrying the user action is always allowed.

use rocketshoes_core::ProductId;
use thiserror::Error;

use crate::inventory::InventoryError;
use crate::notify::CartWarning;
use crate::storage::StorageError;

/// Error returned by a cart operation.
#[derive(Debug, Error)]
pub enum CartError {
    /// Requested quantity is above what the inventory reports.
    #[error("Requested {requested} of product {product_id}, only {available} in stock")]
    StockExceeded {
        product_id: ProductId,
        requested: u64,
        available: i64,
    },

    /// Operation targets a product that is not in the cart.
    #[error("Product {0} is not in the cart")]
    ProductNotFound(ProductId),

    /// Stock or product lookup failed.
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Reading or writing the persisted cart failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Coarse classification of a [`CartError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CartErrorKind {
    StockExceeded,
    ProductNotFound,
    CollaboratorFailure,
}

/// The store operation an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CartOperation {
    Add,
    Remove,
    Update,
}

impl std::fmt::Display for CartOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Update => "update",
        })
    }
}

impl CartError {
    #[must_use]
    pub const fn kind(&self) -> CartErrorKind {
        match self {
            Self::StockExceeded { .. } => CartErrorKind::StockExceeded,
            Self::ProductNotFound(_) => CartErrorKind::ProductNotFound,
            Self::Inventory(_) | Self::Storage(_) => CartErrorKind::CollaboratorFailure,
        }
    }

    /// Warning to show the shopper when `operation` fails with this error.
    #[must_use]
    pub const fn warning(&self, operation: CartOperation) -> CartWarning {
        match (self.kind(), operation) {
            (CartErrorKind::StockExceeded, _) => CartWarning::StockExceeded,
            (_, CartOperation::Add) => CartWarning::AddFailed,
            (_, CartOperation::Remove) => CartWarning::RemoveFailed,
            (_, CartOperation::Update) => CartWarning::UpdateFailed,
        }
    }
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;
