//! User-facing warnings.
//!
//! When a cart operation aborts, exactly one [`CartWarning`] is sent to the
//! configured [`Notifier`]. The warning carries display text only; callers
//! that need structure inspect the `CartError` returned by the operation.

use std::sync::{Mutex, PoisonError};

/// Warning shown to the shopper when a cart operation is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CartWarning {
    StockExceeded,
    AddFailed,
    RemoveFailed,
    UpdateFailed,
}

impl CartWarning {
    /// Display text for the warning.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::StockExceeded => "Requested quantity exceeds stock",
            Self::AddFailed => "Failed to add product",
            Self::RemoveFailed => "Failed to remove product",
            Self::UpdateFailed => "Failed to update product quantity",
        }
    }
}

impl std::fmt::Display for CartWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Sink for user-facing warnings (toast, status bar, log line...).
pub trait Notifier: Send + Sync {
    fn notify(&self, warning: CartWarning);
}

/// Notifier that writes warnings to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, warning: CartWarning) {
        tracing::warn!(warning = ?warning, "{warning}");
    }
}

/// Notifier that keeps every warning until drained.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    warnings: Mutex<Vec<CartWarning>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the warnings received so far.
    pub fn take(&self) -> Vec<CartWarning> {
        std::mem::take(
            &mut *self
                .warnings
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, warning: CartWarning) {
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(warning);
    }
}
