//! Type-safe price representation using decimal arithmetic.
//!
//! Product lookups return prices as loose JSON (a number such as `139.9`, or
//! occasionally a numeric string). [`Price::from_json`] normalizes both into a
//! [`Decimal`] so cart totals never go through floating point.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when reading a price out of product data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PriceError {
    #[error("price is not a number: {0}")]
    NotNumeric(String),
    #[error("price must not be negative: {0}")]
    Negative(Decimal),
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A zero price in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Parse a price from a JSON number or numeric string.
    ///
    /// # Errors
    ///
    /// Returns `PriceError` if the value is not numeric or is negative.
    pub fn from_json(
        value: &serde_json::Value,
        currency_code: CurrencyCode,
    ) -> Result<Self, PriceError> {
        let raw = match value {
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => s.trim().to_string(),
            other => return Err(PriceError::NotNumeric(other.to_string())),
        };

        let amount = Decimal::from_str(&raw)
            .or_else(|_| Decimal::from_scientific(&raw))
            .map_err(|_| PriceError::NotNumeric(raw.clone()))?;

        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }

        Ok(Self::new(amount, currency_code))
    }

    /// The price of `quantity` units.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency_code)
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency_code.symbol(), self.amount)
    }
}

impl std::ops::Add for Price {
    type Output = Self;

    /// Adds amounts; the left-hand currency is kept.
    fn add(self, rhs: Self) -> Self {
        Self::new(self.amount + rhs.amount, self.currency_code)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    BRL,
    EUR,
    GBP,
    CAD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD => "$",
            Self::BRL => "R$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }
}
