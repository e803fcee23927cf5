//! Monetary values in integer minor units with precise decimal arithmetic
//!
//! Amounts are stored as minor units (cents) of an explicit currency and
//! never pass through `f64`. Percentage calculations go through `Decimal`
//! and round half-up at minor-unit precision, once, at the final step.

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Money arithmetic errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: Currency, right: Currency },

    #[error("amount overflow")]
    AmountOverflow,
}

/// Supported currencies (minor unit is 1/100 for all of them)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Currency {
    #[default]
    Eur,
    Usd,
    Gbp,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
            Currency::Gbp => "GBP",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Eur => "€",
            Currency::Usd => "$",
            Currency::Gbp => "£",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A monetary amount in minor units of a currency
///
/// Arithmetic across currencies fails with `CurrencyMismatch`; additions
/// and multiplications are checked and fail with `AmountOverflow` instead
/// of wrapping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Money {
    minor: i64,
    currency: Currency,
}

impl Money {
    /// Create from minor units (cents)
    pub const fn new(minor: i64, currency: Currency) -> Self {
        Self { minor, currency }
    }

    /// Zero in the given currency
    pub const fn zero(currency: Currency) -> Self {
        Self { minor: 0, currency }
    }

    /// Create from major units (e.g. whole euros)
    pub const fn from_major(major: i64, currency: Currency) -> Self {
        Self {
            minor: major * 100,
            currency,
        }
    }

    pub const fn minor_units(&self) -> i64 {
        self.minor
    }

    pub const fn currency(&self) -> Currency {
        self.currency
    }

    pub const fn is_zero(&self) -> bool {
        self.minor == 0
    }

    pub const fn is_non_negative(&self) -> bool {
        self.minor >= 0
    }

    fn require_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency,
                right: other.currency,
            });
        }
        Ok(())
    }

    /// Checked addition, failing on currency mismatch or overflow
    pub fn add(&self, other: Money) -> Result<Money, MoneyError> {
        self.require_same_currency(&other)?;
        let minor = self
            .minor
            .checked_add(other.minor)
            .ok_or(MoneyError::AmountOverflow)?;
        Ok(Money::new(minor, self.currency))
    }

    /// Checked subtraction, failing on currency mismatch or overflow
    pub fn sub(&self, other: Money) -> Result<Money, MoneyError> {
        self.require_same_currency(&other)?;
        let minor = self
            .minor
            .checked_sub(other.minor)
            .ok_or(MoneyError::AmountOverflow)?;
        Ok(Money::new(minor, self.currency))
    }

    /// Multiply by a quantity
    pub fn times(&self, quantity: i64) -> Result<Money, MoneyError> {
        let minor = self
            .minor
            .checked_mul(quantity)
            .ok_or(MoneyError::AmountOverflow)?;
        Ok(Money::new(minor, self.currency))
    }

    /// Apply a fractional rate (e.g. 0.08 for 8%), rounding half-up to
    /// minor units at the final step only
    ///
    /// Non-finite rates behave like zero, matching the decimal conversion
    /// rules used throughout the engine.
    pub fn percentage(&self, rate: f64) -> Money {
        let amount = Decimal::from(self.minor);
        let rate = Decimal::from_f64(rate).unwrap_or_default();
        let minor = (amount * rate)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .unwrap_or_default();
        Money::new(minor, self.currency)
    }

    /// Ceiling division for per-head amounts
    ///
    /// Guarantees `result × parts ≥ self` for non-negative amounts, so a
    /// split bill never under-collects.
    pub fn split_ceil(&self, parts: u32) -> Money {
        let parts = i64::from(parts.max(1));
        let minor = if self.minor >= 0 {
            (self.minor + parts - 1) / parts
        } else {
            self.minor / parts
        };
        Money::new(minor, self.currency)
    }

    /// Clamp negative amounts to zero
    pub fn max_zero(&self) -> Money {
        Money::new(self.minor.max(0), self.currency)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.minor < 0 { "-" } else { "" };
        let abs = self.minor.unsigned_abs();
        write!(
            f,
            "{}{}{}.{:02}",
            sign,
            self.currency.symbol(),
            abs / 100,
            abs % 100
        )
    }
}
