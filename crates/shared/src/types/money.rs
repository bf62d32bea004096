//! Non-negative monetary amounts with decimal precision.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! This type wraps `rust_decimal::Decimal` and can never hold a negative value,
//! which is the invariant every bank, cash and equity balance must keep.
//! Amounts carry at most [`Money::SCALE`] decimal places, the precision of
//! every money column.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when constructing a [`Money`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// The amount was below zero.
    #[error("Money amount cannot be negative: {0}")]
    Negative(Decimal),

    /// The amount had more decimal places than a money column stores.
    #[error("Money amount has more than {scale} decimal places: {0}", scale = Money::SCALE)]
    TooPrecise(Decimal),
}

/// A monetary amount that is always `>= 0`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Maximum number of decimal places.
    pub const SCALE: u32 = 4;

    /// Creates a new amount, rejecting negative values and values that
    /// cannot be stored exactly.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative(amount));
        }
        if amount.round_dp(Self::SCALE) != amount {
            return Err(MoneyError::TooPrecise(amount));
        }
        Ok(Self(amount))
    }

    /// Returns the inner decimal amount.
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the amount is strictly greater than zero.
    #[must_use]
    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Adds two amounts, returning `None` on decimal overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Subtracts `other`, returning `None` if the result would be negative.
    #[must_use]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        if other.0 > self.0 {
            None
        } else {
            Some(Self(self.0 - other.0))
        }
    }

    /// Subtracts `other`, flooring the result at zero.
    ///
    /// Returns the floored amount together with the shortfall that was cut off
    /// (zero when no flooring happened).
    #[must_use]
    pub fn floor_sub(self, other: Self) -> (Self, Decimal) {
        match self.checked_sub(other) {
            Some(rest) => (rest, Decimal::ZERO),
            None => (Self::ZERO, other.0 - self.0),
        }
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
