//! Reversal of previously applied adjustments.
//!
//! A transaction is reverted by the amount that was actually settled, not by
//! its nominal amount:
//!
//! - paid single payment: the full amount
//! - installment plan: the sum of paid installments
//! - unpaid single payment: nothing
//!
//! Stock is reverted only if it was moved, which is the case for paid
//! single payments and for every installment plan.
//!
//! Reverting never fails on a short balance. A decrease that would go below
//! zero is floored at zero and reported as a [`ClampWarning`]; with the
//! settled-amount rule above this only happens when balances were edited
//! outside the engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{ContactId, Money, ProductId};

use super::adjustment::{AdjustmentPlan, AdjustmentService};
use super::error::PostingError;
use super::installment::{InstallmentService, InstallmentState};
use super::types::{Direction, EquityEffect, MoneySource, PostingEntry};

/// Balance that a clamp occurred on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ClampedBalance {
    /// Bank or cash balance.
    Money(MoneySource),
    /// Product stock.
    Stock(ProductId),
    /// Shareholder equity.
    Equity(ContactId),
}

/// A reversal decrease that was floored at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClampWarning {
    /// Affected balance.
    pub balance: ClampedBalance,
    /// Part of the decrease that could not be applied.
    pub shortfall: Decimal,
}

/// Outcome of a reversal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalReport {
    /// Clamps that occurred, empty on a clean reversal.
    pub clamps: Vec<ClampWarning>,
}

impl ReversalReport {
    /// Returns true if no clamp occurred.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.clamps.is_empty()
    }

    /// Records `reverted`'s shortfall against `balance`, if any.
    pub fn record<T>(&mut self, balance: ClampedBalance, reverted: &Reverted<T>) {
        if reverted.shortfall > Decimal::ZERO {
            self.clamps.push(ClampWarning {
                balance,
                shortfall: reverted.shortfall,
            });
        }
    }

    /// Appends the clamps of another report.
    pub fn merge(&mut self, other: Self) {
        self.clamps.extend(other.clamps);
    }
}

/// A reverted balance together with the shortfall that was floored away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reverted<T> {
    /// New balance.
    pub value: T,
    /// Floored shortfall, zero when the reversal applied in full.
    pub shortfall: Decimal,
}

impl<T> Reverted<T> {
    const fn exact(value: T) -> Self {
        Self {
            value,
            shortfall: Decimal::ZERO,
        }
    }
}

/// Stateless reversal rules.
pub struct ReversalService;

impl ReversalService {
    /// Amount that was actually settled for a stored transaction.
    pub fn settled_amount(
        entry: &PostingEntry,
        is_paid: bool,
        installments: &[InstallmentState],
    ) -> Result<Money, PostingError> {
        if !installments.is_empty() {
            InstallmentService::paid_total(installments)
        } else if is_paid {
            Ok(entry.amount)
        } else {
            Ok(Money::ZERO)
        }
    }

    /// Returns true if posting the transaction moved stock.
    #[must_use]
    pub fn stock_applied(is_paid: bool, installments: &[InstallmentState]) -> bool {
        is_paid || !installments.is_empty()
    }

    /// Plans the movements to undo. Directions are those of the original
    /// posting; the `revert_*` helpers invert them.
    pub fn plan(
        entry: &PostingEntry,
        is_paid: bool,
        installments: &[InstallmentState],
    ) -> Result<AdjustmentPlan, PostingError> {
        let settled = Self::settled_amount(entry, is_paid, installments)?;
        let skip_stock = !Self::stock_applied(is_paid, installments);
        Ok(AdjustmentService::plan(entry, settled, skip_stock))
    }

    /// Undoes a money movement made in `direction`.
    pub fn revert_money(
        balance: Money,
        direction: Direction,
        amount: Money,
    ) -> Result<Reverted<Money>, PostingError> {
        match direction.inverse() {
            Direction::Inflow => balance
                .checked_add(amount)
                .map(Reverted::exact)
                .ok_or_else(|| PostingError::Internal("balance overflowed".to_string())),
            Direction::Outflow => {
                let (value, shortfall) = balance.floor_sub(amount);
                Ok(Reverted { value, shortfall })
            }
        }
    }

    /// Undoes a stock movement made in `direction`.
    pub fn revert_stock(
        stock: i64,
        direction: Direction,
        quantity: u32,
    ) -> Result<Reverted<i64>, PostingError> {
        let units = i64::from(quantity);
        match direction.inverse() {
            Direction::Inflow => stock
                .checked_add(units)
                .map(Reverted::exact)
                .ok_or_else(|| PostingError::Internal("stock overflowed".to_string())),
            Direction::Outflow if stock >= units => Ok(Reverted::exact(stock - units)),
            Direction::Outflow => Ok(Reverted {
                value: 0,
                shortfall: Decimal::from(units - stock.max(0)),
            }),
        }
    }

    /// Undoes an equity movement made under `effect`.
    pub fn revert_equity(
        equity: Money,
        effect: EquityEffect,
        amount: Money,
    ) -> Result<Reverted<Money>, PostingError> {
        match effect.direction() {
            None => Ok(Reverted::exact(equity)),
            Some(direction) => Self::revert_money(equity, direction, amount),
        }
    }
}
