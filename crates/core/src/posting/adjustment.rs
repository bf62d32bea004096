//! Forward balance adjustments.
//!
//! A posting is first turned into an [`AdjustmentPlan`] describing which
//! balances move, in which direction and by how much. The persistence layer
//! then loads each affected record and applies the movement with the
//! arithmetic helpers on [`AdjustmentService`], which refuse to let any
//! balance go negative.

use serde::{Deserialize, Serialize};
use tally_shared::types::{CategoryId, ContactId, Money, ProductId};

use super::error::PostingError;
use super::types::{Direction, EquityEffect, MoneySource, PostingEntry, ValidatedTransaction};

/// Movement of a bank or cash balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyMovement {
    /// Source whose balance moves.
    pub source: MoneySource,
    /// Direction.
    pub direction: Direction,
    /// Amount, strictly positive.
    pub amount: Money,
}

/// Movement of a product's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    /// Product whose stock moves.
    pub product_id: ProductId,
    /// Direction.
    pub direction: Direction,
    /// Units, strictly positive.
    pub quantity: u32,
}

/// Candidate equity movement.
///
/// Whether and how equity moves depends on the category's
/// [`EquityEffect`], which the persistence layer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityMovement {
    /// Shareholder.
    pub contact_id: ContactId,
    /// Category deciding the effect.
    pub category_id: CategoryId,
    /// Amount, strictly positive.
    pub amount: Money,
}

/// Every balance movement caused by settling (part of) a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentPlan {
    /// Money movement, absent for a zero settlement.
    pub money: Option<MoneyMovement>,
    /// Stock movement, absent when stock is skipped or not applicable.
    pub stock: Option<StockMovement>,
    /// Equity movement, absent for a zero settlement or without contact and category.
    pub equity: Option<EquityMovement>,
}

impl AdjustmentPlan {
    /// Returns true if nothing moves.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.money.is_none() && self.stock.is_none() && self.equity.is_none()
    }
}

/// Stateless planner and arithmetic for forward adjustments.
pub struct AdjustmentService;

impl AdjustmentService {
    /// Settlement applied when a transaction is first posted.
    ///
    /// A paid single-payment transaction settles its full amount. An
    /// installment plan settles nothing yet but still moves stock. An unpaid
    /// single-payment transaction has no effect at all.
    #[must_use]
    pub fn initial_settlement(validated: &ValidatedTransaction) -> Option<Money> {
        if !validated.installments.is_empty() {
            Some(Money::ZERO)
        } else if validated.is_paid {
            Some(validated.entry.amount)
        } else {
            None
        }
    }

    /// Plans the movements for settling `settlement` of `entry`.
    ///
    /// Stock moves by the full quantity regardless of `settlement` unless
    /// `skip_stock` is set; installment payments skip it because the plan
    /// already moved stock at creation.
    #[must_use]
    pub fn plan(entry: &PostingEntry, settlement: Money, skip_stock: bool) -> AdjustmentPlan {
        let money = settlement.is_positive().then_some(MoneyMovement {
            source: entry.money_source,
            direction: entry.transaction_type.money_direction(),
            amount: settlement,
        });

        let stock = if skip_stock {
            None
        } else {
            entry
                .product
                .filter(|line| line.quantity > 0)
                .zip(entry.transaction_type.stock_direction())
                .map(|(line, direction)| StockMovement {
                    product_id: line.product_id,
                    direction,
                    quantity: line.quantity,
                })
        };

        let equity = entry
            .equity_target()
            .filter(|_| settlement.is_positive())
            .map(|(contact_id, category_id)| EquityMovement {
                contact_id,
                category_id,
                amount: settlement,
            });

        AdjustmentPlan {
            money,
            stock,
            equity,
        }
    }

    /// Moves a money balance, refusing to go below zero.
    pub fn apply_money(
        source: MoneySource,
        balance: Money,
        direction: Direction,
        amount: Money,
    ) -> Result<Money, PostingError> {
        match direction {
            Direction::Inflow => balance
                .checked_add(amount)
                .ok_or_else(|| PostingError::Internal(format!("balance of {source} overflowed"))),
            Direction::Outflow => {
                balance
                    .checked_sub(amount)
                    .ok_or(PostingError::InsufficientFunds {
                        money_source: source,
                        available: balance.amount(),
                        requested: amount.amount(),
                    })
            }
        }
    }

    /// Moves a product's stock, refusing to go below zero.
    pub fn apply_stock(
        product_id: ProductId,
        stock: i64,
        direction: Direction,
        quantity: u32,
    ) -> Result<i64, PostingError> {
        let units = i64::from(quantity);
        match direction {
            Direction::Inflow => stock.checked_add(units).ok_or_else(|| {
                PostingError::Internal(format!("stock of product {product_id} overflowed"))
            }),
            Direction::Outflow if stock >= units => Ok(stock - units),
            Direction::Outflow => Err(PostingError::InsufficientStock {
                product_id,
                available: stock,
                requested: quantity,
            }),
        }
    }

    /// Moves a shareholder's equity according to the category effect.
    ///
    /// [`EquityEffect::None`] leaves the equity unchanged.
    pub fn apply_equity(
        contact_id: ContactId,
        equity: Money,
        effect: EquityEffect,
        amount: Money,
    ) -> Result<Money, PostingError> {
        match effect.direction() {
            None => Ok(equity),
            Some(Direction::Inflow) => equity.checked_add(amount).ok_or_else(|| {
                PostingError::Internal(format!("equity of contact {contact_id} overflowed"))
            }),
            Some(Direction::Outflow) => {
                equity
                    .checked_sub(amount)
                    .ok_or(PostingError::InsufficientEquity {
                        contact_id,
                        available: equity.amount(),
                        requested: amount.amount(),
                    })
            }
        }
    }
}
