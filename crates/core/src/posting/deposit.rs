//! Deposit lifecycle.
//!
//! ```text
//! Pending ──pay──► Completed
//! ```
//!
//! Creating a deposit applies the inverse of its settlement effect: a
//! received deposit is set aside (the source shrinks), a paid deposit is
//! credited back (the source grows). Paying applies the forward effect and
//! completes the deposit. Reverting a pending deposit undoes the creation
//! effect; reverting a completed deposit does nothing.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{ContactId, DepositId, Money};

use super::adjustment::MoneyMovement;
use super::error::PostingError;
use super::types::{Direction, MoneySource, MoneySourceInput};
use super::validation::EntryValidator;

/// Deposit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositType {
    /// Held funds received from a contact.
    Received,
    /// Held funds paid to a contact.
    Paid,
}

impl DepositType {
    /// Returns the canonical string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Paid => "paid",
        }
    }

    /// Direction applied to the money source at creation.
    #[must_use]
    pub const fn creation_direction(self) -> Direction {
        self.settlement_direction().inverse()
    }

    /// Direction applied to the money source when the deposit is paid.
    #[must_use]
    pub const fn settlement_direction(self) -> Direction {
        match self {
            Self::Received => Direction::Inflow,
            Self::Paid => Direction::Outflow,
        }
    }
}

impl FromStr for DepositType {
    type Err = PostingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "received" => Ok(Self::Received),
            "paid" => Ok(Self::Paid),
            other => Err(PostingError::InvalidDepositType(other.to_string())),
        }
    }
}

impl fmt::Display for DepositType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deposit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    /// Awaiting settlement.
    Pending,
    /// Settled. Terminal.
    Completed,
}

impl DepositStatus {
    /// Returns the canonical string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }
}

/// Unvalidated deposit payload used for both create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositInput {
    /// `"received"` or `"paid"`.
    pub deposit_type: String,
    /// Amount.
    pub amount: Decimal,
    /// Money source selector and references.
    pub money_source: MoneySourceInput,
    /// Counterparty.
    pub contact_id: Option<ContactId>,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// A deposit payload that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedDeposit {
    /// Type.
    pub deposit_type: DepositType,
    /// Amount, strictly positive.
    pub amount: Money,
    /// Money source.
    pub money_source: MoneySource,
    /// Counterparty.
    pub contact_id: Option<ContactId>,
    /// Notes.
    pub notes: Option<String>,
}

/// The balance-relevant state of a stored deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositState {
    /// Deposit.
    pub id: DepositId,
    /// Type.
    pub deposit_type: DepositType,
    /// Amount.
    pub amount: Money,
    /// Money source.
    pub money_source: MoneySource,
    /// Status.
    pub status: DepositStatus,
}

/// How an update of a stored deposit is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositUpdate {
    /// Undo the old creation effect, then apply the new one.
    Repost,
    /// Only descriptive fields change; balances are untouched.
    DetailsOnly,
}

/// Stateless deposit rules.
pub struct DepositService;

impl DepositService {
    /// Validates a deposit payload: money source, then type, then amount.
    pub fn validate(input: &DepositInput) -> Result<ValidatedDeposit, PostingError> {
        let money_source = EntryValidator::validate_money_source(&input.money_source)?;
        let deposit_type: DepositType = input.deposit_type.parse()?;
        let amount = EntryValidator::validate_amount(input.amount)?;
        Ok(ValidatedDeposit {
            deposit_type,
            amount,
            money_source,
            contact_id: input.contact_id,
            notes: input.notes.clone(),
        })
    }

    /// Transition for paying a deposit.
    pub fn pay(deposit: &DepositState) -> Result<DepositStatus, PostingError> {
        match deposit.status {
            DepositStatus::Pending => Ok(DepositStatus::Completed),
            DepositStatus::Completed => Err(PostingError::DepositAlreadyCompleted(deposit.id)),
        }
    }

    /// Money movement the deposit still holds on its source.
    ///
    /// A pending deposit holds its creation effect. A completed deposit holds
    /// nothing, since settlement cancelled the creation effect.
    #[must_use]
    pub const fn outstanding_movement(deposit: &DepositState) -> Option<MoneyMovement> {
        match deposit.status {
            DepositStatus::Pending => Some(MoneyMovement {
                source: deposit.money_source,
                direction: deposit.deposit_type.creation_direction(),
                amount: deposit.amount,
            }),
            DepositStatus::Completed => None,
        }
    }

    /// Decides how `update` applies to `current`.
    ///
    /// A completed deposit only accepts changes to its contact and notes.
    pub fn plan_update(
        current: &DepositState,
        update: &ValidatedDeposit,
    ) -> Result<DepositUpdate, PostingError> {
        match current.status {
            DepositStatus::Pending => Ok(DepositUpdate::Repost),
            DepositStatus::Completed
                if current.deposit_type == update.deposit_type
                    && current.amount == update.amount
                    && current.money_source == update.money_source =>
            {
                Ok(DepositUpdate::DetailsOnly)
            }
            DepositStatus::Completed => Err(PostingError::CompletedDepositImmutable(current.id)),
        }
    }
}
