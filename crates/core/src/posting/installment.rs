//! Installment payment state machine and due-date window.
//!
//! ```text
//! Unpaid ──pay──► Paid        (pay on Paid is a no-op)
//! ```
//!
//! The parent transaction is paid once every installment is paid.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::types::{InstallmentId, Money};

use super::error::PostingError;

/// Stored state of one installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentState {
    /// Installment.
    pub id: InstallmentId,
    /// Amount.
    pub amount: Money,
    /// Paid flag.
    pub is_paid: bool,
    /// Optional due date.
    pub due_date: Option<NaiveDate>,
}

/// What paying an installment amounts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentAction {
    /// The installment was already paid; nothing changes.
    AlreadyPaid,
    /// Settle `amount` and mark the installment paid.
    Settle {
        /// Money to move.
        amount: Money,
        /// Whether this payment completes the plan.
        completes_parent: bool,
    },
}

/// Stateless installment rules.
pub struct InstallmentService;

impl InstallmentService {
    /// Decides what paying `target` does, given every installment of its plan.
    pub fn pay(
        target: InstallmentId,
        plan: &[InstallmentState],
    ) -> Result<PaymentAction, PostingError> {
        let installment = plan
            .iter()
            .find(|i| i.id == target)
            .ok_or(PostingError::InstallmentNotFound(target))?;

        if installment.is_paid {
            return Ok(PaymentAction::AlreadyPaid);
        }

        let completes_parent = plan.iter().all(|i| i.is_paid || i.id == target);
        Ok(PaymentAction::Settle {
            amount: installment.amount,
            completes_parent,
        })
    }

    /// Sum of paid installment amounts.
    pub fn paid_total(plan: &[InstallmentState]) -> Result<Money, PostingError> {
        plan.iter()
            .filter(|i| i.is_paid)
            .try_fold(Money::ZERO, |acc, i| acc.checked_add(i.amount))
            .ok_or_else(|| PostingError::Internal("paid installment total overflowed".to_string()))
    }

    /// Last due date included in the upcoming window starting at `now`.
    pub fn upcoming_cutoff(now: DateTime<Utc>, window: Duration) -> Result<NaiveDate, PostingError> {
        now.checked_add_signed(window)
            .map(|end| end.date_naive())
            .ok_or_else(|| PostingError::WindowOutOfRange(window.to_string()))
    }

    /// Returns true if the installment is unpaid and due within the window.
    ///
    /// Overdue installments count as upcoming. Installments without a due
    /// date never do.
    #[must_use]
    pub fn is_upcoming(installment: &InstallmentState, cutoff: NaiveDate) -> bool {
        !installment.is_paid && installment.due_date.is_some_and(|due| due <= cutoff)
    }
}
