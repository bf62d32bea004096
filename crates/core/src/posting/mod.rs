//! Ledger posting and reversal.
//!
//! This module holds the pure rules of the posting engine:
//! - Payload validation for transactions and deposits
//! - Forward balance adjustments (money, stock, equity)
//! - Exact reversal by settled amount, with clamp reporting
//! - Installment settlement state machine
//! - Deposit lifecycle
//!
//! Nothing here touches storage. The `tally-db` repositories load the
//! affected rows, ask these services what to do, and persist the result in a
//! single database transaction.

pub mod adjustment;
pub mod deposit;
pub mod error;
pub mod installment;
pub mod reversal;
pub mod types;
pub mod validation;

#[cfg(test)]
mod adjustment_props;
#[cfg(test)]
mod validation_props;

pub use adjustment::{AdjustmentPlan, AdjustmentService, EquityMovement, MoneyMovement, StockMovement};
pub use deposit::{
    DepositInput, DepositService, DepositState, DepositStatus, DepositType, DepositUpdate,
    ValidatedDeposit,
};
pub use error::{ErrorKind, PostingError};
pub use installment::{InstallmentService, InstallmentState, PaymentAction};
pub use reversal::{ClampWarning, ClampedBalance, ReversalReport, ReversalService, Reverted};
pub use types::{
    AttachmentInput, Direction, EquityEffect, InstallmentInput, MoneySource, MoneySourceInput,
    MoneySourceKind, PaymentMethod, PostingEntry, ProductLine, StockLevel, TransactionInput,
    TransactionType, ValidatedInstallment, ValidatedTransaction,
};
pub use validation::EntryValidator;
