//! Posting error types.
//!
//! Every failure of a posting, reversal or deposit operation maps onto one
//! of five kinds: validation, insufficient balance, not found, conflict and
//! store failure.

use rust_decimal::Decimal;
use tally_shared::AppError;
use tally_shared::types::{
    BankAccountId, CashHolderId, CategoryId, ContactId, DepositId, InstallmentId, ProductId,
    TransactionId,
};
use thiserror::Error;

use super::types::MoneySource;

/// Error taxonomy shared by every posting operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The payload is malformed or inconsistent.
    Validation,
    /// A balance would go negative.
    InsufficientBalance,
    /// A referenced record does not exist.
    NotFound,
    /// The record's state forbids the operation.
    Conflict,
    /// The store failed.
    Store,
}

/// Errors raised while posting, reverting or settling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostingError {
    // ========== Validation Errors ==========
    /// Money source selector is neither bank nor cash.
    #[error("Invalid money source: {0}")]
    InvalidMoneySource(String),

    /// Bank selected without a bank account.
    #[error("Bank account is required when the money source is bank")]
    MissingBankAccount,

    /// Cash selected without a cash holder.
    #[error("Cash holder is required when the money source is cash")]
    MissingCashHolder,

    /// Both a bank account and a cash holder were supplied.
    #[error("Only one of bank account or cash holder may be set")]
    ConflictingMoneySource,

    /// Transaction type is not one of the accepted values.
    #[error("Invalid transaction type: {0}")]
    InvalidTransactionType(String),

    /// Deposit type is not one of the accepted values.
    #[error("Invalid deposit type: {0}")]
    InvalidDepositType(String),

    /// Amount must be strictly positive.
    #[error("Amount must be greater than zero, got {0}")]
    NonPositiveAmount(Decimal),

    /// Amount has more decimal places than a money column stores.
    #[error("Amount {0} has more than 4 decimal places")]
    ExcessivePrecision(Decimal),

    /// Installment amount must be strictly positive.
    #[error("Installment amount must be greater than zero, got {0}")]
    NonPositiveInstallment(Decimal),

    /// Installments do not sum to the transaction amount.
    #[error("Installments sum to {actual} but the transaction amount is {expected}")]
    InstallmentMismatch {
        /// Transaction amount.
        expected: Decimal,
        /// Sum of installment amounts.
        actual: Decimal,
    },

    /// Product stock cannot cover a sale.
    #[error("Product {product_id} has {available} in stock, {requested} requested")]
    StockUnavailable {
        /// Product.
        product_id: ProductId,
        /// Units on hand.
        available: i64,
        /// Units requested.
        requested: u32,
    },

    /// Upcoming window does not fit the calendar.
    #[error("Upcoming window is out of range: {0}")]
    WindowOutOfRange(String),

    // ========== Insufficient Balance Errors ==========
    /// Money source balance cannot cover an outflow.
    #[error("Insufficient funds in {money_source}: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Money source.
        money_source: MoneySource,
        /// Current balance.
        available: Decimal,
        /// Requested outflow.
        requested: Decimal,
    },

    /// Product stock cannot cover an outflow.
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        /// Product.
        product_id: ProductId,
        /// Units on hand.
        available: i64,
        /// Units requested.
        requested: u32,
    },

    /// Shareholder equity cannot cover a decrease.
    #[error("Insufficient equity for contact {contact_id}: available {available}, requested {requested}")]
    InsufficientEquity {
        /// Shareholder.
        contact_id: ContactId,
        /// Current equity.
        available: Decimal,
        /// Requested decrease.
        requested: Decimal,
    },

    // ========== Not Found Errors ==========
    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Installment not found.
    #[error("Installment not found: {0}")]
    InstallmentNotFound(InstallmentId),

    /// Deposit not found.
    #[error("Deposit not found: {0}")]
    DepositNotFound(DepositId),

    /// Bank account not found.
    #[error("Bank account not found: {0}")]
    BankAccountNotFound(BankAccountId),

    /// Cash holder not found.
    #[error("Cash holder not found: {0}")]
    CashHolderNotFound(CashHolderId),

    /// Product not found.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Contact not found.
    #[error("Contact not found: {0}")]
    ContactNotFound(ContactId),

    /// Category not found.
    #[error("Category not found: {0}")]
    CategoryNotFound(CategoryId),

    // ========== Conflict Errors ==========
    /// Deposit was already settled.
    #[error("Deposit {0} is already completed")]
    DepositAlreadyCompleted(DepositId),

    /// A completed deposit's balance-relevant fields cannot change.
    #[error("Deposit {0} is completed; only notes and contact can be changed")]
    CompletedDepositImmutable(DepositId),

    /// Another product already uses this code.
    #[error("Product code already exists: {0}")]
    DuplicateProductCode(String),

    // ========== Store Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PostingError {
    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidMoneySource(_)
            | Self::MissingBankAccount
            | Self::MissingCashHolder
            | Self::ConflictingMoneySource
            | Self::InvalidTransactionType(_)
            | Self::InvalidDepositType(_)
            | Self::NonPositiveAmount(_)
            | Self::ExcessivePrecision(_)
            | Self::NonPositiveInstallment(_)
            | Self::InstallmentMismatch { .. }
            | Self::StockUnavailable { .. }
            | Self::WindowOutOfRange(_) => ErrorKind::Validation,
            Self::InsufficientFunds { .. }
            | Self::InsufficientStock { .. }
            | Self::InsufficientEquity { .. } => ErrorKind::InsufficientBalance,
            Self::TransactionNotFound(_)
            | Self::InstallmentNotFound(_)
            | Self::DepositNotFound(_)
            | Self::BankAccountNotFound(_)
            | Self::CashHolderNotFound(_)
            | Self::ProductNotFound(_)
            | Self::ContactNotFound(_)
            | Self::CategoryNotFound(_) => ErrorKind::NotFound,
            Self::DepositAlreadyCompleted(_)
            | Self::CompletedDepositImmutable(_)
            | Self::DuplicateProductCode(_) => ErrorKind::Conflict,
            Self::Database(_) | Self::Internal(_) => ErrorKind::Store,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidMoneySource(_) => "INVALID_MONEY_SOURCE",
            Self::MissingBankAccount => "MISSING_BANK_ACCOUNT",
            Self::MissingCashHolder => "MISSING_CASH_HOLDER",
            Self::ConflictingMoneySource => "CONFLICTING_MONEY_SOURCE",
            Self::InvalidTransactionType(_) => "INVALID_TRANSACTION_TYPE",
            Self::InvalidDepositType(_) => "INVALID_DEPOSIT_TYPE",
            Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            Self::ExcessivePrecision(_) => "EXCESSIVE_PRECISION",
            Self::NonPositiveInstallment(_) => "NON_POSITIVE_INSTALLMENT",
            Self::InstallmentMismatch { .. } => "INSTALLMENT_MISMATCH",
            Self::StockUnavailable { .. } => "STOCK_UNAVAILABLE",
            Self::WindowOutOfRange(_) => "WINDOW_OUT_OF_RANGE",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::InsufficientEquity { .. } => "INSUFFICIENT_EQUITY",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::InstallmentNotFound(_) => "INSTALLMENT_NOT_FOUND",
            Self::DepositNotFound(_) => "DEPOSIT_NOT_FOUND",
            Self::BankAccountNotFound(_) => "BANK_ACCOUNT_NOT_FOUND",
            Self::CashHolderNotFound(_) => "CASH_HOLDER_NOT_FOUND",
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            Self::ContactNotFound(_) => "CONTACT_NOT_FOUND",
            Self::CategoryNotFound(_) => "CATEGORY_NOT_FOUND",
            Self::DepositAlreadyCompleted(_) => "DEPOSIT_ALREADY_COMPLETED",
            Self::CompletedDepositImmutable(_) => "COMPLETED_DEPOSIT_IMMUTABLE",
            Self::DuplicateProductCode(_) => "DUPLICATE_PRODUCT_CODE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::InsufficientBalance => 422,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Store => 500,
        }
    }

    /// Returns true if the caller may retry the operation unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

impl From<PostingError> for AppError {
    fn from(err: PostingError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::InsufficientBalance => Self::BusinessRule(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::Conflict => Self::Conflict(message),
            ErrorKind::Store => match err {
                PostingError::Database(msg) => Self::Database(msg),
                _ => Self::Internal(message),
            },
        }
    }
}
