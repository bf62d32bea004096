//! Domain types for posting transactions and deposits.
//!
//! Inputs arrive loosely typed (type names as strings, optional references)
//! and are turned into the validated types below by
//! [`EntryValidator`](super::validation::EntryValidator).

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{
    BankAccountId, CashHolderId, CategoryId, ContactId, Money, ProductId,
};

use super::error::PostingError;

/// Direction of a balance movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// The balance grows.
    Inflow,
    /// The balance shrinks and must not go below zero.
    Outflow,
}

impl Direction {
    /// Returns the opposite direction, used when undoing a movement.
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::Inflow => Self::Outflow,
            Self::Outflow => Self::Inflow,
        }
    }
}

/// Transaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Money received, usually a sale.
    Income,
    /// Money spent, usually a purchase.
    Expense,
    /// Shareholder contribution.
    Share,
    /// Shareholder withdrawal.
    ShareReduction,
}

impl TransactionType {
    /// Returns the canonical string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Share => "share",
            Self::ShareReduction => "share_reduction",
        }
    }

    /// Direction in which the money source moves when this type settles.
    #[must_use]
    pub const fn money_direction(self) -> Direction {
        match self {
            Self::Income | Self::Share => Direction::Inflow,
            Self::Expense | Self::ShareReduction => Direction::Outflow,
        }
    }

    /// Direction in which product stock moves, if this type touches stock.
    ///
    /// A sale takes goods out, a purchase brings them in.
    #[must_use]
    pub const fn stock_direction(self) -> Option<Direction> {
        match self {
            Self::Income => Some(Direction::Outflow),
            Self::Expense => Some(Direction::Inflow),
            Self::Share | Self::ShareReduction => None,
        }
    }
}

impl FromStr for TransactionType {
    type Err = PostingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "share" => Ok(Self::Share),
            "share_reduction" => Ok(Self::ShareReduction),
            other => Err(PostingError::InvalidTransactionType(other.to_string())),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selector naming which kind of money source a record uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoneySourceKind {
    /// A bank account.
    Bank,
    /// A cash holder.
    Cash,
}

impl MoneySourceKind {
    /// Returns the canonical string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::Cash => "cash",
        }
    }
}

impl FromStr for MoneySourceKind {
    type Err = PostingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bank" => Ok(Self::Bank),
            "cash" => Ok(Self::Cash),
            other => Err(PostingError::InvalidMoneySource(other.to_string())),
        }
    }
}

/// Unvalidated money source as supplied by a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneySourceInput {
    /// `"bank"` or `"cash"`.
    pub kind: String,
    /// Bank account reference, required when `kind` is `"bank"`.
    pub bank_account_id: Option<BankAccountId>,
    /// Cash holder reference, required when `kind` is `"cash"`.
    pub cash_holder_id: Option<CashHolderId>,
}

impl MoneySourceInput {
    /// Bank source shorthand.
    #[must_use]
    pub fn bank(id: BankAccountId) -> Self {
        Self {
            kind: MoneySourceKind::Bank.as_str().to_string(),
            bank_account_id: Some(id),
            cash_holder_id: None,
        }
    }

    /// Cash source shorthand.
    #[must_use]
    pub fn cash(id: CashHolderId) -> Self {
        Self {
            kind: MoneySourceKind::Cash.as_str().to_string(),
            bank_account_id: None,
            cash_holder_id: Some(id),
        }
    }
}

/// A validated money source: exactly one balance-bearing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum MoneySource {
    /// A bank account.
    Bank(BankAccountId),
    /// A cash holder.
    Cash(CashHolderId),
}

impl MoneySource {
    /// Returns the selector for this source.
    #[must_use]
    pub const fn kind(self) -> MoneySourceKind {
        match self {
            Self::Bank(_) => MoneySourceKind::Bank,
            Self::Cash(_) => MoneySourceKind::Cash,
        }
    }

    /// Bank account reference, if this is a bank source.
    #[must_use]
    pub const fn bank_account_id(self) -> Option<BankAccountId> {
        match self {
            Self::Bank(id) => Some(id),
            Self::Cash(_) => None,
        }
    }

    /// Cash holder reference, if this is a cash source.
    #[must_use]
    pub const fn cash_holder_id(self) -> Option<CashHolderId> {
        match self {
            Self::Cash(id) => Some(id),
            Self::Bank(_) => None,
        }
    }
}

impl fmt::Display for MoneySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bank(id) => write!(f, "bank account {id}"),
            Self::Cash(id) => write!(f, "cash holder {id}"),
        }
    }
}

/// How transactions in a category move a shareholder's equity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquityEffect {
    /// No equity movement.
    #[default]
    None,
    /// Equity grows by the settled amount.
    Increase,
    /// Equity shrinks by the settled amount.
    Decrease,
}

impl EquityEffect {
    /// Category names that have historically marked equity categories.
    const INCREASE_NAMES: [&'static str; 2] = ["increase equity", "افزایش سهام"];
    const DECREASE_NAMES: [&'static str; 2] = ["decrease equity", "کاهش سهام"];

    /// Classifies a category by its display name.
    ///
    /// Used when a category is created without an explicit effect.
    #[must_use]
    pub fn classify_name(name: &str) -> Self {
        let name = name.trim();
        if Self::INCREASE_NAMES
            .iter()
            .any(|n| n.eq_ignore_ascii_case(name))
        {
            Self::Increase
        } else if Self::DECREASE_NAMES
            .iter()
            .any(|n| n.eq_ignore_ascii_case(name))
        {
            Self::Decrease
        } else {
            Self::None
        }
    }

    /// Balance direction for this effect, `None` when equity is untouched.
    #[must_use]
    pub const fn direction(self) -> Option<Direction> {
        match self {
            Self::None => None,
            Self::Increase => Some(Direction::Inflow),
            Self::Decrease => Some(Direction::Outflow),
        }
    }
}

/// Payment method recorded on a transaction. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Paid in cash.
    Cash,
    /// Paid by card or bank transfer.
    Card,
    /// Paid by cheque.
    Cheque,
    /// Paid over several installments.
    Installment,
}

/// Unvalidated installment line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentInput {
    /// Installment amount.
    pub amount: Decimal,
    /// Optional due date.
    pub due_date: Option<NaiveDate>,
}

/// Metadata of a file attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentInput {
    /// Original file name.
    pub file_name: String,
    /// Storage path of the file.
    pub file_path: String,
}

/// Unvalidated transaction payload used for both create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    /// `"income"`, `"expense"`, `"share"` or `"share_reduction"`.
    pub transaction_type: String,
    /// Total amount.
    pub amount: Decimal,
    /// Money source selector and references.
    pub money_source: MoneySourceInput,
    /// Product sold or bought.
    pub product_id: Option<ProductId>,
    /// Units of the product.
    pub quantity: u32,
    /// Counterparty.
    pub contact_id: Option<ContactId>,
    /// Category.
    pub category_id: Option<CategoryId>,
    /// Payment method.
    pub payment_method: Option<PaymentMethod>,
    /// Paid flag. Ignored when installments are given.
    pub is_paid: bool,
    /// Booking date.
    pub transaction_date: Option<NaiveDate>,
    /// Due date of the whole transaction.
    pub due_date: Option<NaiveDate>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Installment plan, empty for a single payment.
    pub installments: Vec<InstallmentInput>,
    /// Attached file metadata.
    pub attachments: Vec<AttachmentInput>,
}

/// Product reference and quantity of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductLine {
    /// Product.
    pub product_id: ProductId,
    /// Units moved.
    pub quantity: u32,
}

/// The balance-relevant part of a transaction.
///
/// Every money, stock and equity effect is derived from this plus a
/// settlement amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingEntry {
    /// Transaction type.
    pub transaction_type: TransactionType,
    /// Total amount.
    pub amount: Money,
    /// Money source.
    pub money_source: MoneySource,
    /// Product line, only present with a positive quantity.
    pub product: Option<ProductLine>,
    /// Counterparty.
    pub contact_id: Option<ContactId>,
    /// Category.
    pub category_id: Option<CategoryId>,
}

impl PostingEntry {
    /// Contact and category pair, when both are set.
    #[must_use]
    pub fn equity_target(&self) -> Option<(ContactId, CategoryId)> {
        self.contact_id.zip(self.category_id)
    }
}

/// Validated installment line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedInstallment {
    /// Installment amount, strictly positive.
    pub amount: Money,
    /// Optional due date.
    pub due_date: Option<NaiveDate>,
}

/// A transaction payload that passed every validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedTransaction {
    /// Balance-relevant fields.
    pub entry: PostingEntry,
    /// Referenced product, kept even when the quantity is zero.
    pub product_id: Option<ProductId>,
    /// Paid flag. Always `false` for an installment plan.
    pub is_paid: bool,
    /// Installment plan, summing exactly to the amount when non-empty.
    pub installments: Vec<ValidatedInstallment>,
    /// Payment method.
    pub payment_method: Option<PaymentMethod>,
    /// Booking date.
    pub transaction_date: Option<NaiveDate>,
    /// Due date.
    pub due_date: Option<NaiveDate>,
    /// Notes.
    pub notes: Option<String>,
    /// Attached file metadata.
    pub attachments: Vec<AttachmentInput>,
}

/// Stock level of a product as read from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    /// Product.
    pub product_id: ProductId,
    /// On-hand units; `None` for products that do not track stock.
    pub stock: Option<i64>,
}
