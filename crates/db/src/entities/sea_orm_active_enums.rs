//! String-backed enums stored in ledger tables.
//!
//! Each mirrors a `tally-core` posting enum; the `From` impls convert at the
//! repository boundary.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::posting::{self as core, deposit};

/// Transaction type column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Income.
    #[sea_orm(string_value = "income")]
    Income,
    /// Expense.
    #[sea_orm(string_value = "expense")]
    Expense,
    /// Shareholder contribution.
    #[sea_orm(string_value = "share")]
    Share,
    /// Shareholder withdrawal.
    #[sea_orm(string_value = "share_reduction")]
    ShareReduction,
}

impl From<core::TransactionType> for TransactionType {
    fn from(value: core::TransactionType) -> Self {
        match value {
            core::TransactionType::Income => Self::Income,
            core::TransactionType::Expense => Self::Expense,
            core::TransactionType::Share => Self::Share,
            core::TransactionType::ShareReduction => Self::ShareReduction,
        }
    }
}

impl From<TransactionType> for core::TransactionType {
    fn from(value: TransactionType) -> Self {
        match value {
            TransactionType::Income => Self::Income,
            TransactionType::Expense => Self::Expense,
            TransactionType::Share => Self::Share,
            TransactionType::ShareReduction => Self::ShareReduction,
        }
    }
}

/// Money source selector column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum MoneySourceKind {
    /// Bank account.
    #[sea_orm(string_value = "bank")]
    Bank,
    /// Cash holder.
    #[sea_orm(string_value = "cash")]
    Cash,
}

impl From<core::MoneySourceKind> for MoneySourceKind {
    fn from(value: core::MoneySourceKind) -> Self {
        match value {
            core::MoneySourceKind::Bank => Self::Bank,
            core::MoneySourceKind::Cash => Self::Cash,
        }
    }
}

/// Payment method column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash.
    #[sea_orm(string_value = "cash")]
    Cash,
    /// Card or transfer.
    #[sea_orm(string_value = "card")]
    Card,
    /// Cheque.
    #[sea_orm(string_value = "cheque")]
    Cheque,
    /// Installments.
    #[sea_orm(string_value = "installment")]
    Installment,
}

impl From<core::PaymentMethod> for PaymentMethod {
    fn from(value: core::PaymentMethod) -> Self {
        match value {
            core::PaymentMethod::Cash => Self::Cash,
            core::PaymentMethod::Card => Self::Card,
            core::PaymentMethod::Cheque => Self::Cheque,
            core::PaymentMethod::Installment => Self::Installment,
        }
    }
}

/// Contact type column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ContactType {
    /// Shareholder with tracked equity.
    #[sea_orm(string_value = "shareholder")]
    Shareholder,
    /// Customer.
    #[sea_orm(string_value = "customer")]
    Customer,
    /// Vendor.
    #[sea_orm(string_value = "vendor")]
    Vendor,
}

/// Category equity effect column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum EquityEffect {
    /// No effect.
    #[sea_orm(string_value = "none")]
    None,
    /// Increase.
    #[sea_orm(string_value = "increase")]
    Increase,
    /// Decrease.
    #[sea_orm(string_value = "decrease")]
    Decrease,
}

impl From<core::EquityEffect> for EquityEffect {
    fn from(value: core::EquityEffect) -> Self {
        match value {
            core::EquityEffect::None => Self::None,
            core::EquityEffect::Increase => Self::Increase,
            core::EquityEffect::Decrease => Self::Decrease,
        }
    }
}

impl From<EquityEffect> for core::EquityEffect {
    fn from(value: EquityEffect) -> Self {
        match value {
            EquityEffect::None => Self::None,
            EquityEffect::Increase => Self::Increase,
            EquityEffect::Decrease => Self::Decrease,
        }
    }
}

/// Deposit type column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum DepositType {
    /// Received from a contact.
    #[sea_orm(string_value = "received")]
    Received,
    /// Paid to a contact.
    #[sea_orm(string_value = "paid")]
    Paid,
}

impl From<deposit::DepositType> for DepositType {
    fn from(value: deposit::DepositType) -> Self {
        match value {
            deposit::DepositType::Received => Self::Received,
            deposit::DepositType::Paid => Self::Paid,
        }
    }
}

impl From<DepositType> for deposit::DepositType {
    fn from(value: DepositType) -> Self {
        match value {
            DepositType::Received => Self::Received,
            DepositType::Paid => Self::Paid,
        }
    }
}

/// Deposit status column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    /// Awaiting settlement.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Settled.
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl From<deposit::DepositStatus> for DepositStatus {
    fn from(value: deposit::DepositStatus) -> Self {
        match value {
            deposit::DepositStatus::Pending => Self::Pending,
            deposit::DepositStatus::Completed => Self::Completed,
        }
    }
}

impl From<DepositStatus> for deposit::DepositStatus {
    fn from(value: DepositStatus) -> Self {
        match value {
            DepositStatus::Pending => Self::Pending,
            DepositStatus::Completed => Self::Completed,
        }
    }
}
