//! `SeaORM` entity definitions for the ledger tables.

pub mod bank_accounts;
pub mod cash_holders;
pub mod categories;
pub mod contacts;
pub mod deposits;
pub mod installments;
pub mod products;
pub mod sea_orm_active_enums;
pub mod transaction_attachments;
pub mod transactions;
