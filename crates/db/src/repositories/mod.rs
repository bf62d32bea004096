//! Repositories that execute posting decisions against the database.
//!
//! Each mutating operation opens one database transaction, locks the rows it
//! is about to change, asks `tally-core` what to do and persists the result.
//! Nothing is visible to other connections until the transaction commits.

mod balance;
pub mod deposit;
pub mod error;
pub mod master_data;
pub mod transaction;

pub use deposit::{DepositChange, DepositFilter, DepositRepository};
pub use error::RepositoryError;
pub use master_data::{
    CreateBankAccountInput, CreateCashHolderInput, CreateCategoryInput, CreateContactInput,
    CreateProductInput, MasterDataRepository,
};
pub use transaction::{
    DeletedTransaction, InstallmentPayment, TransactionDetails, TransactionFilter,
    TransactionRepository, UpcomingInstallment, UpcomingInstallments, UpcomingQuery,
    UpdatedTransaction,
};
