//! Database layer with `SeaORM` entities and posting repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the ledger tables
//! - The PostgreSQL migration
//! - Repositories that run posting, reversal, installment and deposit
//!   operations inside one database transaction each

pub mod entities;
pub mod migration;
pub mod repositories;

pub use repositories::{
    DepositRepository, MasterDataRepository, RepositoryError, TransactionRepository,
};

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tally_shared::config::DatabaseConfig;

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a connection pool sized from configuration.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);
    Database::connect(options).await
}
