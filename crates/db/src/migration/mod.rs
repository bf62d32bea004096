//! Database migrations.
//!
//! Migrations are managed using sea-orm-migration and target PostgreSQL.

pub use sea_orm_migration::prelude::*;

mod m20260301_000001_master_data;
mod m20260301_000002_ledger;

/// Migrator for running database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_master_data::Migration),
            Box::new(m20260301_000002_ledger::Migration),
        ]
    }
}
