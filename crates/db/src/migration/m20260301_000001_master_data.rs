//! Master data migration.
//!
//! Creates the balance-bearing tables (bank accounts, cash holders, products,
//! contacts) and categories. Non-negative balances are enforced by CHECK
//! constraints in addition to the posting engine.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(BANK_ACCOUNTS_SQL).await?;
        db.execute_unprepared(CASH_HOLDERS_SQL).await?;
        db.execute_unprepared(PRODUCTS_SQL).await?;
        db.execute_unprepared(CONTACTS_SQL).await?;
        db.execute_unprepared(CATEGORIES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            r"
DROP TABLE IF EXISTS categories CASCADE;
DROP TABLE IF EXISTS contacts CASCADE;
DROP TABLE IF EXISTS products CASCADE;
DROP TABLE IF EXISTS cash_holders CASCADE;
DROP TABLE IF EXISTS bank_accounts CASCADE;
",
        )
        .await?;
        Ok(())
    }
}

const BANK_ACCOUNTS_SQL: &str = r"
CREATE TABLE bank_accounts (
    id UUID PRIMARY KEY,
    bank_name VARCHAR(100) NOT NULL,
    account_number VARCHAR(50),
    card_number VARCHAR(19),
    iban VARCHAR(34),
    balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_bank_balance_non_negative CHECK (balance >= 0)
);
";

const CASH_HOLDERS_SQL: &str = r"
CREATE TABLE cash_holders (
    id UUID PRIMARY KEY,
    first_name VARCHAR(100) NOT NULL,
    last_name VARCHAR(100) NOT NULL,
    phone_number VARCHAR(20),
    balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_cash_balance_non_negative CHECK (balance >= 0)
);
";

const PRODUCTS_SQL: &str = r"
CREATE TABLE products (
    id UUID PRIMARY KEY,
    code VARCHAR(50) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    selling_price NUMERIC(19, 4) NOT NULL,
    buying_price NUMERIC(19, 4),
    stock BIGINT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_product_stock_non_negative CHECK (stock IS NULL OR stock >= 0),
    CONSTRAINT chk_product_price_non_negative CHECK (selling_price >= 0)
);
";

const CONTACTS_SQL: &str = r"
CREATE TABLE contacts (
    id UUID PRIMARY KEY,
    first_name VARCHAR(100) NOT NULL,
    last_name VARCHAR(100) NOT NULL,
    phone_number VARCHAR(20),
    contact_type VARCHAR(20) NOT NULL,
    share_percentage NUMERIC(7, 4),
    equity NUMERIC(19, 4),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_contact_type CHECK (contact_type IN ('shareholder', 'customer', 'vendor')),
    CONSTRAINT chk_contact_equity_non_negative CHECK (equity IS NULL OR equity >= 0)
);

CREATE INDEX idx_contacts_type ON contacts(contact_type);
";

const CATEGORIES_SQL: &str = r"
CREATE TABLE categories (
    id UUID PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    description TEXT,
    parent_id UUID REFERENCES categories(id) ON DELETE SET NULL,
    equity_effect VARCHAR(10) NOT NULL DEFAULT 'none',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_category_equity_effect CHECK (equity_effect IN ('none', 'increase', 'decrease'))
);
";
