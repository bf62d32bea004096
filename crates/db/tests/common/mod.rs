//! Shared setup for repository integration tests.
//!
//! Every test gets its own in-memory SQLite database. The schema mirrors the
//! PostgreSQL migration, CHECK constraints and foreign keys included, with
//! SQLite column types: decimals are `real` because SQLite has no fixed
//! precision numeric type. The pool holds a single connection so the
//! database lives as long as the pool.
//!
//! Amounts are whole numbers: SQLite stores decimals as floating point.

#![allow(dead_code)]

use rust_decimal::Decimal;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait};
use tally_core::posting::{
    AttachmentInput, EquityEffect, InstallmentInput, MoneySourceInput, TransactionInput,
};
use tally_db::entities::{
    bank_accounts, cash_holders, contacts, products, sea_orm_active_enums::ContactType,
};
use tally_db::repositories::{
    CreateBankAccountInput, CreateCashHolderInput, CreateCategoryInput, CreateContactInput,
    CreateProductInput, MasterDataRepository,
};
use tally_shared::types::{
    BankAccountId, CashHolderId, CategoryId, ContactId, Money, ProductId,
};

const SQLITE_SCHEMA: &[&str] = &[
    r"
CREATE TABLE bank_accounts (
    id uuid_text NOT NULL PRIMARY KEY,
    bank_name varchar(100) NOT NULL,
    account_number varchar(50),
    card_number varchar(19),
    iban varchar(34),
    balance real NOT NULL,
    created_at timestamp_with_timezone_text NOT NULL,
    updated_at timestamp_with_timezone_text NOT NULL,
    CHECK (balance >= 0)
)",
    r"
CREATE TABLE cash_holders (
    id uuid_text NOT NULL PRIMARY KEY,
    first_name varchar(100) NOT NULL,
    last_name varchar(100) NOT NULL,
    phone_number varchar(20),
    balance real NOT NULL,
    created_at timestamp_with_timezone_text NOT NULL,
    updated_at timestamp_with_timezone_text NOT NULL,
    CHECK (balance >= 0)
)",
    r"
CREATE TABLE products (
    id uuid_text NOT NULL PRIMARY KEY,
    code varchar(50) NOT NULL UNIQUE,
    name varchar(255) NOT NULL,
    selling_price real NOT NULL,
    buying_price real,
    stock bigint,
    created_at timestamp_with_timezone_text NOT NULL,
    updated_at timestamp_with_timezone_text NOT NULL,
    CHECK (stock IS NULL OR stock >= 0),
    CHECK (selling_price >= 0)
)",
    r"
CREATE TABLE contacts (
    id uuid_text NOT NULL PRIMARY KEY,
    first_name varchar(100) NOT NULL,
    last_name varchar(100) NOT NULL,
    phone_number varchar(20),
    contact_type varchar(20) NOT NULL,
    share_percentage real,
    equity real,
    created_at timestamp_with_timezone_text NOT NULL,
    updated_at timestamp_with_timezone_text NOT NULL,
    CHECK (contact_type IN ('shareholder', 'customer', 'vendor')),
    CHECK (equity IS NULL OR equity >= 0)
)",
    r"
CREATE TABLE categories (
    id uuid_text NOT NULL PRIMARY KEY,
    name varchar(100) NOT NULL,
    description text,
    parent_id uuid_text REFERENCES categories(id) ON DELETE SET NULL,
    equity_effect varchar(10) NOT NULL,
    created_at timestamp_with_timezone_text NOT NULL,
    updated_at timestamp_with_timezone_text NOT NULL,
    CHECK (equity_effect IN ('none', 'increase', 'decrease'))
)",
    r"
CREATE TABLE transactions (
    id uuid_text NOT NULL PRIMARY KEY,
    transaction_type varchar(20) NOT NULL,
    amount real NOT NULL,
    money_source varchar(10) NOT NULL,
    bank_account_id uuid_text REFERENCES bank_accounts(id),
    cash_holder_id uuid_text REFERENCES cash_holders(id),
    product_id uuid_text REFERENCES products(id),
    quantity integer NOT NULL,
    contact_id uuid_text REFERENCES contacts(id),
    category_id uuid_text REFERENCES categories(id),
    payment_method varchar(20),
    is_paid boolean NOT NULL,
    transaction_date date_text,
    due_date date_text,
    notes text,
    created_at timestamp_with_timezone_text NOT NULL,
    updated_at timestamp_with_timezone_text NOT NULL,
    CHECK (transaction_type IN ('income', 'expense', 'share', 'share_reduction')),
    CHECK (amount > 0),
    CHECK (quantity >= 0),
    CHECK (
        (money_source = 'bank' AND bank_account_id IS NOT NULL AND cash_holder_id IS NULL)
        OR (money_source = 'cash' AND cash_holder_id IS NOT NULL AND bank_account_id IS NULL)
    )
)",
    r"
CREATE TABLE installments (
    id uuid_text NOT NULL PRIMARY KEY,
    transaction_id uuid_text NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
    position integer NOT NULL,
    amount real NOT NULL,
    due_date date_text,
    is_paid boolean NOT NULL,
    paid_at timestamp_with_timezone_text,
    created_at timestamp_with_timezone_text NOT NULL,
    updated_at timestamp_with_timezone_text NOT NULL,
    CHECK (amount > 0),
    UNIQUE (transaction_id, position)
)",
    r"
CREATE TABLE transaction_attachments (
    id uuid_text NOT NULL PRIMARY KEY,
    transaction_id uuid_text NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
    file_name varchar(255) NOT NULL,
    file_path text NOT NULL,
    created_at timestamp_with_timezone_text NOT NULL
)",
    r"
CREATE TABLE deposits (
    id uuid_text NOT NULL PRIMARY KEY,
    deposit_type varchar(10) NOT NULL,
    amount real NOT NULL,
    money_source varchar(10) NOT NULL,
    bank_account_id uuid_text REFERENCES bank_accounts(id),
    cash_holder_id uuid_text REFERENCES cash_holders(id),
    contact_id uuid_text REFERENCES contacts(id),
    status varchar(10) NOT NULL,
    notes text,
    completed_at timestamp_with_timezone_text,
    created_at timestamp_with_timezone_text NOT NULL,
    updated_at timestamp_with_timezone_text NOT NULL,
    CHECK (deposit_type IN ('received', 'paid')),
    CHECK (status IN ('pending', 'completed')),
    CHECK (amount > 0),
    CHECK (
        (money_source = 'bank' AND bank_account_id IS NOT NULL AND cash_holder_id IS NULL)
        OR (money_source = 'cash' AND cash_holder_id IS NOT NULL AND bank_account_id IS NULL)
    )
)",
];

/// Opens a fresh in-memory database with the ledger schema.
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");

    for statement in SQLITE_SCHEMA {
        db.execute_unprepared(statement)
            .await
            .expect("Failed to create table");
    }

    db
}

fn money(amount: Decimal) -> Money {
    Money::new(amount).expect("Opening amounts are non-negative")
}

// ============================================================================
// Seed helpers
// ============================================================================

pub async fn seed_bank(db: &DatabaseConnection, balance: Decimal) -> BankAccountId {
    let account = MasterDataRepository::new(db.clone())
        .create_bank_account(CreateBankAccountInput {
            bank_name: "Melli".to_string(),
            account_number: Some("0101-2020".to_string()),
            card_number: None,
            iban: None,
            opening_balance: money(balance),
        })
        .await
        .expect("Failed to seed bank account");
    BankAccountId::from_uuid(account.id)
}

pub async fn seed_cash(db: &DatabaseConnection, balance: Decimal) -> CashHolderId {
    let holder = MasterDataRepository::new(db.clone())
        .create_cash_holder(CreateCashHolderInput {
            first_name: "Sara".to_string(),
            last_name: "Ahmadi".to_string(),
            phone_number: None,
            opening_balance: money(balance),
        })
        .await
        .expect("Failed to seed cash holder");
    CashHolderId::from_uuid(holder.id)
}

pub async fn seed_product(db: &DatabaseConnection, code: &str, stock: Option<u32>) -> ProductId {
    let product = MasterDataRepository::new(db.clone())
        .create_product(CreateProductInput {
            code: code.to_string(),
            name: format!("Product {code}"),
            selling_price: money(Decimal::from(30)),
            buying_price: Some(money(Decimal::from(20))),
            opening_stock: stock,
        })
        .await
        .expect("Failed to seed product");
    ProductId::from_uuid(product.id)
}

pub async fn seed_shareholder(db: &DatabaseConnection, equity: Option<Decimal>) -> ContactId {
    let contact = MasterDataRepository::new(db.clone())
        .create_contact(CreateContactInput {
            first_name: "Reza".to_string(),
            last_name: "Karimi".to_string(),
            phone_number: None,
            contact_type: ContactType::Shareholder,
            share_percentage: Some(Decimal::from(50)),
            opening_equity: equity.map(money),
        })
        .await
        .expect("Failed to seed shareholder");
    ContactId::from_uuid(contact.id)
}

pub async fn seed_category(
    db: &DatabaseConnection,
    name: &str,
    equity_effect: Option<EquityEffect>,
) -> CategoryId {
    let category = MasterDataRepository::new(db.clone())
        .create_category(CreateCategoryInput {
            name: name.to_string(),
            description: None,
            parent_id: None,
            equity_effect,
        })
        .await
        .expect("Failed to seed category");
    CategoryId::from_uuid(category.id)
}

// ============================================================================
// Balance readers
// ============================================================================

pub async fn bank_balance(db: &DatabaseConnection, id: BankAccountId) -> Decimal {
    bank_accounts::Entity::find_by_id(id.into_inner())
        .one(db)
        .await
        .expect("Failed to query bank account")
        .expect("Bank account exists")
        .balance
}

pub async fn cash_balance(db: &DatabaseConnection, id: CashHolderId) -> Decimal {
    cash_holders::Entity::find_by_id(id.into_inner())
        .one(db)
        .await
        .expect("Failed to query cash holder")
        .expect("Cash holder exists")
        .balance
}

pub async fn stock(db: &DatabaseConnection, id: ProductId) -> Option<i64> {
    products::Entity::find_by_id(id.into_inner())
        .one(db)
        .await
        .expect("Failed to query product")
        .expect("Product exists")
        .stock
}

pub async fn equity(db: &DatabaseConnection, id: ContactId) -> Option<Decimal> {
    contacts::Entity::find_by_id(id.into_inner())
        .one(db)
        .await
        .expect("Failed to query contact")
        .expect("Contact exists")
        .equity
}

// ============================================================================
// Payload builders
// ============================================================================

/// A paid single-payment transaction without product, contact or category.
pub fn entry(transaction_type: &str, amount: i64, money_source: MoneySourceInput) -> TransactionInput {
    TransactionInput {
        transaction_type: transaction_type.to_string(),
        amount: Decimal::from(amount),
        money_source,
        product_id: None,
        quantity: 0,
        contact_id: None,
        category_id: None,
        payment_method: None,
        is_paid: true,
        transaction_date: None,
        due_date: None,
        notes: None,
        installments: Vec::new(),
        attachments: Vec::new(),
    }
}

pub fn installments(amounts: &[i64]) -> Vec<InstallmentInput> {
    amounts
        .iter()
        .map(|amount| InstallmentInput {
            amount: Decimal::from(*amount),
            due_date: None,
        })
        .collect()
}

pub fn attachment(name: &str) -> AttachmentInput {
    AttachmentInput {
        file_name: name.to_string(),
        file_path: format!("attachments/{name}"),
    }
}
