//! Ledger migration.
//!
//! Creates transactions with their installments and attachment metadata,
//! and deposits.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(TRANSACTIONS_SQL).await?;
        db.execute_unprepared(INSTALLMENTS_SQL).await?;
        db.execute_unprepared(ATTACHMENTS_SQL).await?;
        db.execute_unprepared(DEPOSITS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            r"
DROP TABLE IF EXISTS deposits CASCADE;
DROP TABLE IF EXISTS transaction_attachments CASCADE;
DROP TABLE IF EXISTS installments CASCADE;
DROP TABLE IF EXISTS transactions CASCADE;
",
        )
        .await?;
        Ok(())
    }
}

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY,
    transaction_type VARCHAR(20) NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    money_source VARCHAR(10) NOT NULL,
    bank_account_id UUID REFERENCES bank_accounts(id),
    cash_holder_id UUID REFERENCES cash_holders(id),
    product_id UUID REFERENCES products(id),
    quantity INTEGER NOT NULL DEFAULT 0,
    contact_id UUID REFERENCES contacts(id),
    category_id UUID REFERENCES categories(id),
    payment_method VARCHAR(20),
    is_paid BOOLEAN NOT NULL DEFAULT false,
    transaction_date DATE,
    due_date DATE,
    notes TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_transaction_type CHECK (
        transaction_type IN ('income', 'expense', 'share', 'share_reduction')
    ),
    CONSTRAINT chk_transaction_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_transaction_quantity CHECK (quantity >= 0),
    CONSTRAINT chk_transaction_money_source CHECK (
        (money_source = 'bank' AND bank_account_id IS NOT NULL AND cash_holder_id IS NULL)
        OR (money_source = 'cash' AND cash_holder_id IS NOT NULL AND bank_account_id IS NULL)
    )
);

CREATE INDEX idx_transactions_date ON transactions(transaction_date DESC);
CREATE INDEX idx_transactions_bank ON transactions(bank_account_id) WHERE bank_account_id IS NOT NULL;
CREATE INDEX idx_transactions_cash ON transactions(cash_holder_id) WHERE cash_holder_id IS NOT NULL;
";

const INSTALLMENTS_SQL: &str = r"
CREATE TABLE installments (
    id UUID PRIMARY KEY,
    transaction_id UUID NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    due_date DATE,
    is_paid BOOLEAN NOT NULL DEFAULT false,
    paid_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_installment_amount_positive CHECK (amount > 0),
    CONSTRAINT uq_installment_position UNIQUE (transaction_id, position)
);

-- Upcoming installments scan
CREATE INDEX idx_installments_unpaid_due ON installments(due_date) WHERE is_paid = false;
";

const ATTACHMENTS_SQL: &str = r"
CREATE TABLE transaction_attachments (
    id UUID PRIMARY KEY,
    transaction_id UUID NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
    file_name VARCHAR(255) NOT NULL,
    file_path TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_attachments_transaction ON transaction_attachments(transaction_id);
";

const DEPOSITS_SQL: &str = r"
CREATE TABLE deposits (
    id UUID PRIMARY KEY,
    deposit_type VARCHAR(10) NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    money_source VARCHAR(10) NOT NULL,
    bank_account_id UUID REFERENCES bank_accounts(id),
    cash_holder_id UUID REFERENCES cash_holders(id),
    contact_id UUID REFERENCES contacts(id),
    status VARCHAR(10) NOT NULL DEFAULT 'pending',
    notes TEXT,
    completed_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_deposit_type CHECK (deposit_type IN ('received', 'paid')),
    CONSTRAINT chk_deposit_status CHECK (status IN ('pending', 'completed')),
    CONSTRAINT chk_deposit_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_deposit_money_source CHECK (
        (money_source = 'bank' AND bank_account_id IS NOT NULL AND cash_holder_id IS NULL)
        OR (money_source = 'cash' AND cash_holder_id IS NOT NULL AND bank_account_id IS NULL)
    )
);

CREATE INDEX idx_deposits_status ON deposits(status, created_at DESC);
";
