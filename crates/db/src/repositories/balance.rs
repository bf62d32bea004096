//! Locked balance reads and writes.
//!
//! [`BalanceStore`] executes the adjustment plans computed by `tally-core`
//! against the balance rows, inside the caller's database transaction. Every
//! row that is about to be mutated is read with a row lock on backends that
//! support one.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseTransaction, DbBackend, EntityTrait, QuerySelect,
    Select, Set,
};
use tally_core::posting::{
    AdjustmentPlan, AdjustmentService, ClampedBalance, EquityEffect, MoneyMovement, MoneySource,
    PostingEntry, PostingError, ReversalReport, ReversalService, Reverted, StockLevel,
};
use tally_shared::types::{
    BankAccountId, CashHolderId, CategoryId, ContactId, Money, ProductId,
};
use tracing::{debug, warn};
use uuid::Uuid;

use super::error::RepositoryError;
use crate::entities::{
    bank_accounts, cash_holders, categories, contacts, products,
    sea_orm_active_enums::MoneySourceKind,
};

/// Adds a row lock to `select` when the backend supports one.
///
/// PostgreSQL takes `FOR NO KEY UPDATE`: inserting a row that references a
/// locked row takes `FOR KEY SHARE` on it, which `FOR UPDATE` would wait on.
/// SQLite has no row locks; it serializes writers at the database level.
pub(crate) fn with_row_lock<E: EntityTrait>(select: Select<E>, backend: DbBackend) -> Select<E> {
    match backend {
        DbBackend::Sqlite => select,
        DbBackend::Postgres => select.lock(LockType::NoKeyUpdate),
        _ => select.lock_exclusive(),
    }
}

/// Converts a stored amount into [`Money`].
pub(crate) fn stored_money(value: Decimal, column: &str) -> Result<Money, RepositoryError> {
    Money::new(value)
        .map_err(|e| PostingError::Internal(format!("stored {column} is invalid: {e}")).into())
}

/// Rebuilds a money source from its stored selector and references.
pub(crate) fn stored_money_source(
    kind: MoneySourceKind,
    bank_account_id: Option<Uuid>,
    cash_holder_id: Option<Uuid>,
) -> Result<MoneySource, RepositoryError> {
    match (kind, bank_account_id, cash_holder_id) {
        (MoneySourceKind::Bank, Some(id), None) => {
            Ok(MoneySource::Bank(BankAccountId::from_uuid(id)))
        }
        (MoneySourceKind::Cash, None, Some(id)) => {
            Ok(MoneySource::Cash(CashHolderId::from_uuid(id)))
        }
        _ => Err(PostingError::Internal(format!(
            "stored money source {kind:?} does not match its references"
        ))
        .into()),
    }
}

/// Balance reads and writes bound to one database transaction.
pub(crate) struct BalanceStore<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> BalanceStore<'a> {
    pub(crate) const fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    fn backend(&self) -> DbBackend {
        self.txn.get_database_backend()
    }

    // ========== Plans ==========

    /// Applies a forward adjustment plan. Fails on the first balance that
    /// would go negative; the caller's transaction then rolls back.
    pub(crate) async fn apply(&self, plan: &AdjustmentPlan) -> Result<(), RepositoryError> {
        if let Some(movement) = plan.money {
            self.move_money(movement).await?;
        }

        if let Some(stock) = plan.stock {
            if let Some(current) = self.load_stock(stock.product_id).await? {
                let updated = AdjustmentService::apply_stock(
                    stock.product_id,
                    current,
                    stock.direction,
                    stock.quantity,
                )?;
                self.store_stock(stock.product_id, updated).await?;
                debug!(product_id = %stock.product_id, from = current, to = updated, "Stock adjusted");
            }
        }

        if let Some(equity) = plan.equity {
            let effect = self.load_equity_effect(equity.category_id).await?;
            if effect != EquityEffect::None {
                let current = self.load_equity(equity.contact_id).await?;
                let updated = AdjustmentService::apply_equity(
                    equity.contact_id,
                    current,
                    effect,
                    equity.amount,
                )?;
                self.store_equity(equity.contact_id, updated).await?;
                debug!(contact_id = %equity.contact_id, from = %current, to = %updated, "Equity adjusted");
            }
        }

        Ok(())
    }

    /// Undoes a previously applied plan, flooring balances at zero.
    ///
    /// `record_id` identifies the transaction or deposit in clamp warnings.
    pub(crate) async fn revert(
        &self,
        plan: &AdjustmentPlan,
        record_id: Uuid,
    ) -> Result<ReversalReport, RepositoryError> {
        let mut report = ReversalReport::default();

        if let Some(movement) = plan.money {
            let reverted = self.unwind_money(movement).await?;
            Self::note_clamp(&mut report, ClampedBalance::Money(movement.source), &reverted, record_id);
        }

        if let Some(stock) = plan.stock {
            if let Some(current) = self.load_stock(stock.product_id).await? {
                let reverted =
                    ReversalService::revert_stock(current, stock.direction, stock.quantity)?;
                self.store_stock(stock.product_id, reverted.value).await?;
                debug!(product_id = %stock.product_id, from = current, to = reverted.value, "Stock reverted");
                Self::note_clamp(
                    &mut report,
                    ClampedBalance::Stock(stock.product_id),
                    &reverted,
                    record_id,
                );
            }
        }

        if let Some(equity) = plan.equity {
            let effect = self.load_equity_effect(equity.category_id).await?;
            if effect != EquityEffect::None {
                let current = self.load_equity(equity.contact_id).await?;
                let reverted = ReversalService::revert_equity(current, effect, equity.amount)?;
                self.store_equity(equity.contact_id, reverted.value).await?;
                debug!(contact_id = %equity.contact_id, from = %current, to = %reverted.value, "Equity reverted");
                Self::note_clamp(
                    &mut report,
                    ClampedBalance::Equity(equity.contact_id),
                    &reverted,
                    record_id,
                );
            }
        }

        Ok(report)
    }

    fn note_clamp<T>(
        report: &mut ReversalReport,
        balance: ClampedBalance,
        reverted: &Reverted<T>,
        record_id: Uuid,
    ) {
        if reverted.shortfall > Decimal::ZERO {
            warn!(
                record_id = %record_id,
                balance = ?balance,
                shortfall = %reverted.shortfall,
                "Reversal clamped a balance at zero"
            );
        }
        report.record(balance, reverted);
    }

    // ========== Money ==========

    /// Applies one money movement and returns the new balance.
    pub(crate) async fn move_money(&self, movement: MoneyMovement) -> Result<Money, RepositoryError> {
        let current = self.load_money(movement.source).await?;
        let updated = AdjustmentService::apply_money(
            movement.source,
            current,
            movement.direction,
            movement.amount,
        )?;
        self.store_money(movement.source, updated).await?;
        debug!(source = %movement.source, from = %current, to = %updated, "Balance adjusted");
        Ok(updated)
    }

    /// Undoes one money movement, flooring at zero.
    async fn unwind_money(
        &self,
        movement: MoneyMovement,
    ) -> Result<Reverted<Money>, RepositoryError> {
        let current = self.load_money(movement.source).await?;
        let reverted = ReversalService::revert_money(current, movement.direction, movement.amount)?;
        self.store_money(movement.source, reverted.value).await?;
        debug!(source = %movement.source, from = %current, to = %reverted.value, "Balance reverted");
        Ok(reverted)
    }

    async fn load_money(&self, source: MoneySource) -> Result<Money, RepositoryError> {
        let balance = match source {
            MoneySource::Bank(id) => {
                with_row_lock(bank_accounts::Entity::find_by_id(id.into_inner()), self.backend())
                    .one(self.txn)
                    .await?
                    .ok_or(PostingError::BankAccountNotFound(id))?
                    .balance
            }
            MoneySource::Cash(id) => {
                with_row_lock(cash_holders::Entity::find_by_id(id.into_inner()), self.backend())
                    .one(self.txn)
                    .await?
                    .ok_or(PostingError::CashHolderNotFound(id))?
                    .balance
            }
        };
        stored_money(balance, "balance")
    }

    async fn store_money(&self, source: MoneySource, balance: Money) -> Result<(), RepositoryError> {
        let now = Utc::now().into();
        match source {
            MoneySource::Bank(id) => {
                bank_accounts::ActiveModel {
                    id: Set(id.into_inner()),
                    balance: Set(balance.amount()),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .update(self.txn)
                .await?;
            }
            MoneySource::Cash(id) => {
                cash_holders::ActiveModel {
                    id: Set(id.into_inner()),
                    balance: Set(balance.amount()),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .update(self.txn)
                .await?;
            }
        }
        Ok(())
    }

    // ========== Stock ==========

    /// Reads a product's stock level for validation, locking the row.
    ///
    /// Returns `None` when the product does not exist.
    pub(crate) async fn stock_level(
        &self,
        product_id: ProductId,
    ) -> Result<Option<StockLevel>, RepositoryError> {
        let product = with_row_lock(
            products::Entity::find_by_id(product_id.into_inner()),
            self.backend(),
        )
        .one(self.txn)
        .await?;
        Ok(product.map(|p| StockLevel {
            product_id,
            stock: p.stock,
        }))
    }

    /// Loads stock for mutation; `None` for untracked products.
    async fn load_stock(&self, product_id: ProductId) -> Result<Option<i64>, RepositoryError> {
        let level = self
            .stock_level(product_id)
            .await?
            .ok_or(PostingError::ProductNotFound(product_id))?;
        Ok(level.stock)
    }

    async fn store_stock(&self, product_id: ProductId, stock: i64) -> Result<(), RepositoryError> {
        products::ActiveModel {
            id: Set(product_id.into_inner()),
            stock: Set(Some(stock)),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .update(self.txn)
        .await?;
        Ok(())
    }

    // ========== Equity ==========

    async fn load_equity_effect(
        &self,
        category_id: CategoryId,
    ) -> Result<EquityEffect, RepositoryError> {
        let category = categories::Entity::find_by_id(category_id.into_inner())
            .one(self.txn)
            .await?
            .ok_or(PostingError::CategoryNotFound(category_id))?;
        Ok(category.equity_effect.into())
    }

    async fn load_equity(&self, contact_id: ContactId) -> Result<Money, RepositoryError> {
        let contact = with_row_lock(
            contacts::Entity::find_by_id(contact_id.into_inner()),
            self.backend(),
        )
        .one(self.txn)
        .await?
        .ok_or(PostingError::ContactNotFound(contact_id))?;
        stored_money(contact.equity.unwrap_or(Decimal::ZERO), "equity")
    }

    async fn store_equity(&self, contact_id: ContactId, equity: Money) -> Result<(), RepositoryError> {
        contacts::ActiveModel {
            id: Set(contact_id.into_inner()),
            equity: Set(Some(equity.amount())),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .update(self.txn)
        .await?;
        Ok(())
    }

    // ========== References ==========

    /// Checks that every record an entry refers to exists.
    pub(crate) async fn ensure_references(&self, entry: &PostingEntry) -> Result<(), RepositoryError> {
        self.ensure_money_source(entry.money_source).await?;

        if let Some(contact_id) = entry.contact_id {
            contacts::Entity::find_by_id(contact_id.into_inner())
                .one(self.txn)
                .await?
                .ok_or(PostingError::ContactNotFound(contact_id))?;
        }

        if let Some(category_id) = entry.category_id {
            categories::Entity::find_by_id(category_id.into_inner())
                .one(self.txn)
                .await?
                .ok_or(PostingError::CategoryNotFound(category_id))?;
        }

        Ok(())
    }

    /// Checks that a money source exists.
    pub(crate) async fn ensure_money_source(&self, source: MoneySource) -> Result<(), RepositoryError> {
        match source {
            MoneySource::Bank(id) => {
                bank_accounts::Entity::find_by_id(id.into_inner())
                    .one(self.txn)
                    .await?
                    .ok_or(PostingError::BankAccountNotFound(id))?;
            }
            MoneySource::Cash(id) => {
                cash_holders::Entity::find_by_id(id.into_inner())
                    .one(self.txn)
                    .await?
                    .ok_or(PostingError::CashHolderNotFound(id))?;
            }
        }
        Ok(())
    }
}
