//! Deposit repository: held funds with a pending to completed lifecycle.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tally_core::posting::{
    AdjustmentPlan, DepositInput, DepositService, DepositState, DepositStatus, DepositUpdate, MoneyMovement,
    PostingError, ReversalReport, ValidatedDeposit,
};
use tally_shared::types::{DepositId, PageRequest, PageResponse};
use tracing::info;
use uuid::Uuid;

use super::balance::{stored_money, stored_money_source, with_row_lock, BalanceStore};
use super::error::RepositoryError;
use crate::entities::{contacts, deposits, sea_orm_active_enums};

/// Filter options for listing deposits.
#[derive(Debug, Clone, Default)]
pub struct DepositFilter {
    /// Filter by status.
    pub status: Option<sea_orm_active_enums::DepositStatus>,
    /// Filter by type.
    pub deposit_type: Option<sea_orm_active_enums::DepositType>,
}

/// Result of updating or deleting a deposit.
#[derive(Debug, Clone)]
pub struct DepositChange {
    /// Deposit after the change; for a delete, the removed row.
    pub deposit: deposits::Model,
    /// Clamps that occurred while reverting the creation effect.
    pub reversal: ReversalReport,
}

fn deposit_state(model: &deposits::Model) -> Result<DepositState, RepositoryError> {
    Ok(DepositState {
        id: DepositId::from_uuid(model.id),
        deposit_type: model.deposit_type.into(),
        amount: stored_money(model.amount, "deposit amount")?,
        money_source: stored_money_source(
            model.money_source,
            model.bank_account_id,
            model.cash_holder_id,
        )?,
        status: model.status.into(),
    })
}

/// Deposit repository for the deposit lifecycle.
#[derive(Debug, Clone)]
pub struct DepositRepository {
    db: DatabaseConnection,
}

impl DepositRepository {
    /// Creates a new deposit repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records a pending deposit and applies its creation effect.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The payload fails validation
    /// - The money source or contact does not exist
    /// - The creation effect would overdraw the money source
    /// - Database operation fails
    pub async fn create_deposit(
        &self,
        input: DepositInput,
    ) -> Result<deposits::Model, RepositoryError> {
        let validated = DepositService::validate(&input)?;

        let txn = self.db.begin().await?;
        let balances = BalanceStore::new(&txn);
        Self::ensure_references(&txn, &balances, &validated).await?;

        let now = Utc::now().into();
        let deposit = deposits::ActiveModel {
            id: Set(Uuid::now_v7()),
            status: Set(DepositStatus::Pending.into()),
            completed_at: Set(None),
            created_at: Set(now),
            ..Self::active_model(&validated)
        }
        .insert(&txn)
        .await?;

        balances.move_money(Self::creation_movement(&validated)).await?;

        txn.commit().await?;

        info!(
            deposit_id = %deposit.id,
            deposit_type = %validated.deposit_type,
            amount = %validated.amount,
            "Deposit created"
        );

        Ok(deposit)
    }

    /// Gets a deposit by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the deposit is not found or database query fails.
    pub async fn get_deposit(&self, id: DepositId) -> Result<deposits::Model, RepositoryError> {
        Ok(deposits::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .ok_or(PostingError::DepositNotFound(id))?)
    }

    /// Lists deposits, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_deposits(
        &self,
        filter: DepositFilter,
        page: PageRequest,
    ) -> Result<PageResponse<deposits::Model>, RepositoryError> {
        let mut query = deposits::Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(deposits::Column::Status.eq(status));
        }

        if let Some(deposit_type) = filter.deposit_type {
            query = query.filter(deposits::Column::DepositType.eq(deposit_type));
        }

        let total = query.clone().count(&self.db).await?;
        let data = query
            .order_by_desc(deposits::Column::CreatedAt)
            .order_by_desc(deposits::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    /// Updates a deposit.
    ///
    /// A pending deposit has its creation effect reverted and the new one
    /// applied. A completed deposit accepts only contact and notes changes.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Deposit is not found
    /// - The payload fails validation
    /// - A completed deposit's type, amount or money source would change
    /// - The new creation effect would overdraw the money source
    /// - Database operation fails
    pub async fn update_deposit(
        &self,
        id: DepositId,
        input: DepositInput,
    ) -> Result<DepositChange, RepositoryError> {
        let validated = DepositService::validate(&input)?;

        let txn = self.db.begin().await?;
        let balances = BalanceStore::new(&txn);

        let existing = Self::lock_deposit(&txn, id).await?;
        let state = deposit_state(&existing)?;
        let update = DepositService::plan_update(&state, &validated)?;
        Self::ensure_references(&txn, &balances, &validated).await?;

        let reversal = match update {
            DepositUpdate::Repost => {
                let reversal = Self::revert(&balances, &state).await?;
                balances.move_money(Self::creation_movement(&validated)).await?;
                reversal
            }
            DepositUpdate::DetailsOnly => ReversalReport::default(),
        };

        let deposit = deposits::ActiveModel {
            id: Set(existing.id),
            status: Set(existing.status),
            completed_at: Set(existing.completed_at),
            created_at: Set(existing.created_at),
            ..Self::active_model(&validated)
        }
        .update(&txn)
        .await?;

        txn.commit().await?;

        info!(deposit_id = %id, update = ?update, "Deposit updated");

        Ok(DepositChange { deposit, reversal })
    }

    /// Reverts a deposit's creation effect (none once completed) and deletes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the deposit is not found or database operation fails.
    pub async fn delete_deposit(&self, id: DepositId) -> Result<DepositChange, RepositoryError> {
        let txn = self.db.begin().await?;
        let balances = BalanceStore::new(&txn);

        let existing = Self::lock_deposit(&txn, id).await?;
        let reversal = Self::revert(&balances, &deposit_state(&existing)?).await?;
        deposits::Entity::delete_by_id(existing.id).exec(&txn).await?;

        txn.commit().await?;

        info!(deposit_id = %id, "Deposit deleted");

        Ok(DepositChange {
            deposit: existing,
            reversal,
        })
    }

    /// Settles a pending deposit: applies its forward effect and completes it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Deposit is not found
    /// - Deposit is already completed
    /// - The forward effect would overdraw the money source
    /// - Database operation fails
    pub async fn pay_deposit(&self, id: DepositId) -> Result<deposits::Model, RepositoryError> {
        let txn = self.db.begin().await?;
        let balances = BalanceStore::new(&txn);

        let existing = Self::lock_deposit(&txn, id).await?;
        let state = deposit_state(&existing)?;
        let status = DepositService::pay(&state)?;

        balances
            .move_money(MoneyMovement {
                source: state.money_source,
                direction: state.deposit_type.settlement_direction(),
                amount: state.amount,
            })
            .await?;

        let now = Utc::now().into();
        let deposit = deposits::ActiveModel {
            id: Set(existing.id),
            status: Set(status.into()),
            completed_at: Set(Some(now)),
            updated_at: Set(now),
            ..Default::default()
        }
        .update(&txn)
        .await?;

        txn.commit().await?;

        info!(deposit_id = %id, amount = %state.amount, "Deposit paid");

        Ok(deposit)
    }

    // ========== Helpers ==========

    async fn lock_deposit(
        txn: &DatabaseTransaction,
        id: DepositId,
    ) -> Result<deposits::Model, RepositoryError> {
        Ok(with_row_lock(
            deposits::Entity::find_by_id(id.into_inner()),
            txn.get_database_backend(),
        )
        .one(txn)
        .await?
        .ok_or(PostingError::DepositNotFound(id))?)
    }

    async fn ensure_references(
        txn: &DatabaseTransaction,
        balances: &BalanceStore<'_>,
        deposit: &ValidatedDeposit,
    ) -> Result<(), RepositoryError> {
        balances.ensure_money_source(deposit.money_source).await?;
        if let Some(contact_id) = deposit.contact_id {
            contacts::Entity::find_by_id(contact_id.into_inner())
                .one(txn)
                .await?
                .ok_or(PostingError::ContactNotFound(contact_id))?;
        }
        Ok(())
    }

    async fn revert(
        balances: &BalanceStore<'_>,
        state: &DepositState,
    ) -> Result<ReversalReport, RepositoryError> {
        let Some(movement) = DepositService::outstanding_movement(state) else {
            return Ok(ReversalReport::default());
        };
        let plan = AdjustmentPlan {
            money: Some(movement),
            stock: None,
            equity: None,
        };
        balances.revert(&plan, state.id.into_inner()).await
    }

    fn creation_movement(deposit: &ValidatedDeposit) -> MoneyMovement {
        MoneyMovement {
            source: deposit.money_source,
            direction: deposit.deposit_type.creation_direction(),
            amount: deposit.amount,
        }
    }

    fn active_model(deposit: &ValidatedDeposit) -> deposits::ActiveModel {
        deposits::ActiveModel {
            deposit_type: Set(deposit.deposit_type.into()),
            amount: Set(deposit.amount.amount()),
            money_source: Set(deposit.money_source.kind().into()),
            bank_account_id: Set(deposit.money_source.bank_account_id().map(|id| id.into_inner())),
            cash_holder_id: Set(deposit.money_source.cash_holder_id().map(|id| id.into_inner())),
            contact_id: Set(deposit.contact_id.map(|id| id.into_inner())),
            notes: Set(deposit.notes.clone()),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        }
    }
}
