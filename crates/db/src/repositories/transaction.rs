//! Transaction repository: posting, reversal and installment settlement.
//!
//! Every mutating operation runs in one database transaction. Balance rows
//! are locked as they are read, and any failure drops the transaction, which
//! rolls back every write made so far.

use chrono::{Duration, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tally_core::clock::Clock;
use tally_core::posting::{
    AdjustmentService, EntryValidator, InstallmentService, InstallmentState, PaymentAction,
    PostingEntry, PostingError, ProductLine, ReversalReport, ReversalService, TransactionInput,
    ValidatedTransaction,
};
use tally_shared::config::LedgerConfig;
use tally_shared::types::{
    CategoryId, ContactId, InstallmentId, PageRequest, PageResponse, ProductId, TransactionId,
};
use tracing::{debug, info};
use uuid::Uuid;

use super::balance::{stored_money, stored_money_source, with_row_lock, BalanceStore};
use super::error::RepositoryError;
use crate::entities::{contacts, installments, transaction_attachments, transactions};

/// Filter options for listing transactions.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Substring of the notes or the contact's first or last name, or the
    /// full transaction id.
    pub search: Option<String>,
    /// Filter by date range start.
    pub date_from: Option<NaiveDate>,
    /// Filter by date range end.
    pub date_to: Option<NaiveDate>,
}

/// Transaction with its installments and attachment metadata.
#[derive(Debug, Clone)]
pub struct TransactionDetails {
    /// Transaction row.
    pub transaction: transactions::Model,
    /// Installments in plan order.
    pub installments: Vec<installments::Model>,
    /// Attachment metadata.
    pub attachments: Vec<transaction_attachments::Model>,
}

/// Result of updating a transaction.
#[derive(Debug, Clone)]
pub struct UpdatedTransaction {
    /// State after the update.
    pub details: TransactionDetails,
    /// Clamps that occurred while reverting the old effect.
    pub reversal: ReversalReport,
    /// Files whose metadata was dropped by the update, to delete after commit.
    pub removed_attachment_paths: Vec<String>,
}

/// Result of deleting a transaction.
#[derive(Debug, Clone)]
pub struct DeletedTransaction {
    /// Deleted transaction.
    pub id: TransactionId,
    /// Clamps that occurred while reverting.
    pub reversal: ReversalReport,
    /// Files of the deleted attachments, to delete after commit.
    pub attachment_paths: Vec<String>,
}

/// Result of paying an installment.
#[derive(Debug, Clone)]
pub struct InstallmentPayment {
    /// Installment after the call.
    pub installment: installments::Model,
    /// Whether this call changed anything.
    pub newly_paid: bool,
    /// Whether the parent transaction is paid after the call.
    pub transaction_paid: bool,
}

/// An unpaid installment with its parent transaction.
#[derive(Debug, Clone)]
pub struct UpcomingInstallment {
    /// Installment.
    pub installment: installments::Model,
    /// Parent transaction.
    pub transaction: transactions::Model,
}

/// Upcoming installments ordered by due date.
#[derive(Debug, Clone)]
pub struct UpcomingInstallments {
    /// Installments, at most the requested limit.
    pub items: Vec<UpcomingInstallment>,
    /// Total matching installments regardless of limit.
    pub total: u64,
}

/// Window and limit for the upcoming installments query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpcomingQuery {
    /// How far ahead of now an installment counts as upcoming.
    pub window: Duration,
    /// Maximum number of installments returned.
    pub limit: u64,
}

impl TryFrom<&LedgerConfig> for UpcomingQuery {
    type Error = PostingError;

    fn try_from(config: &LedgerConfig) -> Result<Self, Self::Error> {
        let window = Duration::try_hours(config.upcoming_window_hours).ok_or_else(|| {
            PostingError::WindowOutOfRange(format!("{} hours", config.upcoming_window_hours))
        })?;
        Ok(Self {
            window,
            limit: config.upcoming_limit,
        })
    }
}

/// Same window and limit as the default `LedgerConfig`.
impl Default for UpcomingQuery {
    fn default() -> Self {
        Self {
            window: Duration::hours(48),
            limit: 10,
        }
    }
}

/// Rebuilds the balance-relevant part of a stored transaction.
fn posting_entry(model: &transactions::Model) -> Result<PostingEntry, RepositoryError> {
    let quantity = u32::try_from(model.quantity).map_err(|_| {
        PostingError::Internal(format!("transaction {} has a negative quantity", model.id))
    })?;
    Ok(PostingEntry {
        transaction_type: model.transaction_type.into(),
        amount: stored_money(model.amount, "amount")?,
        money_source: stored_money_source(
            model.money_source,
            model.bank_account_id,
            model.cash_holder_id,
        )?,
        product: model
            .product_id
            .filter(|_| quantity > 0)
            .map(|id| ProductLine {
                product_id: ProductId::from_uuid(id),
                quantity,
            }),
        contact_id: model.contact_id.map(ContactId::from_uuid),
        category_id: model.category_id.map(CategoryId::from_uuid),
    })
}

fn installment_state(model: &installments::Model) -> Result<InstallmentState, RepositoryError> {
    Ok(InstallmentState {
        id: InstallmentId::from_uuid(model.id),
        amount: stored_money(model.amount, "installment amount")?,
        is_paid: model.is_paid,
        due_date: model.due_date,
    })
}

fn installment_states(
    models: &[installments::Model],
) -> Result<Vec<InstallmentState>, RepositoryError> {
    models.iter().map(installment_state).collect()
}

/// Transaction repository for posting operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    db: DatabaseConnection,
}

impl TransactionRepository {
    /// Creates a new transaction repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Validates and posts a new transaction.
    ///
    /// A paid single payment settles its full amount. An installment plan
    /// moves stock now and money as installments are paid. An unpaid single
    /// payment is recorded without any balance effect.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The payload fails validation
    /// - A referenced record does not exist
    /// - A balance would go negative
    /// - Database operation fails
    pub async fn create_transaction(
        &self,
        input: TransactionInput,
    ) -> Result<TransactionDetails, RepositoryError> {
        let txn = self.db.begin().await?;
        let balances = BalanceStore::new(&txn);

        let validated = Self::validate(&balances, &input).await?;
        balances.ensure_references(&validated.entry).await?;

        let id = Uuid::now_v7();
        let now = Utc::now().into();
        let transaction = transactions::ActiveModel {
            id: Set(id),
            created_at: Set(now),
            ..Self::active_model(&validated)?
        }
        .insert(&txn)
        .await?;
        let installments = Self::insert_installments(&txn, id, &validated).await?;
        let attachments = Self::insert_attachments(&txn, id, &validated).await?;

        Self::apply_initial(&balances, &validated).await?;

        txn.commit().await?;

        info!(
            transaction_id = %id,
            transaction_type = %validated.entry.transaction_type,
            amount = %validated.entry.amount,
            installments = installments.len(),
            "Transaction created"
        );

        Ok(TransactionDetails {
            transaction,
            installments,
            attachments,
        })
    }

    /// Gets a transaction with its installments and attachments.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is not found or database query fails.
    pub async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<TransactionDetails, RepositoryError> {
        let transaction = transactions::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .ok_or(PostingError::TransactionNotFound(id))?;

        let installments = transaction
            .find_related(installments::Entity)
            .order_by_asc(installments::Column::Position)
            .all(&self.db)
            .await?;
        let attachments = transaction
            .find_related(transaction_attachments::Entity)
            .order_by_asc(transaction_attachments::Column::CreatedAt)
            .order_by_asc(transaction_attachments::Column::Id)
            .all(&self.db)
            .await?;

        Ok(TransactionDetails {
            transaction,
            installments,
            attachments,
        })
    }

    /// Lists transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_transactions(
        &self,
        filter: TransactionFilter,
        page: PageRequest,
    ) -> Result<PageResponse<transactions::Model>, RepositoryError> {
        let mut query = transactions::Entity::find();

        if let Some(search) = filter.search.filter(|s| !s.is_empty()) {
            query = query.left_join(contacts::Entity).filter(
                Condition::any()
                    .add(transactions::Column::Notes.contains(search.as_str()))
                    .add(contacts::Column::FirstName.contains(search.as_str()))
                    .add(contacts::Column::LastName.contains(search.as_str()))
                    .add_option(
                        Uuid::parse_str(search.trim())
                            .ok()
                            .map(|id| transactions::Column::Id.eq(id)),
                    ),
            );
        }

        if let Some(date_from) = filter.date_from {
            query = query.filter(transactions::Column::TransactionDate.gte(date_from));
        }

        if let Some(date_to) = filter.date_to {
            query = query.filter(transactions::Column::TransactionDate.lte(date_to));
        }

        let total = query.clone().count(&self.db).await?;
        let data = query
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    /// Replaces a transaction by reverting its old effect and posting the new one.
    ///
    /// The new payload is validated against the balances as they stand after
    /// the revert. Installments are recreated unpaid.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Transaction is not found
    /// - The payload fails validation
    /// - A balance would go negative when reapplying
    /// - Database operation fails
    pub async fn update_transaction(
        &self,
        id: TransactionId,
        input: TransactionInput,
    ) -> Result<UpdatedTransaction, RepositoryError> {
        let txn = self.db.begin().await?;
        let balances = BalanceStore::new(&txn);

        let existing = Self::lock_transaction(&txn, id).await?;
        let reversal = Self::revert_existing(&txn, &balances, &existing).await?;

        let validated = Self::validate(&balances, &input).await?;
        balances.ensure_references(&validated.entry).await?;

        let old_attachments = existing
            .find_related(transaction_attachments::Entity)
            .all(&txn)
            .await?;
        installments::Entity::delete_many()
            .filter(installments::Column::TransactionId.eq(existing.id))
            .exec(&txn)
            .await?;
        transaction_attachments::Entity::delete_many()
            .filter(transaction_attachments::Column::TransactionId.eq(existing.id))
            .exec(&txn)
            .await?;

        let transaction = transactions::ActiveModel {
            id: Set(existing.id),
            created_at: Set(existing.created_at),
            ..Self::active_model(&validated)?
        }
        .update(&txn)
        .await?;
        let installments = Self::insert_installments(&txn, existing.id, &validated).await?;
        let attachments = Self::insert_attachments(&txn, existing.id, &validated).await?;

        Self::apply_initial(&balances, &validated).await?;

        txn.commit().await?;

        let removed_attachment_paths = old_attachments
            .into_iter()
            .map(|a| a.file_path)
            .filter(|path| !attachments.iter().any(|a| &a.file_path == path))
            .collect();

        info!(
            transaction_id = %id,
            clamps = reversal.clamps.len(),
            "Transaction updated"
        );

        Ok(UpdatedTransaction {
            details: TransactionDetails {
                transaction,
                installments,
                attachments,
            },
            reversal,
            removed_attachment_paths,
        })
    }

    /// Reverts a transaction's effect and deletes it with its children.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is not found or database operation fails.
    pub async fn delete_transaction(
        &self,
        id: TransactionId,
    ) -> Result<DeletedTransaction, RepositoryError> {
        let txn = self.db.begin().await?;
        let balances = BalanceStore::new(&txn);

        let existing = Self::lock_transaction(&txn, id).await?;
        let reversal = Self::revert_existing(&txn, &balances, &existing).await?;

        let attachment_paths = existing
            .find_related(transaction_attachments::Entity)
            .all(&txn)
            .await?
            .into_iter()
            .map(|a| a.file_path)
            .collect();

        installments::Entity::delete_many()
            .filter(installments::Column::TransactionId.eq(existing.id))
            .exec(&txn)
            .await?;
        transaction_attachments::Entity::delete_many()
            .filter(transaction_attachments::Column::TransactionId.eq(existing.id))
            .exec(&txn)
            .await?;
        transactions::Entity::delete_by_id(existing.id)
            .exec(&txn)
            .await?;

        txn.commit().await?;

        info!(transaction_id = %id, clamps = reversal.clamps.len(), "Transaction deleted");

        Ok(DeletedTransaction {
            id,
            reversal,
            attachment_paths,
        })
    }

    /// Pays one installment and settles its amount.
    ///
    /// Paying an installment that is already paid changes nothing. Paying the
    /// last unpaid installment marks the transaction paid.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Installment or transaction is not found
    /// - An outflow would overdraw the money source
    /// - Database operation fails
    pub async fn pay_installment(
        &self,
        id: InstallmentId,
    ) -> Result<InstallmentPayment, RepositoryError> {
        let txn = self.db.begin().await?;
        let balances = BalanceStore::new(&txn);

        // Parent first, then its installments: the same order update and
        // delete take their locks in.
        let parent_id = installments::Entity::find_by_id(id.into_inner())
            .one(&txn)
            .await?
            .ok_or(PostingError::InstallmentNotFound(id))?
            .transaction_id;
        let parent = Self::lock_transaction(&txn, TransactionId::from_uuid(parent_id))
            .await
            .map_err(|err| match err.as_posting() {
                Some(PostingError::TransactionNotFound(_)) => {
                    PostingError::InstallmentNotFound(id).into()
                }
                _ => err,
            })?;
        let plan = with_row_lock(
            parent
                .find_related(installments::Entity)
                .order_by_asc(installments::Column::Position),
            txn.get_database_backend(),
        )
        .all(&txn)
        .await?;
        let installment = plan
            .iter()
            .find(|i| i.id == id.into_inner())
            .cloned()
            .ok_or(PostingError::InstallmentNotFound(id))?;

        match InstallmentService::pay(id, &installment_states(&plan)?)? {
            PaymentAction::AlreadyPaid => {
                debug!(installment_id = %id, "Installment already paid");
                Ok(InstallmentPayment {
                    installment,
                    newly_paid: false,
                    transaction_paid: parent.is_paid,
                })
            }
            PaymentAction::Settle {
                amount,
                completes_parent,
            } => {
                let now = Utc::now().into();
                let installment = installments::ActiveModel {
                    id: Set(installment.id),
                    is_paid: Set(true),
                    paid_at: Set(Some(now)),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .update(&txn)
                .await?;

                let entry = posting_entry(&parent)?;
                balances
                    .apply(&AdjustmentService::plan(&entry, amount, true))
                    .await?;

                if completes_parent {
                    transactions::ActiveModel {
                        id: Set(parent.id),
                        is_paid: Set(true),
                        updated_at: Set(now),
                        ..Default::default()
                    }
                    .update(&txn)
                    .await?;
                }

                txn.commit().await?;

                info!(
                    installment_id = %id,
                    transaction_id = %parent.id,
                    amount = %amount,
                    completes_parent,
                    "Installment paid"
                );

                Ok(InstallmentPayment {
                    installment,
                    newly_paid: true,
                    transaction_paid: parent.is_paid || completes_parent,
                })
            }
        }
    }

    /// Lists unpaid installments due on or before `now + window`, soonest first.
    ///
    /// Overdue installments are included.
    ///
    /// # Errors
    ///
    /// Returns an error if the window reaches past the calendar or the
    /// database query fails.
    pub async fn upcoming_installments(
        &self,
        clock: &dyn Clock,
        query: UpcomingQuery,
    ) -> Result<UpcomingInstallments, RepositoryError> {
        let cutoff = InstallmentService::upcoming_cutoff(clock.now(), query.window)?;

        let select = installments::Entity::find()
            .filter(installments::Column::IsPaid.eq(false))
            .filter(installments::Column::DueDate.is_not_null())
            .filter(installments::Column::DueDate.lte(cutoff));

        let total = select.clone().count(&self.db).await?;
        let rows = select
            .find_also_related(transactions::Entity)
            .order_by_asc(installments::Column::DueDate)
            .order_by_asc(installments::Column::Position)
            .limit(query.limit)
            .all(&self.db)
            .await?;

        let items = rows
            .into_iter()
            .map(|(installment, transaction)| {
                transaction
                    .map(|transaction| UpcomingInstallment {
                        installment,
                        transaction,
                    })
                    .ok_or_else(|| {
                        PostingError::Internal("installment without transaction".to_string())
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(UpcomingInstallments { items, total })
    }

    // ========== Helpers ==========

    async fn validate(
        balances: &BalanceStore<'_>,
        input: &TransactionInput,
    ) -> Result<ValidatedTransaction, RepositoryError> {
        let product = match input.product_id {
            Some(product_id) => balances.stock_level(product_id).await?,
            None => None,
        };
        Ok(EntryValidator::validate_transaction(input, product.as_ref())?)
    }

    async fn apply_initial(
        balances: &BalanceStore<'_>,
        validated: &ValidatedTransaction,
    ) -> Result<(), RepositoryError> {
        if let Some(settlement) = AdjustmentService::initial_settlement(validated) {
            balances
                .apply(&AdjustmentService::plan(&validated.entry, settlement, false))
                .await?;
        }
        Ok(())
    }

    async fn lock_transaction(
        txn: &DatabaseTransaction,
        id: TransactionId,
    ) -> Result<transactions::Model, RepositoryError> {
        Ok(with_row_lock(
            transactions::Entity::find_by_id(id.into_inner()),
            txn.get_database_backend(),
        )
        .one(txn)
        .await?
        .ok_or(PostingError::TransactionNotFound(id))?)
    }

    async fn revert_existing(
        txn: &DatabaseTransaction,
        balances: &BalanceStore<'_>,
        existing: &transactions::Model,
    ) -> Result<ReversalReport, RepositoryError> {
        let plan = existing
            .find_related(installments::Entity)
            .all(txn)
            .await?;
        let entry = posting_entry(existing)?;
        let reversal = ReversalService::plan(&entry, existing.is_paid, &installment_states(&plan)?)?;
        balances.revert(&reversal, existing.id).await
    }

    fn active_model(
        validated: &ValidatedTransaction,
    ) -> Result<transactions::ActiveModel, RepositoryError> {
        let entry = &validated.entry;
        let quantity = match entry.product {
            Some(line) => i32::try_from(line.quantity)
                .map_err(|_| PostingError::Internal(format!("quantity {} is too large", line.quantity)))?,
            None => 0,
        };
        Ok(transactions::ActiveModel {
            transaction_type: Set(entry.transaction_type.into()),
            amount: Set(entry.amount.amount()),
            money_source: Set(entry.money_source.kind().into()),
            bank_account_id: Set(entry.money_source.bank_account_id().map(|id| id.into_inner())),
            cash_holder_id: Set(entry.money_source.cash_holder_id().map(|id| id.into_inner())),
            product_id: Set(validated.product_id.map(|id| id.into_inner())),
            quantity: Set(quantity),
            contact_id: Set(entry.contact_id.map(|id| id.into_inner())),
            category_id: Set(entry.category_id.map(|id| id.into_inner())),
            payment_method: Set(validated.payment_method.map(Into::into)),
            is_paid: Set(validated.is_paid),
            transaction_date: Set(validated.transaction_date),
            due_date: Set(validated.due_date),
            notes: Set(validated.notes.clone()),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        })
    }

    async fn insert_installments(
        txn: &DatabaseTransaction,
        transaction_id: Uuid,
        validated: &ValidatedTransaction,
    ) -> Result<Vec<installments::Model>, RepositoryError> {
        let now = Utc::now().into();
        let mut inserted = Vec::with_capacity(validated.installments.len());
        for (position, installment) in (0_i32..).zip(&validated.installments) {
            let model = installments::ActiveModel {
                id: Set(Uuid::now_v7()),
                transaction_id: Set(transaction_id),
                position: Set(position),
                amount: Set(installment.amount.amount()),
                due_date: Set(installment.due_date),
                is_paid: Set(false),
                paid_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(txn)
            .await?;
            inserted.push(model);
        }
        Ok(inserted)
    }

    async fn insert_attachments(
        txn: &DatabaseTransaction,
        transaction_id: Uuid,
        validated: &ValidatedTransaction,
    ) -> Result<Vec<transaction_attachments::Model>, RepositoryError> {
        let now = Utc::now().into();
        let mut inserted = Vec::with_capacity(validated.attachments.len());
        for attachment in &validated.attachments {
            let model = transaction_attachments::ActiveModel {
                id: Set(Uuid::now_v7()),
                transaction_id: Set(transaction_id),
                file_name: Set(attachment.file_name.clone()),
                file_path: Set(attachment.file_path.clone()),
                created_at: Set(now),
            }
            .insert(txn)
            .await?;
            inserted.push(model);
        }
        Ok(inserted)
    }
}
