//! Master data repository: bank accounts, cash holders, products, contacts
//! and categories.
//!
//! Opening balances, stock and equity are set here once. After creation they
//! change only through postings and deposits.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tally_core::posting::{EquityEffect, PostingError};
use tally_shared::types::{
    BankAccountId, CashHolderId, CategoryId, ContactId, Money, PageRequest, PageResponse,
    ProductId,
};
use tracing::info;
use uuid::Uuid;

use super::error::RepositoryError;
use crate::entities::{
    bank_accounts, cash_holders, categories, contacts, products, sea_orm_active_enums::ContactType,
};

/// Input for creating a bank account.
#[derive(Debug, Clone)]
pub struct CreateBankAccountInput {
    /// Bank name.
    pub bank_name: String,
    /// Account number.
    pub account_number: Option<String>,
    /// Card number.
    pub card_number: Option<String>,
    /// IBAN.
    pub iban: Option<String>,
    /// Opening balance.
    pub opening_balance: Money,
}

/// Input for creating a cash holder.
#[derive(Debug, Clone)]
pub struct CreateCashHolderInput {
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Phone number.
    pub phone_number: Option<String>,
    /// Opening balance.
    pub opening_balance: Money,
}

/// Input for creating a product or service.
#[derive(Debug, Clone)]
pub struct CreateProductInput {
    /// Product code (must be unique).
    pub code: String,
    /// Display name.
    pub name: String,
    /// Selling price.
    pub selling_price: Money,
    /// Buying price.
    pub buying_price: Option<Money>,
    /// Opening stock, `None` for a service.
    pub opening_stock: Option<u32>,
}

/// Input for creating a contact.
#[derive(Debug, Clone)]
pub struct CreateContactInput {
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Phone number.
    pub phone_number: Option<String>,
    /// Contact type.
    pub contact_type: ContactType,
    /// Share percentage for shareholders.
    pub share_percentage: Option<Decimal>,
    /// Opening equity for shareholders.
    pub opening_equity: Option<Money>,
}

/// Input for creating a category.
#[derive(Debug, Clone)]
pub struct CreateCategoryInput {
    /// Category name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Parent category.
    pub parent_id: Option<CategoryId>,
    /// Equity effect; classified from the name when absent.
    pub equity_effect: Option<EquityEffect>,
}

/// Master data repository.
#[derive(Debug, Clone)]
pub struct MasterDataRepository {
    db: DatabaseConnection,
}

impl MasterDataRepository {
    /// Creates a new master data repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    // ========== Bank Accounts ==========

    /// Creates a bank account with its opening balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn create_bank_account(
        &self,
        input: CreateBankAccountInput,
    ) -> Result<bank_accounts::Model, RepositoryError> {
        let now = Utc::now().into();
        let account = bank_accounts::ActiveModel {
            id: Set(Uuid::now_v7()),
            bank_name: Set(input.bank_name),
            account_number: Set(input.account_number),
            card_number: Set(input.card_number),
            iban: Set(input.iban),
            balance: Set(input.opening_balance.amount()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        info!(bank_account_id = %account.id, balance = %account.balance, "Bank account created");
        Ok(account)
    }

    /// Gets a bank account by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is not found or database query fails.
    pub async fn get_bank_account(
        &self,
        id: BankAccountId,
    ) -> Result<bank_accounts::Model, RepositoryError> {
        Ok(bank_accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .ok_or(PostingError::BankAccountNotFound(id))?)
    }

    /// Lists bank accounts by bank name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_bank_accounts(
        &self,
        page: PageRequest,
    ) -> Result<PageResponse<bank_accounts::Model>, RepositoryError> {
        let query = bank_accounts::Entity::find();
        let total = query.clone().count(&self.db).await?;
        let data = query
            .order_by_asc(bank_accounts::Column::BankName)
            .order_by_asc(bank_accounts::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    // ========== Cash Holders ==========

    /// Creates a cash holder with its opening balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn create_cash_holder(
        &self,
        input: CreateCashHolderInput,
    ) -> Result<cash_holders::Model, RepositoryError> {
        let now = Utc::now().into();
        let holder = cash_holders::ActiveModel {
            id: Set(Uuid::now_v7()),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            phone_number: Set(input.phone_number),
            balance: Set(input.opening_balance.amount()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        info!(cash_holder_id = %holder.id, balance = %holder.balance, "Cash holder created");
        Ok(holder)
    }

    /// Gets a cash holder by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the cash holder is not found or database query fails.
    pub async fn get_cash_holder(
        &self,
        id: CashHolderId,
    ) -> Result<cash_holders::Model, RepositoryError> {
        Ok(cash_holders::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .ok_or(PostingError::CashHolderNotFound(id))?)
    }

    /// Lists cash holders by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_cash_holders(
        &self,
        page: PageRequest,
    ) -> Result<PageResponse<cash_holders::Model>, RepositoryError> {
        let query = cash_holders::Entity::find();
        let total = query.clone().count(&self.db).await?;
        let data = query
            .order_by_asc(cash_holders::Column::LastName)
            .order_by_asc(cash_holders::Column::FirstName)
            .order_by_asc(cash_holders::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    // ========== Products ==========

    /// Creates a product, or a service when no opening stock is given.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Another product already uses the code
    /// - Database operation fails
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<products::Model, RepositoryError> {
        let existing = products::Entity::find()
            .filter(products::Column::Code.eq(&input.code))
            .one(&self.db)
            .await?;

        if existing.is_some() {
            return Err(PostingError::DuplicateProductCode(input.code).into());
        }

        let now = Utc::now().into();
        let product = products::ActiveModel {
            id: Set(Uuid::now_v7()),
            code: Set(input.code),
            name: Set(input.name),
            selling_price: Set(input.selling_price.amount()),
            buying_price: Set(input.buying_price.map(Money::amount)),
            stock: Set(input.opening_stock.map(i64::from)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        info!(product_id = %product.id, code = %product.code, stock = ?product.stock, "Product created");
        Ok(product)
    }

    /// Gets a product by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or database query fails.
    pub async fn get_product(&self, id: ProductId) -> Result<products::Model, RepositoryError> {
        Ok(products::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .ok_or(PostingError::ProductNotFound(id))?)
    }

    /// Lists products by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_products(
        &self,
        page: PageRequest,
    ) -> Result<PageResponse<products::Model>, RepositoryError> {
        let query = products::Entity::find();
        let total = query.clone().count(&self.db).await?;
        let data = query
            .order_by_asc(products::Column::Code)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    // ========== Contacts ==========

    /// Creates a contact.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn create_contact(
        &self,
        input: CreateContactInput,
    ) -> Result<contacts::Model, RepositoryError> {
        let now = Utc::now().into();
        let contact = contacts::ActiveModel {
            id: Set(Uuid::now_v7()),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            phone_number: Set(input.phone_number),
            contact_type: Set(input.contact_type),
            share_percentage: Set(input.share_percentage),
            equity: Set(input.opening_equity.map(Money::amount)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        info!(contact_id = %contact.id, contact_type = ?contact.contact_type, "Contact created");
        Ok(contact)
    }

    /// Gets a contact by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the contact is not found or database query fails.
    pub async fn get_contact(&self, id: ContactId) -> Result<contacts::Model, RepositoryError> {
        Ok(contacts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .ok_or(PostingError::ContactNotFound(id))?)
    }

    /// Lists contacts by name, optionally of one type.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_contacts(
        &self,
        contact_type: Option<ContactType>,
        page: PageRequest,
    ) -> Result<PageResponse<contacts::Model>, RepositoryError> {
        let mut query = contacts::Entity::find();
        if let Some(contact_type) = contact_type {
            query = query.filter(contacts::Column::ContactType.eq(contact_type));
        }

        let total = query.clone().count(&self.db).await?;
        let data = query
            .order_by_asc(contacts::Column::LastName)
            .order_by_asc(contacts::Column::FirstName)
            .order_by_asc(contacts::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    // ========== Categories ==========

    /// Creates a category and fixes its equity effect.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Parent category is not found
    /// - Database operation fails
    pub async fn create_category(
        &self,
        input: CreateCategoryInput,
    ) -> Result<categories::Model, RepositoryError> {
        if let Some(parent_id) = input.parent_id {
            categories::Entity::find_by_id(parent_id.into_inner())
                .one(&self.db)
                .await?
                .ok_or(PostingError::CategoryNotFound(parent_id))?;
        }

        let equity_effect = input
            .equity_effect
            .unwrap_or_else(|| EquityEffect::classify_name(&input.name));

        let now = Utc::now().into();
        let category = categories::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(input.name),
            description: Set(input.description),
            parent_id: Set(input.parent_id.map(CategoryId::into_inner)),
            equity_effect: Set(equity_effect.into()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        info!(category_id = %category.id, equity_effect = ?equity_effect, "Category created");
        Ok(category)
    }

    /// Gets a category by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the category is not found or database query fails.
    pub async fn get_category(&self, id: CategoryId) -> Result<categories::Model, RepositoryError> {
        Ok(categories::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .ok_or(PostingError::CategoryNotFound(id))?)
    }

    /// Lists categories by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_categories(
        &self,
        page: PageRequest,
    ) -> Result<PageResponse<categories::Model>, RepositoryError> {
        let query = categories::Entity::find();
        let total = query.clone().count(&self.db).await?;
        let data = query
            .order_by_asc(categories::Column::Name)
            .order_by_asc(categories::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }
}
