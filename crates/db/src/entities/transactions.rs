//! `SeaORM` Entity for transactions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{MoneySourceKind, PaymentMethod, TransactionType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub transaction_type: TransactionType,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    pub money_source: MoneySourceKind,
    pub bank_account_id: Option<Uuid>,
    pub cash_holder_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub quantity: i32,
    pub contact_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub payment_method: Option<PaymentMethod>,
    pub is_paid: bool,
    pub transaction_date: Option<Date>,
    pub due_date: Option<Date>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::contacts::Entity",
        from = "Column::ContactId",
        to = "super::contacts::Column::Id"
    )]
    Contacts,
    #[sea_orm(has_many = "super::installments::Entity")]
    Installments,
    #[sea_orm(has_many = "super::transaction_attachments::Entity")]
    TransactionAttachments,
}

impl Related<super::contacts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contacts.def()
    }
}

impl Related<super::installments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Installments.def()
    }
}

impl Related<super::transaction_attachments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionAttachments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
