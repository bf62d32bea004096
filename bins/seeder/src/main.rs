//! Development data seeder for Tally.
//!
//! Seeds a bank account, a cash holder, a few products and a service, a
//! shareholder and the equity categories. Running it twice is harmless:
//! seeding is skipped when the seed products already exist.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tally_core::posting::EquityEffect;
use tally_db::entities::{products, sea_orm_active_enums::ContactType};
use tally_db::repositories::{
    CreateBankAccountInput, CreateCashHolderInput, CreateCategoryInput, CreateContactInput,
    CreateProductInput, MasterDataRepository,
};
use tally_shared::AppConfig;
use tally_shared::types::Money;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Code of the first seed product, used to detect a seeded database.
const MARKER_PRODUCT_CODE: &str = "SEED-001";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let db = tally_db::connect_with(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    if already_seeded(&db).await? {
        info!("Seed data already present, skipping");
        return Ok(());
    }

    let repo = MasterDataRepository::new(db);
    seed_money_sources(&repo).await?;
    seed_products(&repo).await?;
    seed_shareholder(&repo).await?;
    seed_categories(&repo).await?;

    info!("Seeding complete");
    Ok(())
}

fn money(amount: i64) -> anyhow::Result<Money> {
    Money::new(Decimal::from(amount)).context("Seed amounts are non-negative")
}

async fn already_seeded(db: &DatabaseConnection) -> anyhow::Result<bool> {
    let marker = products::Entity::find()
        .filter(products::Column::Code.eq(MARKER_PRODUCT_CODE))
        .one(db)
        .await?;
    Ok(marker.is_some())
}

async fn seed_money_sources(repo: &MasterDataRepository) -> anyhow::Result<()> {
    repo.create_bank_account(CreateBankAccountInput {
        bank_name: "Main Bank".to_string(),
        account_number: Some("1000-2000-3000".to_string()),
        card_number: Some("6037991234567890".to_string()),
        iban: Some("IR000000000000000000000001".to_string()),
        opening_balance: money(5_000_000)?,
    })
    .await?;

    repo.create_cash_holder(CreateCashHolderInput {
        first_name: "Front".to_string(),
        last_name: "Desk".to_string(),
        phone_number: None,
        opening_balance: money(250_000)?,
    })
    .await?;

    Ok(())
}

async fn seed_products(repo: &MasterDataRepository) -> anyhow::Result<()> {
    let catalogue = [
        (MARKER_PRODUCT_CODE, "Printer paper A4", 120_000, Some(80_000), Some(50)),
        ("SEED-002", "Toner cartridge", 900_000, Some(650_000), Some(12)),
        ("SEED-003", "Installation service", 1_500_000, None, None),
    ];

    for (code, name, selling, buying, stock) in catalogue {
        repo.create_product(CreateProductInput {
            code: code.to_string(),
            name: name.to_string(),
            selling_price: money(selling)?,
            buying_price: buying.map(money).transpose()?,
            opening_stock: stock,
        })
        .await?;
    }

    Ok(())
}

async fn seed_shareholder(repo: &MasterDataRepository) -> anyhow::Result<()> {
    repo.create_contact(CreateContactInput {
        first_name: "Founding".to_string(),
        last_name: "Partner".to_string(),
        phone_number: None,
        contact_type: ContactType::Shareholder,
        share_percentage: Some(Decimal::from(100)),
        opening_equity: Some(money(5_000_000)?),
    })
    .await?;
    Ok(())
}

async fn seed_categories(repo: &MasterDataRepository) -> anyhow::Result<()> {
    let categories = [
        ("Increase equity", Some(EquityEffect::Increase)),
        ("Decrease equity", Some(EquityEffect::Decrease)),
        ("Sales", None),
        ("Supplies", None),
    ];

    for (name, equity_effect) in categories {
        repo.create_category(CreateCategoryInput {
            name: name.to_string(),
            description: None,
            parent_id: None,
            equity_effect,
        })
        .await?;
    }

    Ok(())
}
