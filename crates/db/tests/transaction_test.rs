//! Integration tests for posting, updating and deleting transactions.

mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};
use tally_core::posting::{
    ClampWarning, ClampedBalance, ErrorKind, InstallmentInput, MoneySource, MoneySourceInput,
    PaymentMethod, PostingError,
};
use tally_db::entities::{bank_accounts, installments, transaction_attachments, transactions};
use tally_db::repositories::{RepositoryError, TransactionFilter, TransactionRepository};
use tally_shared::types::{PageRequest, ProductId, TransactionId};

use common::{
    attachment, bank_balance, cash_balance, entry, equity, installments as plan, seed_bank,
    seed_cash, seed_category, seed_product, seed_shareholder, setup_db, stock,
};

// ============================================================================
// Scenario A: expense against a bank account, then delete
// ============================================================================

#[tokio::test]
async fn test_expense_then_delete_restores_bank_balance() {
    let db = setup_db().await;
    let bank = seed_bank(&db, dec!(150)).await;
    let repo = TransactionRepository::new(db.clone());

    let created = repo
        .create_transaction(entry("expense", 100, MoneySourceInput::bank(bank)))
        .await
        .expect("Expense should post");
    assert_eq!(bank_balance(&db, bank).await, dec!(50));
    assert!(created.transaction.is_paid);

    let deleted = repo
        .delete_transaction(TransactionId::from_uuid(created.transaction.id))
        .await
        .expect("Delete should succeed");
    assert!(deleted.reversal.is_clean());
    assert_eq!(bank_balance(&db, bank).await, dec!(150));
    assert_eq!(transactions::Entity::find().count(&db).await.unwrap(), 0);
}

// ============================================================================
// Scenario C: expense larger than the cash on hand
// ============================================================================

#[tokio::test]
async fn test_expense_over_cash_balance_is_rejected() {
    let db = setup_db().await;
    let cash = seed_cash(&db, dec!(50)).await;
    let repo = TransactionRepository::new(db.clone());

    let err = repo
        .create_transaction(entry("expense", 200, MoneySourceInput::cash(cash)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RepositoryError::Posting(PostingError::InsufficientFunds { money_source, .. })
            if money_source == MoneySource::Cash(cash)
    ));
    assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
    assert_eq!(cash_balance(&db, cash).await, dec!(50));
    assert_eq!(transactions::Entity::find().count(&db).await.unwrap(), 0);
}

// ============================================================================
// Scenario E: sales against tracked stock
// ============================================================================

#[tokio::test]
async fn test_sale_beyond_stock_is_rejected() {
    let db = setup_db().await;
    let bank = seed_bank(&db, dec!(0)).await;
    let product = seed_product(&db, "P-100", Some(5)).await;
    let repo = TransactionRepository::new(db.clone());

    let mut sale = entry("income", 90, MoneySourceInput::bank(bank));
    sale.product_id = Some(product);
    sale.quantity = 3;

    repo.create_transaction(sale.clone())
        .await
        .expect("First sale should post");
    assert_eq!(stock(&db, product).await, Some(2));
    assert_eq!(bank_balance(&db, bank).await, dec!(90));

    let err = repo.create_transaction(sale).await.unwrap_err();
    assert_eq!(
        err.as_posting(),
        Some(&PostingError::StockUnavailable {
            product_id: product,
            available: 2,
            requested: 3,
        })
    );
    assert_eq!(stock(&db, product).await, Some(2));
    assert_eq!(bank_balance(&db, bank).await, dec!(90));
}

#[tokio::test]
async fn test_purchase_increases_stock_and_delete_reverts_it() {
    let db = setup_db().await;
    let bank = seed_bank(&db, dec!(1000)).await;
    let product = seed_product(&db, "P-200", Some(4)).await;
    let repo = TransactionRepository::new(db.clone());

    let mut purchase = entry("expense", 600, MoneySourceInput::bank(bank));
    purchase.product_id = Some(product);
    purchase.quantity = 30;

    let created = repo.create_transaction(purchase).await.unwrap();
    assert_eq!(stock(&db, product).await, Some(34));
    assert_eq!(bank_balance(&db, bank).await, dec!(400));

    repo.delete_transaction(TransactionId::from_uuid(created.transaction.id))
        .await
        .unwrap();
    assert_eq!(stock(&db, product).await, Some(4));
    assert_eq!(bank_balance(&db, bank).await, dec!(1000));
}

#[tokio::test]
async fn test_service_sale_leaves_stock_untracked() {
    let db = setup_db().await;
    let bank = seed_bank(&db, dec!(0)).await;
    let service = seed_product(&db, "S-1", None).await;
    let repo = TransactionRepository::new(db.clone());

    let mut sale = entry("income", 120, MoneySourceInput::bank(bank));
    sale.product_id = Some(service);
    sale.quantity = 2;

    repo.create_transaction(sale).await.unwrap();
    assert_eq!(stock(&db, service).await, None);
    assert_eq!(bank_balance(&db, bank).await, dec!(120));
}

// ============================================================================
// Validation and references
// ============================================================================

#[tokio::test]
async fn test_unpaid_single_payment_has_no_effect() {
    let db = setup_db().await;
    let bank = seed_bank(&db, dec!(150)).await;
    let repo = TransactionRepository::new(db.clone());

    let mut bill = entry("expense", 100, MoneySourceInput::bank(bank));
    bill.is_paid = false;

    let created = repo.create_transaction(bill).await.unwrap();
    assert!(!created.transaction.is_paid);
    assert_eq!(bank_balance(&db, bank).await, dec!(150));

    let deleted = repo
        .delete_transaction(TransactionId::from_uuid(created.transaction.id))
        .await
        .unwrap();
    assert!(deleted.reversal.is_clean());
    assert_eq!(bank_balance(&db, bank).await, dec!(150));
}

#[tokio::test]
async fn test_installment_mismatch_writes_nothing() {
    let db = setup_db().await;
    let bank = seed_bank(&db, dec!(0)).await;
    let repo = TransactionRepository::new(db.clone());

    let mut split = entry("income", 90, MoneySourceInput::bank(bank));
    split.installments = plan(&[30, 30]);

    let err = repo.create_transaction(split).await.unwrap_err();
    assert_eq!(
        err.as_posting(),
        Some(&PostingError::InstallmentMismatch {
            expected: dec!(90),
            actual: dec!(60),
        })
    );
    assert_eq!(err.http_status_code(), 400);
    assert_eq!(transactions::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(installments::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_missing_money_source_reference_is_rejected() {
    let db = setup_db().await;
    let repo = TransactionRepository::new(db.clone());

    let input = entry(
        "expense",
        10,
        MoneySourceInput {
            kind: "bank".to_string(),
            ..Default::default()
        },
    );
    let err = repo.create_transaction(input).await.unwrap_err();
    assert_eq!(err.as_posting(), Some(&PostingError::MissingBankAccount));
}

#[tokio::test]
async fn test_unknown_bank_account_is_not_found() {
    let db = setup_db().await;
    let repo = TransactionRepository::new(db.clone());
    let bank = tally_shared::types::BankAccountId::new();

    let err = repo
        .create_transaction(entry("income", 10, MoneySourceInput::bank(bank)))
        .await
        .unwrap_err();
    assert_eq!(err.as_posting(), Some(&PostingError::BankAccountNotFound(bank)));
    assert_eq!(err.http_status_code(), 404);
}

#[tokio::test]
async fn test_get_and_delete_missing_transaction() {
    let db = setup_db().await;
    let repo = TransactionRepository::new(db);
    let id = TransactionId::new();

    let err = repo.get_transaction(id).await.unwrap_err();
    assert_eq!(err.as_posting(), Some(&PostingError::TransactionNotFound(id)));

    let err = repo.delete_transaction(id).await.unwrap_err();
    assert_eq!(err.as_posting(), Some(&PostingError::TransactionNotFound(id)));
}

// ============================================================================
// Update: revert then reapply
// ============================================================================

#[tokio::test]
async fn test_update_switches_money_source() {
    let db = setup_db().await;
    let bank = seed_bank(&db, dec!(150)).await;
    let cash = seed_cash(&db, dec!(0)).await;
    let repo = TransactionRepository::new(db.clone());

    let created = repo
        .create_transaction(entry("expense", 100, MoneySourceInput::bank(bank)))
        .await
        .unwrap();
    assert_eq!(bank_balance(&db, bank).await, dec!(50));

    let updated = repo
        .update_transaction(
            TransactionId::from_uuid(created.transaction.id),
            entry("income", 40, MoneySourceInput::cash(cash)),
        )
        .await
        .expect("Update should succeed");

    assert!(updated.reversal.is_clean());
    assert_eq!(updated.details.transaction.id, created.transaction.id);
    assert_eq!(updated.details.transaction.bank_account_id, None);
    assert_eq!(bank_balance(&db, bank).await, dec!(150));
    assert_eq!(cash_balance(&db, cash).await, dec!(40));
}

#[tokio::test]
async fn test_update_validates_against_reverted_balance() {
    let db = setup_db().await;
    let bank = seed_bank(&db, dec!(150)).await;
    let repo = TransactionRepository::new(db.clone());

    let created = repo
        .create_transaction(entry("expense", 100, MoneySourceInput::bank(bank)))
        .await
        .unwrap();

    // 140 exceeds the current 50 but not the 150 available once the old expense is undone.
    repo.update_transaction(
        TransactionId::from_uuid(created.transaction.id),
        entry("expense", 140, MoneySourceInput::bank(bank)),
    )
    .await
    .expect("Update should succeed");
    assert_eq!(bank_balance(&db, bank).await, dec!(10));
}

#[tokio::test]
async fn test_failed_update_rolls_back_the_revert() {
    let db = setup_db().await;
    let bank = seed_bank(&db, dec!(150)).await;
    let repo = TransactionRepository::new(db.clone());

    let created = repo
        .create_transaction(entry("expense", 100, MoneySourceInput::bank(bank)))
        .await
        .unwrap();
    let id = TransactionId::from_uuid(created.transaction.id);

    let err = repo
        .update_transaction(id, entry("expense", 200, MoneySourceInput::bank(bank)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientBalance);

    assert_eq!(bank_balance(&db, bank).await, dec!(50));
    let stored = repo.get_transaction(id).await.unwrap();
    assert_eq!(stored.transaction.amount, dec!(100));
}

#[tokio::test]
async fn test_update_to_installment_plan_recreates_installments_unpaid() {
    let db = setup_db().await;
    let bank = seed_bank(&db, dec!(0)).await;
    let repo = TransactionRepository::new(db.clone());

    let created = repo
        .create_transaction(entry("income", 90, MoneySourceInput::bank(bank)))
        .await
        .unwrap();
    assert_eq!(bank_balance(&db, bank).await, dec!(90));

    let mut split = entry("income", 90, MoneySourceInput::bank(bank));
    split.payment_method = Some(PaymentMethod::Installment);
    split.installments = plan(&[45, 45]);

    let updated = repo
        .update_transaction(TransactionId::from_uuid(created.transaction.id), split)
        .await
        .unwrap();

    assert!(!updated.details.transaction.is_paid);
    assert_eq!(updated.details.installments.len(), 2);
    assert!(updated.details.installments.iter().all(|i| !i.is_paid));
    assert_eq!(bank_balance(&db, bank).await, dec!(0));
}

// ============================================================================
// Attachments
// ============================================================================

#[tokio::test]
async fn test_attachment_paths_reported_for_cleanup() {
    let db = setup_db().await;
    let bank = seed_bank(&db, dec!(500)).await;
    let repo = TransactionRepository::new(db.clone());

    let mut receipt = entry("expense", 100, MoneySourceInput::bank(bank));
    receipt.attachments = vec![attachment("invoice.pdf"), attachment("photo.jpg")];
    let created = repo.create_transaction(receipt.clone()).await.unwrap();
    assert_eq!(created.attachments.len(), 2);
    let id = TransactionId::from_uuid(created.transaction.id);

    receipt.attachments = vec![attachment("invoice.pdf"), attachment("scan.png")];
    let updated = repo.update_transaction(id, receipt).await.unwrap();
    assert_eq!(
        updated.removed_attachment_paths,
        vec!["attachments/photo.jpg".to_string()]
    );
    assert_eq!(updated.details.attachments.len(), 2);

    let deleted = repo.delete_transaction(id).await.unwrap();
    let mut paths = deleted.attachment_paths;
    paths.sort();
    assert_eq!(
        paths,
        vec![
            "attachments/invoice.pdf".to_string(),
            "attachments/scan.png".to_string()
        ]
    );
    assert_eq!(
        transaction_attachments::Entity::find().count(&db).await.unwrap(),
        0
    );
}

// ============================================================================
// Equity
// ============================================================================

#[tokio::test]
async fn test_share_transactions_move_equity() {
    let db = setup_db().await;
    let bank = seed_bank(&db, dec!(0)).await;
    let shareholder = seed_shareholder(&db, Some(dec!(1000))).await;
    let increase = seed_category(&db, "Increase equity", None).await;
    let decrease = seed_category(&db, "کاهش سهام", None).await;
    let repo = TransactionRepository::new(db.clone());

    let mut contribution = entry("share", 500, MoneySourceInput::bank(bank));
    contribution.contact_id = Some(shareholder);
    contribution.category_id = Some(increase);
    let contribution = repo.create_transaction(contribution).await.unwrap();
    assert_eq!(bank_balance(&db, bank).await, dec!(500));
    assert_eq!(equity(&db, shareholder).await, Some(dec!(1500)));

    let mut withdrawal = entry("share_reduction", 200, MoneySourceInput::bank(bank));
    withdrawal.contact_id = Some(shareholder);
    withdrawal.category_id = Some(decrease);
    let withdrawal = repo.create_transaction(withdrawal).await.unwrap();
    assert_eq!(bank_balance(&db, bank).await, dec!(300));
    assert_eq!(equity(&db, shareholder).await, Some(dec!(1300)));

    repo.delete_transaction(TransactionId::from_uuid(withdrawal.transaction.id))
        .await
        .unwrap();
    repo.delete_transaction(TransactionId::from_uuid(contribution.transaction.id))
        .await
        .unwrap();
    assert_eq!(bank_balance(&db, bank).await, dec!(0));
    assert_eq!(equity(&db, shareholder).await, Some(dec!(1000)));
}

#[tokio::test]
async fn test_equity_decrease_beyond_equity_rolls_back_money() {
    let db = setup_db().await;
    let bank = seed_bank(&db, dec!(1000)).await;
    let shareholder = seed_shareholder(&db, Some(dec!(100))).await;
    let decrease = seed_category(&db, "Decrease equity", None).await;
    let repo = TransactionRepository::new(db.clone());

    let mut withdrawal = entry("share_reduction", 200, MoneySourceInput::bank(bank));
    withdrawal.contact_id = Some(shareholder);
    withdrawal.category_id = Some(decrease);

    let err = repo.create_transaction(withdrawal).await.unwrap_err();
    assert!(matches!(
        err.as_posting(),
        Some(PostingError::InsufficientEquity { contact_id, .. }) if *contact_id == shareholder
    ));
    assert_eq!(bank_balance(&db, bank).await, dec!(1000));
    assert_eq!(equity(&db, shareholder).await, Some(dec!(100)));
}

#[tokio::test]
async fn test_equity_starts_from_zero_when_untracked() {
    let db = setup_db().await;
    let bank = seed_bank(&db, dec!(0)).await;
    let shareholder = seed_shareholder(&db, None).await;
    let increase = seed_category(&db, "افزایش سهام", None).await;
    let repo = TransactionRepository::new(db.clone());

    let mut contribution = entry("share", 300, MoneySourceInput::bank(bank));
    contribution.contact_id = Some(shareholder);
    contribution.category_id = Some(increase);
    repo.create_transaction(contribution).await.unwrap();

    assert_eq!(equity(&db, shareholder).await, Some(dec!(300)));
}

#[tokio::test]
async fn test_plain_category_leaves_equity_alone() {
    let db = setup_db().await;
    let bank = seed_bank(&db, dec!(0)).await;
    let shareholder = seed_shareholder(&db, Some(dec!(50))).await;
    let office = seed_category(&db, "Office supplies", None).await;
    let repo = TransactionRepository::new(db.clone());

    let mut sale = entry("income", 300, MoneySourceInput::bank(bank));
    sale.contact_id = Some(shareholder);
    sale.category_id = Some(office);
    repo.create_transaction(sale).await.unwrap();

    assert_eq!(equity(&db, shareholder).await, Some(dec!(50)));
    assert_eq!(bank_balance(&db, bank).await, dec!(300));
}

// ============================================================================
// Clamp on reversal
// ============================================================================

#[tokio::test]
async fn test_delete_clamps_balance_edited_outside_the_engine() {
    let db = setup_db().await;
    let bank = seed_bank(&db, dec!(0)).await;
    let repo = TransactionRepository::new(db.clone());

    let created = repo
        .create_transaction(entry("income", 100, MoneySourceInput::bank(bank)))
        .await
        .unwrap();
    assert_eq!(bank_balance(&db, bank).await, dec!(100));

    bank_accounts::ActiveModel {
        id: Set(bank.into_inner()),
        balance: Set(dec!(30)),
        ..Default::default()
    }
    .update(&db)
    .await
    .unwrap();

    let deleted = repo
        .delete_transaction(TransactionId::from_uuid(created.transaction.id))
        .await
        .expect("Reversal never fails on a short balance");

    assert_eq!(bank_balance(&db, bank).await, Decimal::ZERO);
    assert_eq!(
        deleted.reversal.clamps,
        vec![ClampWarning {
            balance: ClampedBalance::Money(MoneySource::Bank(bank)),
            shortfall: dec!(70),
        }]
    );
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_list_transactions_filters_and_paginates() {
    let db = setup_db().await;
    let bank = seed_bank(&db, dec!(1000)).await;
    let repo = TransactionRepository::new(db.clone());

    for (amount, notes) in [(10, "office rent"), (20, "coffee"), (30, "warehouse rent")] {
        let mut input = entry("expense", amount, MoneySourceInput::bank(bank));
        input.notes = Some(notes.to_string());
        repo.create_transaction(input).await.unwrap();
    }

    let rent = repo
        .list_transactions(
            TransactionFilter {
                search: Some("rent".to_string()),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(rent.meta.total, 2);
    assert!(rent
        .data
        .iter()
        .all(|t| t.notes.as_deref().is_some_and(|n| n.contains("rent"))));

    let first_page = repo
        .list_transactions(
            TransactionFilter::default(),
            PageRequest {
                page: 1,
                per_page: 2,
            },
        )
        .await
        .unwrap();
    assert_eq!(first_page.data.len(), 2);
    assert_eq!(first_page.meta.total, 3);
    assert_eq!(first_page.meta.total_pages, 2);
}

#[tokio::test]
async fn test_list_transactions_matches_contact_name_and_id() {
    let db = setup_db().await;
    let bank = seed_bank(&db, dec!(1000)).await;
    let contact = seed_shareholder(&db, None).await;
    let repo = TransactionRepository::new(db.clone());

    let mut billed = entry("expense", 10, MoneySourceInput::bank(bank));
    billed.contact_id = Some(contact);
    let billed = repo.create_transaction(billed).await.unwrap();
    let other = repo
        .create_transaction(entry("expense", 20, MoneySourceInput::bank(bank)))
        .await
        .unwrap();

    for search in ["Reza", "Karimi"] {
        let found = repo
            .list_transactions(
                TransactionFilter {
                    search: Some(search.to_string()),
                    ..Default::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(found.meta.total, 1, "search {search}");
        assert_eq!(found.data[0].id, billed.transaction.id);
    }

    let by_id = repo
        .list_transactions(
            TransactionFilter {
                search: Some(other.transaction.id.to_string()),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(by_id.meta.total, 1);
    assert_eq!(by_id.data[0].id, other.transaction.id);
}

// ============================================================================
// Product references and precision
// ============================================================================

#[tokio::test]
async fn test_zero_quantity_keeps_product_reference() {
    let db = setup_db().await;
    let bank = seed_bank(&db, dec!(0)).await;
    let product = seed_product(&db, "P-400", Some(5)).await;
    let repo = TransactionRepository::new(db.clone());

    let mut input = entry("income", 40, MoneySourceInput::bank(bank));
    input.product_id = Some(product);
    let created = repo.create_transaction(input).await.unwrap();

    let stored = repo
        .get_transaction(TransactionId::from_uuid(created.transaction.id))
        .await
        .unwrap();
    assert_eq!(stored.transaction.product_id, Some(product.into_inner()));
    assert_eq!(stored.transaction.quantity, 0);
    assert_eq!(stock(&db, product).await, Some(5));
    assert_eq!(bank_balance(&db, bank).await, dec!(40));
}

#[tokio::test]
async fn test_unknown_product_rejected_without_quantity() {
    let db = setup_db().await;
    let bank = seed_bank(&db, dec!(0)).await;
    let repo = TransactionRepository::new(db.clone());
    let product = ProductId::new();

    let mut input = entry("income", 40, MoneySourceInput::bank(bank));
    input.product_id = Some(product);
    let err = repo.create_transaction(input).await.unwrap_err();
    assert_eq!(err.as_posting(), Some(&PostingError::ProductNotFound(product)));
    assert_eq!(transactions::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_installments_beyond_money_precision_write_nothing() {
    let db = setup_db().await;
    let bank = seed_bank(&db, dec!(0)).await;
    let repo = TransactionRepository::new(db.clone());

    let mut input = entry("income", 100, MoneySourceInput::bank(bank));
    input.installments = vec![dec!(33.33335), dec!(33.33335), dec!(33.3333)]
        .into_iter()
        .map(|amount| InstallmentInput {
            amount,
            due_date: None,
        })
        .collect();
    let err = repo.create_transaction(input).await.unwrap_err();

    assert_eq!(
        err.as_posting(),
        Some(&PostingError::ExcessivePrecision(dec!(33.33335)))
    );
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(transactions::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(installments::Entity::find().count(&db).await.unwrap(), 0);
}
