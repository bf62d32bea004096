//! Property-based tests for forward adjustments and their reversal.
//!
//! - Round trip: applying then reverting a movement restores the balance exactly
//! - Non-negativity: an outflow fails instead of driving a balance below zero
//! - Settlement: a plan reverts by exactly the amount that was paid

use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::{
    BankAccountId, CashHolderId, CategoryId, ContactId, InstallmentId, Money, ProductId,
};

use super::adjustment::AdjustmentService;
use super::error::PostingError;
use super::installment::InstallmentState;
use super::reversal::ReversalService;
use super::types::{Direction, EquityEffect, MoneySource, PostingEntry, TransactionType};

/// Strategy to generate balances from 0.00 to 1,000,000.00.
fn balance() -> impl Strategy<Value = Money> {
    (0i64..100_000_000i64).prop_map(|cents| Money::new(Decimal::new(cents, 2)).unwrap())
}

/// Strategy to generate positive amounts from 0.01 to 1,000,000.00.
fn positive_amount() -> impl Strategy<Value = Money> {
    (1i64..100_000_000i64).prop_map(|cents| Money::new(Decimal::new(cents, 2)).unwrap())
}

fn direction_strategy() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Inflow), Just(Direction::Outflow)]
}

fn money_source_strategy() -> impl Strategy<Value = MoneySource> {
    prop_oneof![
        Just(MoneySource::Bank(BankAccountId::new())),
        Just(MoneySource::Cash(CashHolderId::new())),
    ]
}

fn transaction_type_strategy() -> impl Strategy<Value = TransactionType> {
    prop_oneof![
        Just(TransactionType::Income),
        Just(TransactionType::Expense),
        Just(TransactionType::Share),
        Just(TransactionType::ShareReduction),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Reverting a successful money movement restores the balance exactly.
    #[test]
    fn prop_money_round_trip(
        source in money_source_strategy(),
        start in balance(),
        amount in positive_amount(),
        direction in direction_strategy(),
    ) {
        if let Ok(after) = AdjustmentService::apply_money(source, start, direction, amount) {
            let reverted = ReversalService::revert_money(after, direction, amount).unwrap();
            prop_assert_eq!(reverted.value, start);
            prop_assert_eq!(reverted.shortfall, Decimal::ZERO);
        }
    }

    /// An outflow succeeds exactly when the balance covers it.
    #[test]
    fn prop_outflow_never_negative(
        source in money_source_strategy(),
        start in balance(),
        amount in positive_amount(),
    ) {
        let result = AdjustmentService::apply_money(source, start, Direction::Outflow, amount);
        if amount <= start {
            prop_assert_eq!(result.unwrap().amount(), start.amount() - amount.amount());
        } else {
            let is_insufficient = matches!(result, Err(PostingError::InsufficientFunds { .. }));
            prop_assert!(is_insufficient);
        }
    }

    /// Stock movements round-trip and never leave negative stock.
    #[test]
    fn prop_stock_round_trip(
        stock in 0i64..10_000,
        quantity in 1u32..10_000,
        direction in direction_strategy(),
    ) {
        let product_id = ProductId::new();
        match AdjustmentService::apply_stock(product_id, stock, direction, quantity) {
            Ok(after) => {
                prop_assert!(after >= 0);
                let reverted = ReversalService::revert_stock(after, direction, quantity).unwrap();
                prop_assert_eq!(reverted.value, stock);
                prop_assert_eq!(reverted.shortfall, Decimal::ZERO);
            }
            Err(err) => {
                prop_assert_eq!(direction, Direction::Outflow);
                prop_assert!(i64::from(quantity) > stock);
                let is_insufficient = matches!(err, PostingError::InsufficientStock { .. });
                prop_assert!(is_insufficient);
            }
        }
    }

    /// Equity movements round-trip for every effect.
    #[test]
    fn prop_equity_round_trip(
        start in balance(),
        amount in positive_amount(),
        effect in prop_oneof![
            Just(EquityEffect::None),
            Just(EquityEffect::Increase),
            Just(EquityEffect::Decrease),
        ],
    ) {
        let contact_id = ContactId::new();
        if let Ok(after) = AdjustmentService::apply_equity(contact_id, start, effect, amount) {
            let reverted = ReversalService::revert_equity(after, effect, amount).unwrap();
            prop_assert_eq!(reverted.value, start);
        }
    }

    /// A reversal clamps instead of going negative and reports the shortfall.
    #[test]
    fn prop_revert_clamps_at_zero(
        start in balance(),
        amount in positive_amount(),
    ) {
        let reverted = ReversalService::revert_money(start, Direction::Inflow, amount).unwrap();
        if amount > start {
            prop_assert_eq!(reverted.value, Money::ZERO);
            prop_assert_eq!(reverted.shortfall, amount.amount() - start.amount());
        } else {
            prop_assert_eq!(reverted.shortfall, Decimal::ZERO);
        }
    }

    /// The reversal plan moves money by exactly the sum of paid installments.
    #[test]
    fn prop_reversal_uses_paid_installments(
        transaction_type in transaction_type_strategy(),
        parts in prop::collection::vec((1i64..100_000i64, any::<bool>()), 1..8),
    ) {
        let plan: Vec<InstallmentState> = parts
            .iter()
            .map(|(cents, is_paid)| InstallmentState {
                id: InstallmentId::new(),
                amount: Money::new(Decimal::new(*cents, 2)).unwrap(),
                is_paid: *is_paid,
                due_date: None,
            })
            .collect();
        let total: Decimal = plan.iter().map(|i| i.amount.amount()).sum();
        let paid: Decimal = plan
            .iter()
            .filter(|i| i.is_paid)
            .map(|i| i.amount.amount())
            .sum();
        let entry = PostingEntry {
            transaction_type,
            amount: Money::new(total).unwrap(),
            money_source: MoneySource::Bank(BankAccountId::new()),
            product: None,
            contact_id: Some(ContactId::new()),
            category_id: Some(CategoryId::new()),
        };

        let reversal = ReversalService::plan(&entry, false, &plan).unwrap();
        let reverted_money = reversal.money.map_or(Decimal::ZERO, |m| m.amount.amount());
        prop_assert_eq!(reverted_money, paid);
        prop_assert_eq!(reversal.equity.is_some(), paid > Decimal::ZERO);
    }
}
