//! Property-based tests for installment plan validation.
//!
//! - Any split into positive parts that sums to the amount is accepted
//! - Any split that misses the amount by a single minor unit is rejected

use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::Money;

use super::error::PostingError;
use super::types::InstallmentInput;
use super::validation::EntryValidator;

/// Strategy to generate installment parts from 0.01 to 10,000.00.
fn parts_strategy() -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec(
        (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2)),
        1..12,
    )
}

fn to_inputs(parts: &[Decimal]) -> Vec<InstallmentInput> {
    parts
        .iter()
        .map(|amount| InstallmentInput {
            amount: *amount,
            due_date: None,
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Exact splits are accepted and keep their order.
    #[test]
    fn prop_exact_split_accepted(parts in parts_strategy()) {
        let total: Decimal = parts.iter().sum();
        let amount = Money::new(total).unwrap();

        let validated = EntryValidator::validate_installments(amount, &to_inputs(&parts)).unwrap();
        let amounts: Vec<Decimal> = validated.iter().map(|i| i.amount.amount()).collect();
        prop_assert_eq!(amounts, parts);
    }

    /// A split off by one minor unit is rejected with the actual sum.
    #[test]
    fn prop_inexact_split_rejected(parts in parts_strategy(), over in any::<bool>()) {
        let total: Decimal = parts.iter().sum();
        let cent = Decimal::new(1, 2);
        let amount = if over { total - cent } else { total + cent };
        prop_assume!(amount > Decimal::ZERO);

        let result =
            EntryValidator::validate_installments(Money::new(amount).unwrap(), &to_inputs(&parts));
        prop_assert_eq!(
            result.unwrap_err(),
            PostingError::InstallmentMismatch { expected: amount, actual: total }
        );
    }
}
