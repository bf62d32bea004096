//! Payload validation for transactions and deposits.
//!
//! Validation is pure: the caller fetches the product's stock level up front
//! and passes it in. Rules run in a fixed order so the first violation wins:
//! money source, type, amount, installment plan, stock.

use rust_decimal::Decimal;
use tally_shared::types::Money;

use super::error::PostingError;
use super::types::{
    InstallmentInput, MoneySource, MoneySourceInput, MoneySourceKind, PostingEntry, ProductLine,
    StockLevel, TransactionInput, TransactionType, ValidatedInstallment, ValidatedTransaction,
};

/// Stateless validator for posting payloads.
pub struct EntryValidator;

impl EntryValidator {
    /// Validates a transaction payload.
    ///
    /// `product` is the stored stock level of `input.product_id`, or `None`
    /// when the product does not exist.
    pub fn validate_transaction(
        input: &TransactionInput,
        product: Option<&StockLevel>,
    ) -> Result<ValidatedTransaction, PostingError> {
        let money_source = Self::validate_money_source(&input.money_source)?;
        let transaction_type: TransactionType = input.transaction_type.parse()?;
        let amount = Self::validate_amount(input.amount)?;
        let installments = Self::validate_installments(amount, &input.installments)?;

        if let (Some(product_id), None) = (input.product_id, product) {
            return Err(PostingError::ProductNotFound(product_id));
        }
        let line = input
            .product_id
            .filter(|_| input.quantity > 0)
            .map(|product_id| ProductLine {
                product_id,
                quantity: input.quantity,
            });
        if let (Some(line), Some(level), TransactionType::Income) = (line, product, transaction_type) {
            Self::validate_stock(line, level)?;
        }

        Ok(ValidatedTransaction {
            entry: PostingEntry {
                transaction_type,
                amount,
                money_source,
                product: line,
                contact_id: input.contact_id,
                category_id: input.category_id,
            },
            product_id: input.product_id,
            is_paid: input.is_paid && installments.is_empty(),
            installments,
            payment_method: input.payment_method,
            transaction_date: input.transaction_date,
            due_date: input.due_date,
            notes: input.notes.clone(),
            attachments: input.attachments.clone(),
        })
    }

    /// Resolves the money source selector to exactly one reference.
    pub fn validate_money_source(input: &MoneySourceInput) -> Result<MoneySource, PostingError> {
        let kind: MoneySourceKind = input.kind.parse()?;
        match (kind, input.bank_account_id, input.cash_holder_id) {
            (_, Some(_), Some(_)) => Err(PostingError::ConflictingMoneySource),
            (MoneySourceKind::Bank, Some(id), None) => Ok(MoneySource::Bank(id)),
            (MoneySourceKind::Bank, None, _) => Err(PostingError::MissingBankAccount),
            (MoneySourceKind::Cash, None, Some(id)) => Ok(MoneySource::Cash(id)),
            (MoneySourceKind::Cash, _, None) => Err(PostingError::MissingCashHolder),
        }
    }

    /// Requires a strictly positive amount that is stored without rounding.
    pub fn validate_amount(amount: Decimal) -> Result<Money, PostingError> {
        if amount <= Decimal::ZERO {
            return Err(PostingError::NonPositiveAmount(amount));
        }
        Money::new(amount).map_err(|_| PostingError::ExcessivePrecision(amount))
    }

    /// Checks an installment plan against the transaction amount.
    ///
    /// An empty plan is valid. A non-empty plan must consist of positive
    /// amounts, each within money precision, whose sum equals `amount` exactly.
    pub fn validate_installments(
        amount: Money,
        installments: &[InstallmentInput],
    ) -> Result<Vec<ValidatedInstallment>, PostingError> {
        if installments.is_empty() {
            return Ok(Vec::new());
        }

        let mut total = Decimal::ZERO;
        let mut validated = Vec::with_capacity(installments.len());
        for installment in installments {
            if installment.amount <= Decimal::ZERO {
                return Err(PostingError::NonPositiveInstallment(installment.amount));
            }
            total = total.checked_add(installment.amount).ok_or_else(|| {
                PostingError::Internal("installment total overflowed".to_string())
            })?;
            validated.push(ValidatedInstallment {
                amount: Money::new(installment.amount)
                    .map_err(|_| PostingError::ExcessivePrecision(installment.amount))?,
                due_date: installment.due_date,
            });
        }

        if total != amount.amount() {
            return Err(PostingError::InstallmentMismatch {
                expected: amount.amount(),
                actual: total,
            });
        }
        Ok(validated)
    }

    /// A sale must not exceed the on-hand stock of a tracked product.
    pub fn validate_stock(line: ProductLine, level: &StockLevel) -> Result<(), PostingError> {
        match level.stock {
            Some(available) if available < i64::from(line.quantity) => {
                Err(PostingError::StockUnavailable {
                    product_id: line.product_id,
                    available,
                    requested: line.quantity,
                })
            }
            _ => Ok(()),
        }
    }
}
