//! Money movement: deposits and transfers

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{normalize_amount, validate_amount_precision, validate_positive_amount};

/// Funds manager for balance-changing operations.
///
/// Every read that decides a mutation happens inside the same atomic unit as
/// the write, so concurrent callers cannot act on a stale balance.
pub struct FundsManager<S: AccountStore> {
    storage: S,
}

impl<S: AccountStore> FundsManager<S> {
    /// Create a new funds manager
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Add `amount` to an account and return the updated account
    pub async fn deposit(&self, account_id: AccountId, amount: &BigDecimal) -> LedgerResult<Account> {
        let amount = normalize_amount(amount)?;

        let account = self
            .storage
            .run_atomic(&[account_id], |unit| {
                let account = unit
                    .account_mut(account_id)
                    .ok_or_else(|| LedgerError::NotFound("account not found".to_string()))?;
                credit(account, &amount, Utc::now());
                Ok(account.clone())
            })
            .await?;

        info!(account_id = %account_id, amount = %amount, "deposit committed");
        Ok(account)
    }

    /// Move `amount` from `source_id` to `destination_id`.
    ///
    /// Either both balances change or neither does.
    pub async fn transfer(
        &self,
        source_id: AccountId,
        destination_id: AccountId,
        amount: &BigDecimal,
    ) -> LedgerResult<()> {
        validate_positive_amount(amount)?;
        if source_id == destination_id {
            return Err(LedgerError::Validation(
                "same-account transfer not allowed".to_string(),
            ));
        }
        validate_amount_precision(amount)?;
        let amount = amount.with_scale(MONEY_SCALE);

        self.storage
            .run_atomic(&[source_id, destination_id], |unit| {
                let source_balance = unit
                    .account(source_id)
                    .map(|account| account.balance.clone())
                    .ok_or_else(|| LedgerError::NotFound("source account not found".to_string()))?;

                if unit.account(destination_id).is_none() {
                    return Err(LedgerError::NotFound(
                        "destination account not found".to_string(),
                    ));
                }

                if source_balance < amount {
                    return Err(LedgerError::Validation("insufficient funds".to_string()));
                }

                let now = Utc::now();
                if let Some(source) = unit.account_mut(source_id) {
                    debit(source, &amount, now);
                }
                if let Some(destination) = unit.account_mut(destination_id) {
                    credit(destination, &amount, now);
                }
                Ok(())
            })
            .await?;

        info!(
            source_id = %source_id,
            destination_id = %destination_id,
            amount = %amount,
            "transfer committed"
        );
        Ok(())
    }
}

fn credit(account: &mut Account, amount: &BigDecimal, now: DateTime<Utc>) {
    account.balance += amount;
    account.updated_at = now;
}

fn debit(account: &mut Account, amount: &BigDecimal, now: DateTime<Utc>) {
    account.balance -= amount;
    account.updated_at = now;
}
