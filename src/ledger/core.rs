//! Main ledger orchestrator that coordinates accounts and money movement

use bigdecimal::BigDecimal;

use crate::ledger::{AccountManager, FundsManager};
use crate::traits::*;
use crate::types::*;

/// The ledger engine.
///
/// Built from an injected store; the only component that changes balances.
/// All methods take `&self`, so one ledger can be shared behind an `Arc` by
/// any number of concurrent tasks.
pub struct Ledger<S: AccountStore> {
    account_manager: AccountManager<S>,
    funds_manager: FundsManager<S>,
}

impl<S: AccountStore + Clone> Ledger<S> {
    /// Create a new ledger with the given storage backend
    pub fn new(storage: S) -> Self {
        Self {
            account_manager: AccountManager::new(storage.clone()),
            funds_manager: FundsManager::new(storage),
        }
    }
}

impl<S: AccountStore> Ledger<S> {
    /// The store backing this ledger
    pub fn storage(&self) -> &S {
        &self.account_manager.storage
    }

    // Account operations
    /// Create a new account; the name is trimmed and must not be blank
    pub async fn create_account(&self, display_name: &str) -> LedgerResult<Account> {
        self.account_manager.create_account(display_name).await
    }

    /// Get an account by ID
    pub async fn find_account(&self, account_id: AccountId) -> LedgerResult<Account> {
        self.account_manager.find_account(account_id).await
    }

    /// List all accounts, ascending by ID
    pub async fn list_accounts(&self) -> LedgerResult<Vec<Account>> {
        self.account_manager.list_accounts().await
    }

    // Money movement
    /// Deposit a positive amount into an account
    pub async fn deposit(&self, account_id: AccountId, amount: &BigDecimal) -> LedgerResult<Account> {
        self.funds_manager.deposit(account_id, amount).await
    }

    /// Transfer a positive amount between two distinct accounts
    pub async fn transfer(
        &self,
        source_id: AccountId,
        destination_id: AccountId,
        amount: &BigDecimal,
    ) -> LedgerResult<()> {
        self.funds_manager
            .transfer(source_id, destination_id, amount)
            .await
    }

    /// Sum of every account balance
    pub async fn total_balance(&self) -> LedgerResult<BigDecimal> {
        let accounts = self.list_accounts().await?;
        let total: BigDecimal = accounts.iter().map(|account| &account.balance).sum();
        Ok(total.with_scale(MONEY_SCALE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryAccountStore;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_ledger_basic_operations() {
        let ledger = Ledger::new(MemoryAccountStore::new());

        let ana = ledger.create_account("Ana").await.unwrap();
        let bruno = ledger.create_account("Bruno").await.unwrap();

        ledger
            .deposit(ana.id, &BigDecimal::from_str("100.00").unwrap())
            .await
            .unwrap();
        ledger
            .transfer(ana.id, bruno.id, &BigDecimal::from(40))
            .await
            .unwrap();

        let ana = ledger.find_account(ana.id).await.unwrap();
        let bruno = ledger.find_account(bruno.id).await.unwrap();
        assert_eq!(ana.balance.to_string(), "60.00");
        assert_eq!(bruno.balance.to_string(), "40.00");

        assert_eq!(ledger.total_balance().await.unwrap(), BigDecimal::from(100));
        assert_eq!(ledger.list_accounts().await.unwrap().len(), 2);
        assert_eq!(ledger.storage().len().unwrap(), 2);
    }
}
