//! Traits for storage abstraction

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

use crate::types::*;

/// Storage abstraction for accounts
///
/// This trait allows the ledger to work with any storage backend (in-memory,
/// DuckDB, ...) as long as it honours the atomic-unit contract of
/// [`AccountStore::run_atomic`].
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Get an account by ID
    async fn get_by_id(&self, id: AccountId) -> LedgerResult<Option<Account>>;

    /// Get an account by exact credential match
    async fn get_by_credential(&self, credential: &str) -> LedgerResult<Option<Account>>;

    /// List all accounts ordered by ascending ID
    async fn list_all(&self) -> LedgerResult<Vec<Account>>;

    /// Persist a new account with a zero balance and a freshly minted credential
    async fn create(&self, display_name: &str) -> LedgerResult<Account>;

    /// Run `unit` against the accounts named in `ids` as one atomic unit.
    ///
    /// The named accounts are held exclusively for the duration of the unit,
    /// so units touching an overlapping account are serialised while disjoint
    /// units proceed concurrently. If `unit` returns an error, or the commit
    /// fails, nothing is written.
    async fn run_atomic<T, F>(&self, ids: &[AccountId], unit: F) -> LedgerResult<T>
    where
        T: Send,
        F: FnOnce(&mut AtomicUnit) -> LedgerResult<T> + Send;
}

/// Working set of an atomic unit.
///
/// Holds a snapshot of every declared account taken while the store holds
/// their locks. Mutations are staged here and only become visible when the
/// store commits the unit.
#[derive(Debug, Default)]
pub struct AtomicUnit {
    accounts: BTreeMap<AccountId, Option<Account>>,
    dirty: BTreeSet<AccountId>,
}

impl AtomicUnit {
    /// Create a unit from the loaded snapshot; `None` marks an absent account
    pub fn new(accounts: impl IntoIterator<Item = (AccountId, Option<Account>)>) -> Self {
        Self {
            accounts: accounts.into_iter().collect(),
            dirty: BTreeSet::new(),
        }
    }

    /// Read a declared account
    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id).and_then(Option::as_ref)
    }

    /// Stage a mutation of a declared account
    pub fn account_mut(&mut self, id: AccountId) -> Option<&mut Account> {
        let account = self.accounts.get_mut(&id).and_then(Option::as_mut)?;
        self.dirty.insert(id);
        Some(account)
    }

    /// IDs declared for this unit, ascending
    pub fn declared(&self) -> impl Iterator<Item = AccountId> + '_ {
        self.accounts.keys().copied()
    }

    /// Consume the unit, returning the accounts that must be written back
    pub fn into_changes(self) -> Vec<Account> {
        let dirty = self.dirty;
        self.accounts
            .into_iter()
            .filter(|(id, _)| dirty.contains(id))
            .filter_map(|(_, account)| account)
            .collect()
    }
}

/// Reject a commit that would leave any account negative
pub fn check_commit_constraints(changes: &[Account]) -> LedgerResult<()> {
    let zero = zero_balance();
    if let Some(account) = changes.iter().find(|a| a.balance < zero) {
        return Err(LedgerError::Store(format!(
            "balance constraint violated for account {}",
            account.id
        )));
    }
    Ok(())
}
