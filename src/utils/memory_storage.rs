//! In-memory account store

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;

/// Default time an atomic unit waits for an account lock
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_CREDENTIAL_ATTEMPTS: usize = 8;

type AccountCell = Arc<Mutex<Account>>;

#[derive(Debug, Default)]
struct Index {
    accounts: BTreeMap<AccountId, AccountCell>,
    credentials: HashMap<String, AccountId>,
    last_id: i64,
}

/// In-memory account store.
///
/// Every account lives behind its own async mutex. An atomic unit locks the
/// accounts it declares in ascending ID order and holds them until it
/// commits or rolls back, which gives per-account serialisation without a
/// global lock. Cloning the store shares the same accounts.
#[derive(Debug, Clone)]
pub struct MemoryAccountStore {
    index: Arc<RwLock<Index>>,
    lock_timeout: Duration,
}

impl MemoryAccountStore {
    /// Create a new memory store instance
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// Create a store whose atomic units give up after `lock_timeout`
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            index: Arc::new(RwLock::new(Index::default())),
            lock_timeout,
        }
    }

    /// Number of stored accounts
    pub fn len(&self) -> LedgerResult<usize> {
        Ok(self.read_index()?.accounts.len())
    }

    /// Whether the store holds no accounts
    pub fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.len()? == 0)
    }

    fn read_index(&self) -> LedgerResult<RwLockReadGuard<'_, Index>> {
        self.index
            .read()
            .map_err(|_| LedgerError::Store("account index lock poisoned".to_string()))
    }

    fn write_index(&self) -> LedgerResult<RwLockWriteGuard<'_, Index>> {
        self.index
            .write()
            .map_err(|_| LedgerError::Store("account index lock poisoned".to_string()))
    }

    fn cell(&self, id: AccountId) -> LedgerResult<Option<AccountCell>> {
        Ok(self.read_index()?.accounts.get(&id).cloned())
    }

    async fn lock_cell(&self, cell: AccountCell) -> LedgerResult<OwnedMutexGuard<Account>> {
        tokio::time::timeout(self.lock_timeout, cell.lock_owned())
            .await
            .map_err(|_| LedgerError::Store("timed out waiting for account lock".to_string()))
    }

    async fn read_cell(&self, cell: Option<AccountCell>) -> LedgerResult<Option<Account>> {
        match cell {
            Some(cell) => {
                let guard = self.lock_cell(cell).await?;
                Ok(Some((*guard).clone()))
            }
            None => Ok(None),
        }
    }
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get_by_id(&self, id: AccountId) -> LedgerResult<Option<Account>> {
        let cell = self.cell(id)?;
        self.read_cell(cell).await
    }

    async fn get_by_credential(&self, credential: &str) -> LedgerResult<Option<Account>> {
        let cell = {
            let index = self.read_index()?;
            index
                .credentials
                .get(credential)
                .and_then(|id| index.accounts.get(id))
                .cloned()
        };
        self.read_cell(cell).await
    }

    async fn list_all(&self) -> LedgerResult<Vec<Account>> {
        let cells: Vec<AccountCell> = self.read_index()?.accounts.values().cloned().collect();

        // Hold every lock at once, in ascending ID order like `run_atomic`,
        // so a listing never sees half of a transfer
        let mut guards = Vec::with_capacity(cells.len());
        for cell in cells {
            guards.push(self.lock_cell(cell).await?);
        }
        Ok(guards.iter().map(|guard| (**guard).clone()).collect())
    }

    async fn create(&self, display_name: &str) -> LedgerResult<Account> {
        let mut index = self.write_index()?;

        let credential = (0..MAX_CREDENTIAL_ATTEMPTS)
            .map(|_| Uuid::new_v4().to_string())
            .find(|candidate| !index.credentials.contains_key(candidate))
            .ok_or_else(|| LedgerError::Store("could not mint a unique credential".to_string()))?;

        index.last_id += 1;
        let id = AccountId::new(index.last_id);
        let account = Account::new(id, display_name.to_string(), credential.clone());

        index.credentials.insert(credential, id);
        index
            .accounts
            .insert(id, Arc::new(Mutex::new(account.clone())));

        Ok(account)
    }

    async fn run_atomic<T, F>(&self, ids: &[AccountId], unit: F) -> LedgerResult<T>
    where
        T: Send,
        F: FnOnce(&mut AtomicUnit) -> LedgerResult<T> + Send,
    {
        let declared: BTreeSet<AccountId> = ids.iter().copied().collect();
        let cells: Vec<(AccountId, Option<AccountCell>)> = {
            let index = self.read_index()?;
            declared
                .iter()
                .map(|id| (*id, index.accounts.get(id).cloned()))
                .collect()
        };

        // Ascending order, so overlapping units can never wait on each other in a cycle
        let mut guards: BTreeMap<AccountId, OwnedMutexGuard<Account>> = BTreeMap::new();
        for (id, cell) in &cells {
            if let Some(cell) = cell {
                guards.insert(*id, self.lock_cell(cell.clone()).await?);
            }
        }
        debug!(accounts = ?declared, "account locks acquired");

        let mut work = AtomicUnit::new(
            cells
                .iter()
                .map(|(id, _)| (*id, guards.get(id).map(|guard| (**guard).clone()))),
        );

        let output = match unit(&mut work) {
            Ok(output) => output,
            Err(err) => {
                debug!(accounts = ?declared, error = %err, "atomic unit rolled back");
                return Err(err);
            }
        };

        let changes = work.into_changes();
        check_commit_constraints(&changes)?;

        for account in changes {
            if let Some(guard) = guards.get_mut(&account.id) {
                **guard = account;
            }
        }

        Ok(output)
    }
}
