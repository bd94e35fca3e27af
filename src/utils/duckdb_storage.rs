//! DuckDB account store

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use duckdb::{params, Connection, Params, Row};
use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::traits::*;
use crate::types::*;
use crate::utils::memory_storage::DEFAULT_LOCK_TIMEOUT;

const SCHEMA: &str = "
CREATE SEQUENCE IF NOT EXISTS account_ids START 1;
CREATE TABLE IF NOT EXISTS accounts (
    id BIGINT PRIMARY KEY DEFAULT nextval('account_ids'),
    display_name VARCHAR NOT NULL,
    balance DECIMAL(18, 2) NOT NULL DEFAULT 0 CHECK (balance >= 0),
    credential VARCHAR NOT NULL UNIQUE,
    created_at VARCHAR NOT NULL,
    updated_at VARCHAR NOT NULL
);
";

const SELECT_ACCOUNT: &str = "SELECT id, display_name, CAST(balance AS VARCHAR), credential, \
                              created_at, updated_at FROM accounts";

/// Durable account store backed by a DuckDB file.
///
/// All work goes through one mutex-guarded connection and every atomic unit
/// is a database transaction, so units are fully serialised. A caller that
/// cannot get the connection within the lock timeout fails with a store error.
#[derive(Clone)]
pub struct DuckDbAccountStore {
    conn: Arc<Mutex<Connection>>,
    lock_timeout: Duration,
}

impl DuckDbAccountStore {
    /// Open (or create) a database file and make sure the schema exists
    pub fn open(db_path: &Path) -> LedgerResult<Self> {
        let conn = Connection::open(db_path).map_err(store_err)?;
        Self::with_connection(conn)
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        Self::with_connection(conn)
    }

    /// Open the configured database file, or an in-memory database when none is set
    pub fn from_config(config: &LedgerConfig) -> LedgerResult<Self> {
        let store = match &config.database_path {
            Some(path) => Self::open(path)?,
            None => Self::open_in_memory()?,
        };
        Ok(store.with_lock_timeout(config.lock_timeout()))
    }

    /// Give up on the connection lock after `lock_timeout`
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    fn with_connection(conn: Connection) -> LedgerResult<Self> {
        conn.execute_batch(SCHEMA).map_err(store_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        })
    }

    /// Create the accounts table, its sequence and the credential index
    pub async fn ensure_schema(&self) -> LedgerResult<()> {
        self.lock().await?.execute_batch(SCHEMA).map_err(store_err)
    }

    async fn lock(&self) -> LedgerResult<MutexGuard<'_, Connection>> {
        tokio::time::timeout(self.lock_timeout, self.conn.lock())
            .await
            .map_err(|_| LedgerError::Store("timed out waiting for account lock".to_string()))
    }
}

struct AccountRow {
    id: i64,
    display_name: String,
    balance: String,
    credential: String,
    created_at: String,
    updated_at: String,
}

impl AccountRow {
    fn from_row(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            display_name: row.get(1)?,
            balance: row.get(2)?,
            credential: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn into_account(self) -> LedgerResult<Account> {
        let balance = BigDecimal::from_str(&self.balance)
            .map_err(|e| LedgerError::Store(format!("invalid stored balance: {e}")))?;
        Ok(Account {
            id: AccountId::new(self.id),
            display_name: self.display_name,
            balance: balance.with_scale(MONEY_SCALE),
            credential: self.credential,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn parse_timestamp(value: &str) -> LedgerResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| LedgerError::Store(format!("invalid stored timestamp: {e}")))
}

fn store_err(err: duckdb::Error) -> LedgerError {
    LedgerError::Store(err.to_string())
}

fn query_accounts<P: Params>(conn: &Connection, sql: &str, params: P) -> LedgerResult<Vec<Account>> {
    let mut stmt = conn.prepare(sql).map_err(store_err)?;
    let rows = stmt
        .query_map(params, AccountRow::from_row)
        .map_err(store_err)?;
    let accounts: LedgerResult<Vec<Account>> = rows
        .map(|row| row.map_err(store_err).and_then(AccountRow::into_account))
        .collect();
    accounts
}

#[async_trait]
impl AccountStore for DuckDbAccountStore {
    async fn get_by_id(&self, id: AccountId) -> LedgerResult<Option<Account>> {
        let conn = self.lock().await?;
        let sql = format!("{SELECT_ACCOUNT} WHERE id = ?");
        Ok(query_accounts(&conn, &sql, params![id.get()])?.into_iter().next())
    }

    async fn get_by_credential(&self, credential: &str) -> LedgerResult<Option<Account>> {
        let conn = self.lock().await?;
        let sql = format!("{SELECT_ACCOUNT} WHERE credential = ?");
        Ok(query_accounts(&conn, &sql, params![credential])?.into_iter().next())
    }

    async fn list_all(&self) -> LedgerResult<Vec<Account>> {
        let conn = self.lock().await?;
        let sql = format!("{SELECT_ACCOUNT} ORDER BY id");
        query_accounts(&conn, &sql, [])
    }

    async fn create(&self, display_name: &str) -> LedgerResult<Account> {
        let conn = self.lock().await?;
        let now = Utc::now();
        let credential = Uuid::new_v4().to_string();

        // The UNIQUE index on credential rejects a duplicate outright
        let id: i64 = conn
            .query_row(
                "INSERT INTO accounts (display_name, balance, credential, created_at, updated_at) \
                 VALUES (?, 0, ?, ?, ?) RETURNING id",
                params![display_name, credential, now.to_rfc3339(), now.to_rfc3339()],
                |row| row.get(0),
            )
            .map_err(store_err)?;

        Ok(Account {
            id: AccountId::new(id),
            display_name: display_name.to_string(),
            balance: zero_balance(),
            credential,
            created_at: now,
            updated_at: now,
        })
    }

    async fn run_atomic<T, F>(&self, ids: &[AccountId], unit: F) -> LedgerResult<T>
    where
        T: Send,
        F: FnOnce(&mut AtomicUnit) -> LedgerResult<T> + Send,
    {
        let mut conn = self.lock().await?;
        let tx = conn.transaction().map_err(store_err)?;

        let declared: BTreeSet<AccountId> = ids.iter().copied().collect();
        let sql = format!("{SELECT_ACCOUNT} WHERE id = ?");
        let mut snapshot = Vec::with_capacity(declared.len());
        for id in &declared {
            let found = query_accounts(&tx, &sql, params![id.get()])?.into_iter().next();
            snapshot.push((*id, found));
        }

        let mut work = AtomicUnit::new(snapshot);
        // Dropping `tx` on the error path rolls the transaction back
        let output = unit(&mut work)?;

        let changes = work.into_changes();
        check_commit_constraints(&changes)?;
        for account in &changes {
            tx.execute(
                "UPDATE accounts SET balance = CAST(? AS DECIMAL(18, 2)), updated_at = ? WHERE id = ?",
                params![
                    account.balance.to_string(),
                    account.updated_at.to_rfc3339(),
                    account.id.get()
                ],
            )
            .map_err(store_err)?;
        }

        tx.commit().map_err(store_err)?;
        debug!(accounts = ?declared, written = changes.len(), "transaction committed");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_accounts_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.duckdb");

        let (ana, bruno) = {
            let ledger = Ledger::new(DuckDbAccountStore::open(&path).unwrap());
            let ana = ledger.create_account("Ana").await.unwrap();
            let bruno = ledger.create_account("Bruno").await.unwrap();
            ledger.deposit(ana.id, &dec("100.00")).await.unwrap();
            ledger.transfer(ana.id, bruno.id, &dec("40.00")).await.unwrap();
            (ana, bruno)
        };

        let config = LedgerConfig {
            database_path: Some(path.clone()),
            ..LedgerConfig::default()
        };
        let store = DuckDbAccountStore::from_config(&config).unwrap();
        let ana_after = store.get_by_credential(&ana.credential).await.unwrap().unwrap();
        let bruno_after = store.get_by_id(bruno.id).await.unwrap().unwrap();
        assert_eq!(ana_after.balance.to_string(), "60.00");
        assert_eq!(bruno_after.balance.to_string(), "40.00");
        assert_eq!(ana_after.created_at, ana.created_at);

        let next = store.create("Carla").await.unwrap();
        assert_eq!(next.id, AccountId::new(3));
    }

    #[tokio::test]
    async fn test_failed_unit_rolls_back() {
        let store = DuckDbAccountStore::open_in_memory().unwrap();
        let ledger = Ledger::new(store.clone());
        let ana = ledger.create_account("Ana").await.unwrap();
        let bruno = ledger.create_account("Bruno").await.unwrap();
        ledger.deposit(ana.id, &dec("60")).await.unwrap();

        let err = ledger
            .transfer(ana.id, bruno.id, &dec("1000"))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::Validation("insufficient funds".to_string()));

        let result: LedgerResult<()> = store
            .run_atomic(&[ana.id], |unit| {
                unit.account_mut(ana.id).unwrap().balance = dec("-1");
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(LedgerError::Store(_))));

        let accounts = store.list_all().await.unwrap();
        assert_eq!(accounts[0].balance, dec("60"));
        assert_eq!(accounts[1].balance, dec("0"));
    }

    #[tokio::test]
    async fn test_held_connection_times_out() {
        let store = DuckDbAccountStore::open_in_memory()
            .unwrap()
            .with_lock_timeout(Duration::from_millis(50));
        let ana = store.create("Ana").await.unwrap();

        let held = store.conn.lock().await;
        let timed_out = LedgerError::Store("timed out waiting for account lock".to_string());
        assert_eq!(store.get_by_id(ana.id).await, Err(timed_out.clone()));
        let result: LedgerResult<()> = store
            .run_atomic(&[ana.id], |unit| {
                unit.account_mut(ana.id).unwrap().balance = dec("10");
                Ok(())
            })
            .await;
        assert_eq!(result, Err(timed_out));
        drop(held);

        let ana_after = store.get_by_id(ana.id).await.unwrap().unwrap();
        assert_eq!(ana_after.balance, dec("0"));
    }

    #[test]
    fn test_config_lock_timeout_applies() {
        let config = LedgerConfig {
            lock_timeout_ms: 250,
            ..LedgerConfig::default()
        };
        let store = DuckDbAccountStore::from_config(&config).unwrap();
        assert_eq!(store.lock_timeout, Duration::from_millis(250));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_deposits_lose_nothing() {
        let ledger = Arc::new(Ledger::new(DuckDbAccountStore::open_in_memory().unwrap()));
        let account_id = ledger.create_account("Ana").await.unwrap().id;

        let mut handles = Vec::new();
        for _ in 0..100 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger.deposit(account_id, &dec("1.25")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let account = ledger.find_account(account_id).await.unwrap();
        assert_eq!(account.balance.to_string(), "125.00");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_transfers_never_overdraw() {
        let ledger = Arc::new(Ledger::new(DuckDbAccountStore::open_in_memory().unwrap()));
        let source = ledger.create_account("Source").await.unwrap().id;
        let destination = ledger.create_account("Destination").await.unwrap().id;
        ledger.deposit(source, &dec("100.00")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..30 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger.transfer(source, destination, &dec("10.00")).await
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => succeeded += 1,
                Err(err) => {
                    assert_eq!(err, LedgerError::Validation("insufficient funds".to_string()))
                }
            }
        }

        assert_eq!(succeeded, 10);
        assert_eq!(ledger.find_account(source).await.unwrap().balance, dec("0"));
        assert_eq!(ledger.total_balance().await.unwrap(), dec("100.00"));
    }
}
