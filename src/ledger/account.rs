//! Account management functionality

use tracing::info;

use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_display_name;

/// Account manager for creating and looking up accounts
pub struct AccountManager<S: AccountStore> {
    pub(crate) storage: S,
}

impl<S: AccountStore> AccountManager<S> {
    /// Create a new account manager
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Create a new account with a zero balance
    pub async fn create_account(&self, display_name: &str) -> LedgerResult<Account> {
        let display_name = validate_display_name(display_name)?;
        let account = self.storage.create(display_name).await?;
        info!(account_id = %account.id, "account created");
        Ok(account)
    }

    /// Get an account by ID, returning an error if not found
    pub async fn find_account(&self, account_id: AccountId) -> LedgerResult<Account> {
        self.storage
            .get_by_id(account_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound("account not found".to_string()))
    }

    /// List all accounts, ascending by ID
    pub async fn list_accounts(&self) -> LedgerResult<Vec<Account>> {
        self.storage.list_all().await
    }
}
