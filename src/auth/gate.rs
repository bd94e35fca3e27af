//! Credential resolution and self-access checks

use tracing::debug;

use crate::auth::credential::{parse_presented_credential, DEFAULT_SCHEME};
use crate::traits::*;
use crate::types::*;

/// Resolves presented credentials to accounts.
///
/// Per request: unauthenticated -> [`AccessGate::authenticate`] ->
/// [`authorize_self`] -> operation. Any failure ends the request; the gate
/// never retries.
pub struct AccessGate<S: AccountStore> {
    storage: S,
    scheme: String,
}

impl<S: AccountStore> AccessGate<S> {
    /// Create a gate expecting the `Bearer` scheme
    pub fn new(storage: S) -> Self {
        Self::with_scheme(storage, DEFAULT_SCHEME)
    }

    /// Create a gate expecting a custom scheme marker
    pub fn with_scheme(storage: S, scheme: impl Into<String>) -> Self {
        Self {
            storage,
            scheme: scheme.into(),
        }
    }

    /// Scheme marker this gate expects
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Resolve a presented `<scheme> <token>` credential to its account
    pub async fn authenticate(&self, presented: &str) -> LedgerResult<Account> {
        let token = parse_presented_credential(presented, &self.scheme)?;
        let account = self
            .storage
            .get_by_credential(token)
            .await?
            .ok_or_else(|| LedgerError::InvalidCredential("invalid credential".to_string()))?;
        debug!(account_id = %account.id, "caller authenticated");
        Ok(account)
    }
}

/// Allow a caller to act only on its own account
pub fn authorize_self(caller: &Account, target: AccountId) -> LedgerResult<()> {
    if caller.id != target {
        return Err(LedgerError::Forbidden(
            "access to another account is not allowed".to_string(),
        ));
    }
    Ok(())
}
