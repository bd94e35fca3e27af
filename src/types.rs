//! Core types and data structures for the ledger

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of fractional digits carried by every amount and balance
pub const MONEY_SCALE: i64 = 2;

/// Maximum length of an account display name
pub const MAX_DISPLAY_NAME_LEN: usize = 255;

/// Surrogate key of an account, assigned monotonically by the store
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(i64);

impl AccountId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl From<i64> for AccountId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A client account: identity, credential and balance.
///
/// This is a plain record. Balances are only changed by the ledger inside an
/// atomic unit of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Unique, immutable identifier
    pub id: AccountId,
    /// Trimmed, non-empty human-readable name
    pub display_name: String,
    /// Current balance, never negative, scale 2
    pub balance: BigDecimal,
    /// Opaque API key (UUID formatted), unique across all accounts
    pub credential: String,
    /// When the account was created
    pub created_at: DateTime<Utc>,
    /// When the account was last mutated
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Build a freshly created account with a zero balance
    pub fn new(id: AccountId, display_name: String, credential: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            display_name,
            balance: zero_balance(),
            credential,
            created_at: now,
            updated_at: now,
        }
    }
}

/// `0.00`
pub fn zero_balance() -> BigDecimal {
    BigDecimal::from(0).with_scale(MONEY_SCALE)
}

/// Stable, caller-visible error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    NotFound,
    MalformedCredential,
    InvalidCredential,
    Forbidden,
    StoreFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::MalformedCredential => "malformed_credential",
            ErrorKind::InvalidCredential => "invalid_credential",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::StoreFailure => "store_failure",
        }
    }
}

/// Errors that can occur in the ledger
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Malformed credential: {0}")]
    MalformedCredential(String),
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Storage error: {0}")]
    Store(String),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_) => ErrorKind::ValidationError,
            LedgerError::NotFound(_) => ErrorKind::NotFound,
            LedgerError::MalformedCredential(_) => ErrorKind::MalformedCredential,
            LedgerError::InvalidCredential(_) => ErrorKind::InvalidCredential,
            LedgerError::Forbidden(_) => ErrorKind::Forbidden,
            LedgerError::Store(_) => ErrorKind::StoreFailure,
        }
    }

    /// Message safe to hand back to a caller.
    ///
    /// Storage detail stays internal; every other kind carries its own message.
    pub fn public_message(&self) -> String {
        match self {
            LedgerError::Store(_) => "internal error".to_string(),
            LedgerError::Validation(msg)
            | LedgerError::NotFound(msg)
            | LedgerError::MalformedCredential(msg)
            | LedgerError::InvalidCredential(msg)
            | LedgerError::Forbidden(msg) => msg.clone(),
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
