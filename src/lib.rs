//! # Ledger Core
//!
//! The account-ledger core of a small financial API: clients hold a balance
//! identified by an issued API key, and may deposit into their account or
//! transfer to another client.
//!
//! ## Features
//!
//! - **Atomic money movement**: deposits and transfers run as atomic units
//!   against the store; no lost updates, no partial transfers, no negative balances
//! - **Per-account serialisation**: units touching the same account are
//!   serialised, units on disjoint accounts run concurrently
//! - **Access gate**: `Bearer <api key>` authentication and self-only authorization
//! - **Storage abstraction**: in-memory store out of the box, DuckDB behind the
//!   `duckdb` feature, or any type implementing [`AccountStore`]
//!
//! ## Quick Start
//!
//! ```rust
//! use ledger_core::{utils::MemoryAccountStore, Ledger};
//! use bigdecimal::BigDecimal;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> ledger_core::LedgerResult<()> {
//! let ledger = Ledger::new(MemoryAccountStore::new());
//! let ana = ledger.create_account("Ana").await?;
//! let ana = ledger.deposit(ana.id, &BigDecimal::from(100)).await?;
//! assert_eq!(ana.balance.to_string(), "100.00");
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod ledger;
pub mod service;
pub mod telemetry;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use auth::{authorize_self, AccessGate};
pub use config::LedgerConfig;
pub use ledger::*;
pub use service::{ErrorBody, LedgerService, Operation, Request, Response};
pub use traits::*;
pub use types::*;
