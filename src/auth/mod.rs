//! Access gate: authentication and self-only authorization.
//!
//! Decoupled from transport: callers hand in the raw presented credential
//! string and receive the resolved [`Account`](crate::types::Account), which
//! they thread explicitly into ledger calls.

pub mod credential;
pub mod gate;

pub use credential::{parse_presented_credential, DEFAULT_SCHEME};
pub use gate::{authorize_self, AccessGate};
