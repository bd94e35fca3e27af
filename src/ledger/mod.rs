//! Ledger module containing account management and money movement

pub mod account;
pub mod core;
pub mod funds;

pub use account::*;
pub use self::core::*;
pub use funds::*;
