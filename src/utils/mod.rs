//! Utility modules

#[cfg(feature = "duckdb")]
pub mod duckdb_storage;
pub mod memory_storage;
pub mod validation;

#[cfg(feature = "duckdb")]
pub use duckdb_storage::*;
pub use memory_storage::*;
pub use validation::*;
