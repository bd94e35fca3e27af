//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

use crate::config::LedgerConfig;

/// Initialize tracing for the process.
///
/// `RUST_LOG` wins over `default_filter`. Safe to call multiple times
/// (subsequent calls are no-ops).
pub fn init_tracing(default_filter: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Initialize tracing from a loaded configuration
pub fn init_from_config(config: &LedgerConfig) {
    init_tracing(&config.log_filter, config.json_logs);
}
