//! Configuration management
//!
//! Settings are read from an optional JSON file and then overlaid with
//! environment variables:
//! ```json
//! {
//!   "credentialScheme": "Bearer",
//!   "lockTimeoutMs": 5000,
//!   "logFilter": "info",
//!   "jsonLogs": false,
//!   "databasePath": "/var/lib/ledger/accounts.duckdb"
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::DEFAULT_SCHEME;

const ENV_CREDENTIAL_SCHEME: &str = "LEDGER_CREDENTIAL_SCHEME";
const ENV_LOCK_TIMEOUT_MS: &str = "LEDGER_LOCK_TIMEOUT_MS";
const ENV_LOG_FILTER: &str = "LEDGER_LOG_FILTER";
const ENV_JSON_LOGS: &str = "LEDGER_JSON_LOGS";
const ENV_DATABASE_PATH: &str = "LEDGER_DATABASE_PATH";

/// Ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LedgerConfig {
    /// Scheme marker in front of presented API keys
    pub credential_scheme: String,
    /// How long an atomic unit waits for an account lock
    pub lock_timeout_ms: u64,
    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,
    /// Database file for the durable store; `None` keeps accounts in memory
    pub database_path: Option<PathBuf>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            credential_scheme: DEFAULT_SCHEME.to_string(),
            lock_timeout_ms: 5_000,
            log_filter: "info".to_string(),
            json_logs: false,
            database_path: None,
        }
    }
}

impl LedgerConfig {
    /// Load config from a JSON file (defaults if it does not exist), then
    /// apply environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: LedgerConfig = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            LedgerConfig::default()
        };

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = LedgerConfig::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from `LEDGER_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(scheme) = lookup(ENV_CREDENTIAL_SCHEME) {
            self.credential_scheme = scheme;
        }
        if let Some(timeout) = lookup(ENV_LOCK_TIMEOUT_MS) {
            self.lock_timeout_ms = timeout
                .trim()
                .parse()
                .with_context(|| format!("{ENV_LOCK_TIMEOUT_MS} must be an integer"))?;
        }
        if let Some(filter) = lookup(ENV_LOG_FILTER) {
            self.log_filter = filter;
        }
        if let Some(json) = lookup(ENV_JSON_LOGS) {
            self.json_logs = matches!(json.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(path) = lookup(ENV_DATABASE_PATH) {
            self.database_path = if path.trim().is_empty() {
                None
            } else {
                Some(PathBuf::from(path))
            };
        }
        Ok(())
    }

    /// Reject settings the gate or store cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.credential_scheme.trim().is_empty() {
            bail!("credential scheme cannot be empty");
        }
        if self.credential_scheme.chars().any(char::is_whitespace) {
            bail!("credential scheme cannot contain whitespace");
        }
        if self.lock_timeout_ms == 0 {
            bail!("lock timeout must be greater than zero");
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = LedgerConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.credential_scheme, "Bearer");
        assert_eq!(config.lock_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, r#"{"credentialScheme": "ApiKey", "jsonLogs": true}"#).unwrap();

        let config = LedgerConfig::load(&path).unwrap();
        assert_eq!(config.credential_scheme, "ApiKey");
        assert!(config.json_logs);
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.lock_timeout_ms, 5_000);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_LOCK_TIMEOUT_MS, "250"),
            (ENV_JSON_LOGS, "TRUE"),
            (ENV_DATABASE_PATH, "/tmp/ledger.duckdb"),
        ]);
        let mut config = LedgerConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.lock_timeout(), Duration::from_millis(250));
        assert!(config.json_logs);
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/ledger.duckdb")));
        assert_eq!(config.credential_scheme, "Bearer");
    }

    #[test]
    fn test_bad_values_are_rejected() {
        let mut config = LedgerConfig::default();
        assert!(config
            .apply_overrides(|key| (key == ENV_LOCK_TIMEOUT_MS).then(|| "soon".to_string()))
            .is_err());

        let config = LedgerConfig {
            credential_scheme: "Bear er".to_string(),
            ..LedgerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = LedgerConfig {
            lock_timeout_ms: 0,
            ..LedgerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
