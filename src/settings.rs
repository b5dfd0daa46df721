// config lets you read a separate config file
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::error::Result;

/// Name of the optional settings file, looked up in the working directory.
pub const SETTINGS_FILE: &str = "fieldkeeper";
/// Prefix of environment overrides, e.g. `FIELDKEEPER_DATABASE=/tmp/f.db`.
pub const ENV_PREFIX: &str = "FIELDKEEPER";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Path to the SQLite file, or `:memory:`.
    pub database: String,
    pub listen: String,
    pub log_level: String,
    /// How long a caller may wait for the in-process store lock.
    pub lock_timeout_ms: u64,
    /// How long SQLite waits for another connection's write lock.
    pub busy_timeout_ms: u64,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
}
impl Default for Settings {
    fn default() -> Self {
        Self {
            database: "fieldkeeper.db".into(),
            listen: "127.0.0.1:8088".into(),
            log_level: "info".into(),
            lock_timeout_ms: 2_000,
            busy_timeout_ms: 2_000,
            retry_attempts: 3,
            retry_backoff_ms: 50,
        }
    }
}
impl Settings {
    /// Defaults, overlaid by `fieldkeeper.toml` (if present) and then by
    /// `FIELDKEEPER_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::load_from(SETTINGS_FILE)
    }
    pub fn load_from(file: &str) -> Result<Self> {
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default("database", defaults.database)?
            .set_default("listen", defaults.listen)?
            .set_default("log_level", defaults.log_level)?
            .set_default("lock_timeout_ms", defaults.lock_timeout_ms)?
            .set_default("busy_timeout_ms", defaults.busy_timeout_ms)?
            .set_default("retry_attempts", defaults.retry_attempts)?
            .set_default("retry_backoff_ms", defaults.retry_backoff_ms)?
            .add_source(File::with_name(file).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
