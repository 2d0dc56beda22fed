//! Configuration management for crm-cron
//!
//! Layered loading, lowest to highest priority:
//! 1. `default.toml`
//! 2. `{environment}.toml`
//! 3. `local.toml` (not committed)
//! 4. `CRM_*` environment variables (`CRM_CRON__BATCH_LIMIT=50`)
//!
//! A single file can replace the layered directory via `--config` or
//! `CRM_CONFIG_FILE`.

pub mod environment;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use environment::Environment;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use settings::{
    BackoffConfig, ClientConfig, CronConfig, CronStoreBackend, DatabaseConfig, JwtConfig,
    Settings, TriggerConfig,
};
