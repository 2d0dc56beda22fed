//! Configuration settings structures for crm-cron
//!
//! Every section deserializes with defaults, so a partial TOML file (or none
//! at all plus environment overrides) yields a complete `Settings`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig, RotationConfig};

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "crm-cron".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs/crm-cron.log".to_string()
}

fn default_max_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_max_files() -> usize {
    5
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_access_token_expiration() -> i64 {
    1 // 1 hour
}

fn default_refresh_token_expiration() -> i64 {
    168 // 7 days
}

fn default_batch_limit() -> i64 {
    100
}

fn default_trigger_schedule() -> String {
    "0 * * * * *".to_string()
}

fn default_client_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    15_000
}

fn default_jitter_ms() -> u64 {
    150
}

fn default_extended_threshold() -> u32 {
    3
}

fn default_extended_max_ms() -> u64 {
    60_000
}

// ============================================================================
// Application / Server
// ============================================================================

/// Application basic information configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(default = "default_app_name")]
    pub name: String,

    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

/// Axum HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl ServerConfig {
    /// Get the full server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
        }
    }
}

// ============================================================================
// Database Configuration
// ============================================================================

/// Diesel database connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,

    /// Run pending migrations when the server starts
    #[serde(default)]
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout: default_connection_timeout(),
            auto_migrate: false,
        }
    }
}

// ============================================================================
// JWT Configuration
// ============================================================================

/// JWT authentication configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for signing tokens; set it through `CRM_JWT__SECRET`
    #[serde(default)]
    pub secret: String,

    /// Access token expiration time in hours
    #[serde(default = "default_access_token_expiration")]
    pub access_token_expiration: i64,

    /// Refresh token expiration time in hours
    #[serde(default = "default_refresh_token_expiration")]
    pub refresh_token_expiration: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            access_token_expiration: default_access_token_expiration(),
            refresh_token_expiration: default_refresh_token_expiration(),
        }
    }
}

// ============================================================================
// Logger Settings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            colored: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_path")]
    pub path: String,

    #[serde(default = "default_true")]
    pub append: bool,

    /// Log format: "full", "compact", or "json"
    #[serde(default = "default_log_format")]
    pub format: String,

    #[serde(default)]
    pub rotation: RotationSettings,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: true,
            format: default_log_format(),
            rotation: RotationSettings::default(),
        }
    }
}

/// Size based rotation of the log file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum file size in bytes before rotation
    #[serde(default = "default_max_size")]
    pub max_size: u64,

    /// Files kept, counting the active one
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Gzip rotated files
    #[serde(default)]
    pub compress: bool,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: default_max_size(),
            max_files: default_max_files(),
            compress: false,
        }
    }
}

impl From<RotationSettings> for RotationConfig {
    fn from(settings: RotationSettings) -> Self {
        Self {
            enabled: settings.enabled,
            max_size: settings.max_size,
            max_files: settings.max_files,
            compress: settings.compress,
        }
    }
}

/// Logger configuration as it appears in configuration files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Log level or a full `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub console: ConsoleSettings,

    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    /// Convert the file representation into the runtime `LoggerConfig`
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let format = self
            .file
            .format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::validation("logger.file.format", e.to_string()))?;

        let config = LoggerConfig {
            level: self.level,
            console: ConsoleConfig {
                enabled: self.console.enabled,
                colored: self.console.colored,
            },
            file: FileConfig {
                enabled: self.file.enabled,
                path: PathBuf::from(self.file.path),
                append: self.file.append,
                format,
                rotation: self.file.rotation.into(),
            },
        };

        config
            .validate()
            .map_err(|e| ConfigError::validation("logger", e.to_string()))?;
        Ok(config)
    }
}

// ============================================================================
// Cron Configuration
// ============================================================================

/// Where cron job rows live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CronStoreBackend {
    #[default]
    Postgres,
    Memory,
}

/// In-process poll trigger, for deployments without an external scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Six-field cron expression (seconds first) for the poll cadence
    #[serde(default = "default_trigger_schedule")]
    pub schedule: String,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            schedule: default_trigger_schedule(),
        }
    }
}

/// Cron runner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronConfig {
    #[serde(default)]
    pub store: CronStoreBackend,

    /// Maximum number of active jobs examined per poll
    #[serde(default = "default_batch_limit")]
    pub batch_limit: i64,

    /// Seed the initial and maintenance job definitions at startup
    #[serde(default)]
    pub seed_on_startup: bool,

    #[serde(default)]
    pub trigger: TriggerConfig,
}

impl Default for CronConfig {
    fn default() -> Self {
        Self {
            store: CronStoreBackend::default(),
            batch_limit: default_batch_limit(),
            seed_on_startup: false,
            trigger: TriggerConfig::default(),
        }
    }
}

// ============================================================================
// Outbound client Configuration
// ============================================================================

/// Rate-limit cooling parameters for the outbound client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay for the first 429, doubled per consecutive 429
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Cap on the per-429 delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Upper bound of the random jitter added to each delay
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    /// Consecutive 429 count at which the cooling window doubles
    #[serde(default = "default_extended_threshold")]
    pub extended_threshold: u32,

    /// Cap on the extended cooling window
    #[serde(default = "default_extended_max_ms")]
    pub extended_max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_ms: default_jitter_ms(),
            extended_threshold: default_extended_threshold(),
            extended_max_ms: default_extended_max_ms(),
        }
    }
}

/// Outbound HTTP client configuration used by `trigger`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_client_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_client_base_url(),
            request_timeout: default_request_timeout(),
            backoff: BackoffConfig::default(),
        }
    }
}

// ============================================================================
// Main Settings Structure
// ============================================================================

/// Complete application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub application: ApplicationConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub jwt: JwtConfig,

    #[serde(default)]
    pub logger: LoggerSettings,

    #[serde(default)]
    pub cron: CronConfig,

    #[serde(default)]
    pub client: ClientConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_cron_config() -> impl Strategy<Value = CronConfig> {
        (
            prop_oneof![Just(CronStoreBackend::Postgres), Just(CronStoreBackend::Memory)],
            1i64..=1000,
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|(store, batch_limit, seed_on_startup, enabled)| CronConfig {
                store,
                batch_limit,
                seed_on_startup,
                trigger: TriggerConfig {
                    enabled,
                    schedule: default_trigger_schedule(),
                },
            })
    }

    fn arb_backoff_config() -> impl Strategy<Value = BackoffConfig> {
        (1u64..=2_000, 1u64..=500, 1u32..=10).prop_map(|(base, jitter, threshold)| BackoffConfig {
            base_delay_ms: base,
            max_delay_ms: base * 30,
            jitter_ms: jitter,
            extended_threshold: threshold,
            extended_max_ms: base * 120,
        })
    }

    proptest! {
        #[test]
        fn prop_settings_round_trip_serialization(
            cron in arb_cron_config(),
            backoff in arb_backoff_config()
        ) {
            let mut settings = Settings::default();
            settings.cron = cron;
            settings.client.backoff = backoff;

            let encoded = serde_json::to_string(&settings).unwrap();
            let decoded: Settings = serde_json::from_str(&encoded).unwrap();
            prop_assert_eq!(settings, decoded);
        }
    }

    #[test]
    fn test_cron_config_defaults() {
        let config = CronConfig::default();
        assert_eq!(config.store, CronStoreBackend::Postgres);
        assert_eq!(config.batch_limit, 100);
        assert!(!config.seed_on_startup);
        assert!(!config.trigger.enabled);
        assert_eq!(config.trigger.schedule, "0 * * * * *");
    }

    #[test]
    fn test_backoff_config_defaults() {
        let config = BackoffConfig::default();
        assert_eq!(config.base_delay_ms, 500);
        assert_eq!(config.max_delay_ms, 15_000);
        assert_eq!(config.jitter_ms, 150);
        assert_eq!(config.extended_threshold, 3);
        assert_eq!(config.extended_max_ms, 60_000);
    }

    #[test]
    fn test_server_config_address() {
        let config = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout: 30,
        };
        assert_eq!(config.address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_settings_deserialize_partial() {
        let json = r#"{ "cron": { "store": "memory", "batch_limit": 25 } }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.cron.store, CronStoreBackend::Memory);
        assert_eq!(settings.cron.batch_limit, 25);
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.client.backoff, BackoffConfig::default());
    }

    #[test]
    fn test_logger_settings_into_logger_config() {
        let settings = LoggerSettings {
            level: "debug".to_string(),
            console: ConsoleSettings::default(),
            file: FileSettings {
                enabled: true,
                path: "logs/test.log".to_string(),
                append: false,
                format: "compact".to_string(),
                rotation: RotationSettings {
                    max_size: 4096,
                    max_files: 3,
                    compress: true,
                    ..RotationSettings::default()
                },
            },
        };

        let config = settings.into_logger_config().unwrap();
        assert_eq!(config.level, "debug");
        assert!(config.file.enabled);
        assert_eq!(config.file.format, LogFormat::Compact);
        assert_eq!(config.file.path, PathBuf::from("logs/test.log"));
        assert_eq!(
            config.file.rotation,
            RotationConfig {
                enabled: true,
                max_size: 4096,
                max_files: 3,
                compress: true,
            }
        );
    }

    #[test]
    fn test_file_rotation_deserialize_defaults() {
        let json = r#"{ "logger": { "file": { "enabled": true, "rotation": { "compress": true } } } }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        let rotation = &settings.logger.file.rotation;
        assert!(rotation.enabled);
        assert!(rotation.compress);
        assert_eq!(rotation.max_size, 10 * 1024 * 1024);
        assert_eq!(rotation.max_files, 5);
    }

    #[test]
    fn test_logger_settings_invalid_format() {
        let settings = LoggerSettings {
            file: FileSettings {
                format: "xml".to_string(),
                ..FileSettings::default()
            },
            ..LoggerSettings::default()
        };

        let err = settings.into_logger_config().unwrap_err();
        assert_eq!(err.field(), Some("logger.file.format"));
    }

    #[test]
    fn test_logger_settings_both_outputs_disabled() {
        let settings = LoggerSettings {
            console: ConsoleSettings {
                enabled: false,
                colored: false,
            },
            ..LoggerSettings::default()
        };

        assert!(settings.into_logger_config().is_err());
    }
}
