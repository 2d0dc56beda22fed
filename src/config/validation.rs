//! Configuration validation logic
//!
//! Range and format checks for every settings section. `Settings::validate`
//! covers what every command needs; the JWT section is validated separately
//! by the commands that sign or verify tokens.

use crate::config::error::ConfigError;
use crate::config::settings::{
    BackoffConfig, ClientConfig, CronConfig, CronStoreBackend, DatabaseConfig, JwtConfig,
    LoggerSettings, ServerConfig, Settings,
};

const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

/// Upper bound on jobs examined by a single poll
const MAX_BATCH_LIMIT: i64 = 1000;

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::validation(
                "server.port",
                "Port must be between 1 and 65535.",
            ));
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::validation(
                "server.request_timeout",
                "Request timeout must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    /// # Validation Rules
    /// - URL must be a non-empty `postgres://` or `postgresql://` URL
    /// - Connection counts must be positive with min <= max
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::validation(
                "database.url",
                "Database URL is required when cron.store is \"postgres\".",
            ));
        }

        if !(self.url.starts_with("postgres://") || self.url.starts_with("postgresql://")) {
            return Err(ConfigError::validation(
                "database.url",
                "Invalid database URL format. Expected postgres://[user:password@]host[:port]/database",
            ));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::validation(
                "database.max_connections",
                "Maximum connections must be greater than 0.",
            ));
        }

        if self.min_connections == 0 {
            return Err(ConfigError::validation(
                "database.min_connections",
                "Minimum connections must be greater than 0.",
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::validation(
                "database.min_connections",
                format!(
                    "Minimum connections ({}) cannot exceed maximum connections ({}).",
                    self.min_connections, self.max_connections
                ),
            ));
        }

        Ok(())
    }
}

impl JwtConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::validation("jwt.secret", "JWT secret cannot be empty"));
        }

        if self.secret.len() < 32 {
            return Err(ConfigError::validation(
                "jwt.secret",
                "JWT secret should be at least 32 characters",
            ));
        }

        if self.access_token_expiration <= 0 {
            return Err(ConfigError::validation(
                "jwt.access_token_expiration",
                "Access token expiration must be positive",
            ));
        }

        if self.refresh_token_expiration <= self.access_token_expiration {
            return Err(ConfigError::validation(
                "jwt.refresh_token_expiration",
                "Refresh token expiration must be longer than access token expiration",
            ));
        }

        Ok(())
    }
}

impl LoggerSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.level.trim().is_empty() {
            return Err(ConfigError::validation("logger.level", "Log level cannot be empty"));
        }

        if self.file.enabled {
            if self.file.path.is_empty() {
                return Err(ConfigError::validation(
                    "logger.file.path",
                    "File path cannot be empty when file logging is enabled.",
                ));
            }

            if !VALID_LOG_FORMATS.contains(&self.file.format.to_lowercase().as_str()) {
                return Err(ConfigError::validation(
                    "logger.file.format",
                    format!(
                        "Invalid log format '{}'. Valid formats are: {}",
                        self.file.format,
                        VALID_LOG_FORMATS.join(", ")
                    ),
                ));
            }

            let rotation = &self.file.rotation;
            if rotation.enabled && rotation.max_size == 0 {
                return Err(ConfigError::validation(
                    "logger.file.rotation.max_size",
                    "Rotation max_size must be greater than 0 bytes.",
                ));
            }
            if rotation.enabled && rotation.max_files == 0 {
                return Err(ConfigError::validation(
                    "logger.file.rotation.max_files",
                    "Rotation max_files must be greater than 0.",
                ));
            }
        }

        if !self.console.enabled && !self.file.enabled {
            return Err(ConfigError::validation(
                "logger",
                "At least one output (console or file) must be enabled",
            ));
        }

        Ok(())
    }
}

impl CronConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_limit <= 0 || self.batch_limit > MAX_BATCH_LIMIT {
            return Err(ConfigError::validation(
                "cron.batch_limit",
                format!("Batch limit must be between 1 and {}.", MAX_BATCH_LIMIT),
            ));
        }

        if self.trigger.enabled && self.trigger.schedule.parse::<cron::Schedule>().is_err() {
            return Err(ConfigError::validation(
                "cron.trigger.schedule",
                format!(
                    "Invalid trigger schedule '{}'. Expected a six-field cron expression such as \"0 * * * * *\".",
                    self.trigger.schedule
                ),
            ));
        }

        Ok(())
    }
}

impl BackoffConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_delay_ms == 0 {
            return Err(ConfigError::validation(
                "client.backoff.base_delay_ms",
                "Base delay must be greater than 0.",
            ));
        }

        if self.max_delay_ms < self.base_delay_ms {
            return Err(ConfigError::validation(
                "client.backoff.max_delay_ms",
                "Maximum delay cannot be smaller than the base delay.",
            ));
        }

        if self.extended_threshold == 0 {
            return Err(ConfigError::validation(
                "client.backoff.extended_threshold",
                "Extended cooling threshold must be at least 1.",
            ));
        }

        if self.extended_max_ms < self.max_delay_ms {
            return Err(ConfigError::validation(
                "client.backoff.extended_max_ms",
                "Extended cooling cap cannot be smaller than the maximum delay.",
            ));
        }

        Ok(())
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::validation(
                "client.base_url",
                "Base URL must start with http:// or https://",
            ));
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::validation(
                "client.request_timeout",
                "Request timeout must be greater than 0 seconds.",
            ));
        }

        self.backoff.validate()
    }
}

impl Settings {
    /// Validate every section a command may touch.
    ///
    /// The database section is only checked when the Postgres store is in use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        if self.cron.store == CronStoreBackend::Postgres {
            self.database.validate()?;
        }
        self.logger.validate()?;
        self.cron.validate()?;
        self.client.validate()?;
        Ok(())
    }
}
