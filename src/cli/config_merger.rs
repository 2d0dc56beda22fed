//! Merge CLI overrides into file-based configuration
//!
//! Precedence, lowest first: configuration files, `CRM_*` environment
//! variables, then command-line arguments.

use super::parser::{Cli, Commands};
use crate::config::error::ConfigError;
use crate::config::{ConfigLoader, CronStoreBackend, Settings};

pub struct ConfigurationMerger {
    base_config: Settings,
}

impl ConfigurationMerger {
    pub fn new(base_config: Settings) -> Self {
        Self { base_config }
    }

    /// Load the unvalidated base configuration selected by `--config` and `--env`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the files cannot be read or parsed.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut loader = ConfigLoader::new()?;
        if let Some(path) = &cli.config {
            loader = loader.with_file(path);
        }
        if let Some(env) = cli.env {
            loader = loader.with_environment(env.into());
        }

        tracing::debug!(
            environment = loader.environment().as_str(),
            "Loading configuration"
        );
        Ok(Self::new(loader.load_unvalidated()?))
    }

    pub fn base_config(&self) -> &Settings {
        &self.base_config
    }

    /// Apply CLI overrides, then validate what the selected command needs
    pub fn merge_cli_args(&self, cli: &Cli) -> Result<Settings, ConfigError> {
        let mut config = self.base_config.clone();

        if cli.verbose {
            config.logger.level = "debug".to_string();
        } else if cli.quiet {
            config.logger.level = "error".to_string();
        }

        if let Some(command) = &cli.command {
            Self::apply_command_overrides(&mut config, command);
        }

        validate_for_command(&config, cli.command.as_ref())?;
        Ok(config)
    }

    fn apply_command_overrides(config: &mut Settings, command: &Commands) {
        match command {
            Commands::Serve {
                host,
                port,
                log_level,
                ..
            } => {
                if let Some(host) = host {
                    config.server.host = host.clone();
                }
                if let Some(port) = port {
                    config.server.port = *port;
                }
                if let Some(level) = log_level {
                    config.logger.level = level.as_str().to_string();
                }
            }
            Commands::Trigger { url: Some(url), .. } => {
                config.client.base_url = url.clone();
            }
            _ => {}
        }
    }
}

/// Commands that never touch the store skip the store and server checks.
///
/// `migrate` always needs a database, whichever store `cron.store` selects.
pub fn validate_for_command(
    config: &Settings,
    command: Option<&Commands>,
) -> Result<(), ConfigError> {
    match command {
        None | Some(Commands::Serve { .. }) => {
            config.validate()?;
            config.jwt.validate()
        }
        Some(Commands::Migrate { .. }) => {
            config.validate()?;
            if config.cron.store != CronStoreBackend::Postgres {
                config.database.validate()?;
            }
            Ok(())
        }
        Some(Commands::Poll) | Some(Commands::Seed) => config.validate(),
        Some(Commands::Token { .. }) => {
            config.logger.validate()?;
            config.jwt.validate()
        }
        Some(Commands::Trigger { .. }) => {
            config.logger.validate()?;
            config.client.validate()
        }
    }
}
