//! CLI argument parsing with clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::policy::{EmployeeRole, Principal, Role, Tier};

/// Cron scheduling, backoff and permission service for the CRM
#[derive(Parser, Debug)]
#[command(name = "crm-cron")]
#[command(about = "Cron scheduling, backoff and permission service for the CRM")]
#[command(long_about = "
crm-cron keeps the CRM's recurring jobs on schedule. It serves the cron and
policy API, polls due jobs on demand or on an in-process cadence, and ships
a rate-limit aware client for triggering a remote instance.

EXAMPLES:
    # Start the server with layered configuration from ./config
    crm-cron serve

    # Bind to all interfaces on a custom port
    crm-cron serve --host 0.0.0.0 --port 8080

    # Validate configuration without starting the server
    crm-cron --config /etc/crm-cron/production.toml serve --dry-run

    # Apply, preview or revert schema migrations
    crm-cron migrate
    crm-cron migrate --dry-run
    crm-cron migrate --rollback 1

    # Run one poll against the configured store and print the report
    crm-cron poll

    # Insert the built-in job definitions that are missing
    crm-cron seed

    # Mint a token pair for an operator account
    crm-cron token --subject ops-1 --role admin --tenant acme

    # Ask a remote instance to poll, honouring 429 cooling windows
    crm-cron trigger --url https://crm.example.com --access-token $TOKEN
")]
#[command(version = crate::clap_long_version())]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Single configuration file, instead of the layered `config/` directory
    #[arg(short, long, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override `CRM_APP_ENV`
    ///
    /// Selects which `{environment}.toml` layer is loaded and whether the
    /// API documentation is exposed.
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Raise the log level to debug. Cannot be used with --quiet.
    #[arg(short, long)]
    pub verbose: bool,

    /// Lower the log level to error. Cannot be used with --verbose.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    ///
    /// Opens the configured job store, applies pending migrations when
    /// `database.auto_migrate` is set and starts the in-process poll trigger
    /// when `cron.trigger.enabled` is set.
    Serve {
        /// Address to bind to, e.g. 127.0.0.1 or 0.0.0.0
        #[arg(long, value_name = "ADDRESS", value_parser = super::validation::validate_host_address)]
        host: Option<String>,

        /// TCP port to listen on (1-65535)
        #[arg(short, long, value_name = "PORT", value_parser = super::validation::validate_port)]
        port: Option<u16>,

        /// Log level for this instance; wins over --verbose and --quiet
        #[arg(long, value_enum)]
        log_level: Option<LogLevel>,

        /// Validate configuration and exit
        #[arg(long)]
        dry_run: bool,
    },

    /// Database migration operations
    Migrate {
        /// List pending migrations without applying them
        #[arg(long, conflicts_with = "rollback")]
        dry_run: bool,

        /// Revert the last STEPS migrations (1-100)
        #[arg(long, value_name = "STEPS", conflicts_with = "dry_run", value_parser = super::validation::validate_rollback_steps)]
        rollback: Option<u32>,
    },

    /// Run one cron poll against the configured store and print the report
    Poll,

    /// Insert the built-in job definitions that are not present yet
    Seed,

    /// Issue an access/refresh token pair signed with `jwt.secret`
    Token {
        /// User id carried in the `sub` claim
        #[arg(long, value_name = "USER_ID", value_parser = super::validation::validate_subject)]
        subject: String,

        /// superadmin, admin, power-user or user
        #[arg(long, default_value = "user")]
        role: Role,

        #[arg(long, value_name = "TENANT_ID")]
        tenant: Option<String>,

        /// tier1 through tier4
        #[arg(long)]
        tier: Option<Tier>,

        /// manager or employee
        #[arg(long, value_name = "ROLE")]
        employee_role: Option<EmployeeRole>,
    },

    /// Ask a remote instance to run a poll through the backoff client
    Trigger {
        /// Base URL of the remote instance; overrides `client.base_url`
        #[arg(long, value_name = "URL", value_parser = super::validation::validate_base_url)]
        url: Option<String>,

        /// Bearer token for an admin account
        #[arg(long, env = "CRM_TRIGGER_ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,

        /// Used once to refresh the access token when the server answers 401
        #[arg(long, env = "CRM_TRIGGER_REFRESH_TOKEN", hide_env_values = true)]
        refresh_token: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "production", alias = "prod")]
    Production,
    #[value(name = "test")]
    Test,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    #[value(name = "error")]
    Error,
    #[value(name = "warn", alias = "warning")]
    Warn,
    #[value(name = "info")]
    Info,
    #[value(name = "debug")]
    Debug,
    #[value(name = "trace")]
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Production => crate::config::Environment::Production,
            Environment::Test => crate::config::Environment::Test,
        }
    }
}

impl Cli {
    /// Environment chosen by `--env`, falling back to `CRM_APP_ENV`
    pub fn environment(&self) -> crate::config::Environment {
        self.env
            .map(Into::into)
            .unwrap_or_else(crate::config::Environment::from_env)
    }
}

impl Commands {
    /// Principal described by `token` arguments
    pub fn token_principal(&self) -> Option<Principal> {
        let Commands::Token {
            subject,
            role,
            tenant,
            tier,
            employee_role,
        } = self
        else {
            return None;
        };

        let mut principal = Principal::new(subject.clone(), *role);
        if let Some(tenant) = tenant {
            principal = principal.with_tenant(tenant.clone());
        }
        if let Some(tier) = tier {
            principal = principal.with_tier(*tier);
        }
        if let Some(employee_role) = employee_role {
            principal = principal.with_employee_role(*employee_role);
        }
        Some(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_version_flag() {
        let err = Cli::try_parse_from(["crm-cron", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_no_subcommand() {
        let cli = Cli::try_parse_from(["crm-cron"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
        assert!(cli.env.is_none());
    }

    #[test]
    fn test_serve_command() {
        let cli = Cli::try_parse_from([
            "crm-cron",
            "serve",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--log-level",
            "warning",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Serve {
                host,
                port,
                log_level,
                dry_run,
            }) => {
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(8080));
                assert_eq!(log_level, Some(LogLevel::Warn));
                assert!(!dry_run);
            }
            other => panic!("Expected Serve command, got {other:?}"),
        }
    }

    #[test]
    fn test_serve_rejects_port_zero() {
        assert!(Cli::try_parse_from(["crm-cron", "serve", "--port", "0"]).is_err());
    }

    #[test]
    fn test_migrate_flags_conflict() {
        let err = Cli::try_parse_from(["crm-cron", "migrate", "--dry-run", "--rollback", "1"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_migrate_rollback_bounds() {
        assert!(Cli::try_parse_from(["crm-cron", "migrate", "--rollback", "0"]).is_err());
        assert!(Cli::try_parse_from(["crm-cron", "migrate", "--rollback", "101"]).is_err());

        let cli = Cli::try_parse_from(["crm-cron", "migrate", "--rollback", "2"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Migrate {
                dry_run: false,
                rollback: Some(2)
            })
        ));
    }

    #[test]
    fn test_conflicting_verbose_quiet() {
        let err = Cli::try_parse_from(["crm-cron", "--verbose", "--quiet", "poll"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_env_alias() {
        let cli = Cli::try_parse_from(["crm-cron", "--env", "prod", "seed"]).unwrap();
        assert_eq!(cli.env, Some(Environment::Production));
        assert_eq!(cli.environment(), crate::config::Environment::Production);
        assert!(matches!(cli.command, Some(Commands::Seed)));
    }

    #[test]
    fn test_token_principal() {
        let cli = Cli::try_parse_from([
            "crm-cron",
            "token",
            "--subject",
            "ops-1",
            "--role",
            "admin",
            "--tenant",
            "acme",
            "--tier",
            "tier3",
            "--employee-role",
            "manager",
        ])
        .unwrap();

        let principal = cli.command.unwrap().token_principal().unwrap();
        assert_eq!(principal.user_id, "ops-1");
        assert_eq!(principal.role, Role::Admin);
        assert_eq!(principal.tenant_id.as_deref(), Some("acme"));
        assert_eq!(principal.tier, Some(Tier::Tier3));
        assert_eq!(principal.employee_role, Some(EmployeeRole::Manager));
    }

    #[test]
    fn test_token_defaults_to_user_role() {
        let cli = Cli::try_parse_from(["crm-cron", "token", "--subject", "u-7"]).unwrap();
        let principal = cli.command.unwrap().token_principal().unwrap();
        assert_eq!(principal.role, Role::User);
        assert!(principal.tenant_id.is_none());
    }

    #[test]
    fn test_token_rejects_unknown_role() {
        assert!(
            Cli::try_parse_from(["crm-cron", "token", "--subject", "u-7", "--role", "owner"])
                .is_err()
        );
    }

    #[test]
    fn test_token_principal_only_for_token_command() {
        assert!(Commands::Poll.token_principal().is_none());
    }

    #[test]
    fn test_trigger_command() {
        let cli = Cli::try_parse_from([
            "crm-cron",
            "trigger",
            "--url",
            "https://crm.example.com",
            "--access-token",
            "abc",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Trigger {
                url,
                access_token,
                refresh_token,
            }) => {
                assert_eq!(url.as_deref(), Some("https://crm.example.com"));
                assert_eq!(access_token, "abc");
                assert!(refresh_token.is_none());
            }
            other => panic!("Expected Trigger command, got {other:?}"),
        }
    }

    #[test]
    fn test_trigger_rejects_non_http_url() {
        assert!(
            Cli::try_parse_from([
                "crm-cron",
                "trigger",
                "--url",
                "ftp://crm.example.com",
                "--access-token",
                "abc",
            ])
            .is_err()
        );
    }
}
