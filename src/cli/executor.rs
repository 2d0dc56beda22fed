//! Dispatch parsed commands to their handlers

use super::handlers::{
    MigrateCommandHandler, PollCommandHandler, SeedCommandHandler, ServeCommandHandler,
    TokenCommandHandler, TriggerCommandHandler,
};
use super::parser::{Cli, Commands};
use crate::config::Settings;

/// Run the selected command with merged and validated settings.
///
/// No subcommand means `serve` with the configured host and port.
pub async fn execute_command(cli: &Cli, settings: Settings) -> anyhow::Result<()> {
    let environment = cli.environment();

    match &cli.command {
        None => ServeCommandHandler::new(settings, environment)
            .execute(false)
            .await?,
        Some(Commands::Serve { dry_run, .. }) => {
            ServeCommandHandler::new(settings, environment)
                .execute(*dry_run)
                .await?
        }
        Some(Commands::Migrate { dry_run, rollback }) => {
            MigrateCommandHandler::new(settings)
                .execute(*dry_run, *rollback)
                .await?
        }
        Some(Commands::Poll) => {
            PollCommandHandler::new(settings).execute().await?;
        }
        Some(Commands::Seed) => {
            SeedCommandHandler::new(settings).execute().await?;
        }
        Some(command @ Commands::Token { .. }) => {
            let principal = command
                .token_principal()
                .ok_or_else(|| anyhow::anyhow!("token arguments missing"))?;
            TokenCommandHandler::new(settings).execute(&principal)?;
        }
        Some(Commands::Trigger {
            access_token,
            refresh_token,
            ..
        }) => {
            TriggerCommandHandler::new(settings)
                .execute(access_token, refresh_token.as_deref())
                .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CronStoreBackend;
    use clap::Parser;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.cron.store = CronStoreBackend::Memory;
        settings.jwt.secret = "an-adequately-long-test-secret-value".to_string();
        settings
    }

    #[tokio::test]
    async fn test_dispatch_local_commands() {
        for args in [
            vec!["crm-cron", "poll"],
            vec!["crm-cron", "seed"],
            vec!["crm-cron", "serve", "--dry-run"],
            vec!["crm-cron", "token", "--subject", "ops-1", "--role", "admin"],
        ] {
            let cli = Cli::try_parse_from(&args).unwrap();
            assert!(
                execute_command(&cli, settings()).await.is_ok(),
                "{args:?} should succeed"
            );
        }
    }

    #[tokio::test]
    async fn test_trigger_error_propagates() {
        let cli = Cli::try_parse_from([
            "crm-cron",
            "trigger",
            "--url",
            "http://127.0.0.1:1",
            "--access-token",
            "abc",
        ])
        .unwrap();
        let mut settings = settings();
        settings.client.base_url = "http://127.0.0.1:1".to_string();

        assert!(execute_command(&cli, settings).await.is_err());
    }
}
