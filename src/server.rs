//! HTTP server lifecycle: startup, optional in-process trigger, graceful shutdown

use tokio::net::TcpListener;
use tokio::signal;

use crate::api::routes::create_router;
use crate::config::{Environment, Settings};
use crate::db::run_pending_migrations;
use crate::jobs::PollTrigger;
use crate::state::AppState;

pub struct Server {
    settings: Settings,
    environment: Environment,
}

impl Server {
    pub fn new(settings: Settings, environment: Environment) -> Self {
        Self {
            settings,
            environment,
        }
    }

    /// Start the server and run until a shutdown signal arrives.
    ///
    /// # Errors
    ///
    /// Fails on invalid JWT settings, store or migration failures, an invalid
    /// trigger schedule, and when the address cannot be bound.
    pub async fn run(self) -> anyhow::Result<()> {
        let settings = &self.settings;

        tracing::info!(
            app_name = %settings.application.name,
            app_version = %settings.application.version,
            environment = %self.environment.as_str(),
            "Application starting"
        );
        tracing::info!(
            host = %settings.server.host,
            port = settings.server.port,
            request_timeout = settings.server.request_timeout,
            "Server configuration loaded"
        );
        tracing::info!(
            store = ?settings.cron.store,
            batch_limit = settings.cron.batch_limit,
            seed_on_startup = settings.cron.seed_on_startup,
            trigger_enabled = settings.cron.trigger.enabled,
            "Cron configuration loaded"
        );
        tracing::info!(
            access_token_expiration = settings.jwt.access_token_expiration,
            refresh_token_expiration = settings.jwt.refresh_token_expiration,
            secret_configured = !settings.jwt.secret.is_empty(),
            "JWT configuration loaded"
        );

        settings.jwt.validate().map_err(|e| {
            tracing::error!(error = %e, "JWT configuration validation failed");
            anyhow::anyhow!("JWT configuration validation failed: {}", e)
        })?;

        let state = AppState::from_settings(settings).await?;

        if state.db_pool.is_some() && settings.database.auto_migrate {
            let applied = run_pending_migrations(&settings.database.url).await?;
            tracing::info!(applied = applied.len(), "Database migrations applied");
        }

        if settings.cron.seed_on_startup {
            state.services.cron.seed().await?;
        }

        let trigger = if settings.cron.trigger.enabled {
            let trigger = PollTrigger::new(
                state.services.cron.runner().clone(),
                settings.cron.trigger.schedule.clone(),
            )
            .await?;
            trigger.start().await?;
            Some(trigger)
        } else {
            None
        };

        let router = create_router(state, !self.environment.is_production());

        let address = settings.server.address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!(error = %e, address = %address, "Failed to bind to address");
            anyhow::anyhow!("Failed to bind to {}: {}", address, e)
        })?;
        tracing::info!(address = %address, "Server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        if let Some(trigger) = trigger
            && let Err(e) = trigger.stop().await
        {
            tracing::warn!(error = %e, "Failed to stop the in-process cron trigger");
        }

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Resolves on Ctrl+C or SIGTERM.
///
/// A handler that cannot be installed is logged and never fires, so the
/// other signal still shuts the server down.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
