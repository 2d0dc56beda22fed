//! Serve command handler

use crate::config::{Environment, Settings};
use crate::server::Server;

pub struct ServeCommandHandler {
    config: Settings,
    environment: Environment,
}

impl ServeCommandHandler {
    pub fn new(config: Settings, environment: Environment) -> Self {
        Self {
            config,
            environment,
        }
    }

    /// Start the server, or only report the effective configuration when
    /// `dry_run` is set. Validation has already run by the time this is called.
    pub async fn execute(self, dry_run: bool) -> anyhow::Result<()> {
        if dry_run {
            for line in self.summary() {
                println!("✓ {}", line);
            }
            println!("Dry run completed successfully - configuration is ready for deployment");
            return Ok(());
        }

        Server::new(self.config, self.environment).run().await
    }

    /// One line per setting an operator usually wants to double check
    pub fn summary(&self) -> Vec<String> {
        let cron = &self.config.cron;
        let mut lines = vec![
            "Configuration is valid".to_string(),
            format!("Environment: {}", self.environment.as_str()),
            format!("Server would bind to: {}", self.config.server.address()),
            format!("Cron store: {:?}", cron.store),
            format!("Poll batch limit: {}", cron.batch_limit),
        ];

        if cron.trigger.enabled {
            lines.push(format!("In-process trigger: {}", cron.trigger.schedule));
        } else {
            lines.push("In-process trigger: disabled".to_string());
        }
        if cron.seed_on_startup {
            lines.push("Built-in jobs are seeded on startup".to_string());
        }
        if !self.environment.is_production() {
            lines.push("API documentation is exposed at /swagger-ui".to_string());
        }
        lines
    }
}
