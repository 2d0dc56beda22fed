//! Poll command handler: one bookkeeping pass over due jobs

use chrono::Utc;

use crate::api::dto::CronRunResponse;
use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::services::CronService;
use crate::state::build_store;

pub struct PollCommandHandler {
    config: Settings,
}

impl PollCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Poll the configured store once and print the report as JSON
    pub async fn execute(&self) -> AppResult<CronRunResponse> {
        let (store, _pool) = build_store(&self.config).await?;
        let service = CronService::new(store, self.config.cron.batch_limit);

        let response = CronRunResponse::from(service.run_poll(Utc::now()).await?);
        let rendered = serde_json::to_string_pretty(&response).map_err(AppError::internal)?;
        println!("{}", rendered);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CronStoreBackend;

    #[tokio::test]
    async fn test_poll_empty_memory_store() {
        let mut config = Settings::default();
        config.cron.store = CronStoreBackend::Memory;

        let response = PollCommandHandler::new(config).execute().await.unwrap();
        assert!(response.success);
        assert_eq!(response.summary.total_jobs, 0);
        assert!(response.results.is_empty());
    }
}
