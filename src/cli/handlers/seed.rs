//! Seed command handler

use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::jobs::SeedReport;
use crate::services::CronService;
use crate::state::build_store;

pub struct SeedCommandHandler {
    config: Settings,
}

impl SeedCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Insert missing built-in jobs; rows that already exist are left alone
    pub async fn execute(&self) -> AppResult<SeedReport> {
        let (store, _pool) = build_store(&self.config).await?;
        let report = CronService::new(store, self.config.cron.batch_limit)
            .seed()
            .await?;

        let rendered = serde_json::to_string_pretty(&report).map_err(AppError::internal)?;
        println!("{}", rendered);
        Ok(report)
    }
}
