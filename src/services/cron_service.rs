//! Cron administration service.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::AppResult;
use crate::jobs::{CronJob, CronJobStore, CronRunner, PollReport, SeedReport, seed_all};

/// Poll, list and seed operations over one job store.
#[derive(Clone)]
pub struct CronService {
    store: Arc<dyn CronJobStore>,
    runner: CronRunner,
}

impl CronService {
    /// Creates a new CronService polling at most `batch_limit` jobs per run.
    pub fn new(store: Arc<dyn CronJobStore>, batch_limit: i64) -> Self {
        let runner = CronRunner::new(store.clone(), batch_limit);
        Self { store, runner }
    }

    pub fn runner(&self) -> &CronRunner {
        &self.runner
    }

    /// Runs one bookkeeping poll at `now`; the runner logs the summary.
    pub async fn run_poll(&self, now: DateTime<Utc>) -> AppResult<PollReport> {
        self.runner.poll(now).await
    }

    /// Gets all jobs, active or not.
    pub async fn list_jobs(&self) -> AppResult<Vec<CronJob>> {
        self.store.list().await
    }

    /// Seeds the initial and data maintenance job definitions.
    pub async fn seed(&self) -> AppResult<SeedReport> {
        let report = seed_all(self.store.as_ref()).await?;
        tracing::info!(
            created = report.created.len(),
            existing = report.existing.len(),
            "Cron job seeding finished"
        );
        Ok(report)
    }
}
