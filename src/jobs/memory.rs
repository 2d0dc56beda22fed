//! In-memory cron job store for development and tests.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};
use crate::jobs::models::{CronJob, ExecutionRecord, NewCronJob};
use crate::jobs::store::CronJobStore;

#[derive(Default)]
pub struct MemoryCronJobStore {
    jobs: RwLock<Vec<CronJob>>,
}

impl MemoryCronJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with pre-built rows, kept in id order
    pub fn with_jobs(mut jobs: Vec<CronJob>) -> Self {
        jobs.sort_by_key(|job| job.id);
        Self {
            jobs: RwLock::new(jobs),
        }
    }

    pub async fn get(&self, id: i32) -> Option<CronJob> {
        self.jobs.read().await.iter().find(|job| job.id == id).cloned()
    }

    fn not_found(id: i32) -> AppError {
        AppError::NotFound {
            entity: "CronJob".to_string(),
            field: "id".to_string(),
            value: id.to_string(),
        }
    }
}

#[async_trait]
impl CronJobStore for MemoryCronJobStore {
    async fn list_active(&self, limit: i64) -> AppResult<Vec<CronJob>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .jobs
            .read()
            .await
            .iter()
            .filter(|job| job.is_active)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list(&self) -> AppResult<Vec<CronJob>> {
        Ok(self.jobs.read().await.clone())
    }

    async fn record_execution(&self, id: i32, record: ExecutionRecord) -> AppResult<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .iter_mut()
            .find(|job| job.id == id)
            .ok_or_else(|| Self::not_found(id))?;

        job.last_executed = Some(record.executed_at);
        job.next_execution = Some(record.next_execution);
        job.execution_count += 1;
        job.last_result = Some(record.last_result);
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn record_failure(&self, id: i32, last_result: JsonValue) -> AppResult<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .iter_mut()
            .find(|job| job.id == id)
            .ok_or_else(|| Self::not_found(id))?;

        job.error_count += 1;
        job.last_result = Some(last_result);
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_if_absent(&self, new_job: NewCronJob) -> AppResult<bool> {
        let mut jobs = self.jobs.write().await;
        if jobs
            .iter()
            .any(|job| job.function_name == new_job.function_name)
        {
            return Ok(false);
        }

        let now = Utc::now();
        let id = jobs.iter().map(|job| job.id).max().unwrap_or(0) + 1;
        jobs.push(CronJob {
            id,
            name: new_job.name,
            function_name: new_job.function_name,
            schedule_expression: new_job.schedule_expression,
            is_active: new_job.is_active,
            next_execution: new_job.next_execution,
            last_executed: None,
            execution_count: 0,
            error_count: 0,
            max_retries: new_job.max_retries,
            timeout_seconds: new_job.timeout_seconds,
            last_result: None,
            description: new_job.description,
            created_at: now,
            updated_at: now,
        });
        Ok(true)
    }
}
