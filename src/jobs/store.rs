use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::AppResult;
use crate::jobs::models::{CronJob, ExecutionRecord, NewCronJob};

/// Persistence seam for cron job rows.
///
/// Implemented by the Postgres repository and by the in-memory store.
#[async_trait]
pub trait CronJobStore: Send + Sync {
    /// Active jobs in id order, at most `limit`
    async fn list_active(&self, limit: i64) -> AppResult<Vec<CronJob>>;

    /// Every job, active or not, in id order
    async fn list(&self) -> AppResult<Vec<CronJob>>;

    /// Store execution bookkeeping and increment `execution_count` by one
    async fn record_execution(&self, id: i32, record: ExecutionRecord) -> AppResult<()>;

    /// Store `last_result` and increment `error_count` by one
    async fn record_failure(&self, id: i32, last_result: JsonValue) -> AppResult<()>;

    /// Insert unless a job with the same `function_name` exists.
    ///
    /// Returns `true` when a row was created.
    async fn insert_if_absent(&self, job: NewCronJob) -> AppResult<bool>;
}
