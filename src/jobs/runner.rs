//! Cron job runner.
//!
//! A poll walks the active jobs once, in store order. Due jobs get their
//! bookkeeping advanced; the target function itself is dispatched by a
//! separate worker pool that reads `function_name`.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::error::AppResult;
use crate::jobs::error::{JobError, JobResult};
use crate::jobs::models::{CronJob, ExecutionRecord};
use crate::jobs::schedule::next_execution;
use crate::jobs::store::CronJobStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobOutcomeStatus {
    Executed,
    Skipped,
    Failed,
}

/// Per-job entry in a poll report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct JobOutcome {
    pub job_id: i32,
    pub job_name: String,
    pub status: JobOutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PollSummary {
    pub total_jobs: usize,
    pub executed: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PollReport {
    pub summary: PollSummary,
    pub results: Vec<JobOutcome>,
    pub duration_ms: u64,
}

#[derive(Clone)]
pub struct CronRunner {
    store: Arc<dyn CronJobStore>,
    batch_limit: i64,
}

impl CronRunner {
    pub fn new(store: Arc<dyn CronJobStore>, batch_limit: i64) -> Self {
        Self { store, batch_limit }
    }

    /// Run one poll at `now`.
    ///
    /// Only a failure to fetch the batch is returned as an error; per-job
    /// failures are recorded on the row and reported in the results.
    pub async fn poll(&self, now: DateTime<Utc>) -> AppResult<PollReport> {
        let started = Instant::now();
        let jobs = self.store.list_active(self.batch_limit).await?;

        let mut summary = PollSummary {
            total_jobs: jobs.len(),
            ..PollSummary::default()
        };
        let mut results = Vec::with_capacity(jobs.len());

        for job in jobs {
            let outcome = self.process(&job, now).await;
            match outcome.status {
                JobOutcomeStatus::Executed => summary.executed += 1,
                JobOutcomeStatus::Skipped => summary.skipped += 1,
                JobOutcomeStatus::Failed => summary.failed += 1,
            }
            results.push(outcome);
        }

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            total = summary.total_jobs,
            executed = summary.executed,
            skipped = summary.skipped,
            failed = summary.failed,
            duration_ms,
            "Cron poll completed"
        );

        Ok(PollReport {
            summary,
            results,
            duration_ms,
        })
    }

    async fn process(&self, job: &CronJob, now: DateTime<Utc>) -> JobOutcome {
        if !job.is_due(now) {
            tracing::debug!(job_id = job.id, next_execution = ?job.next_execution, "Job not due");
            return JobOutcome {
                job_id: job.id,
                job_name: job.name.clone(),
                status: JobOutcomeStatus::Skipped,
                next_run: job.next_execution,
                error: None,
            };
        }

        match self.execute(job, now).await {
            Ok(next_run) => {
                tracing::info!(
                    job_id = job.id,
                    function_name = %job.function_name,
                    next_run = %next_run,
                    "Job executed"
                );
                JobOutcome {
                    job_id: job.id,
                    job_name: job.name.clone(),
                    status: JobOutcomeStatus::Executed,
                    next_run: Some(next_run),
                    error: None,
                }
            }
            Err(e) => {
                let message = describe(&e);
                tracing::error!(job_id = job.id, error = %message, "Job failed");

                let last_result = json!({
                    "status": "failed",
                    "error": message,
                    "failed_at": now,
                });
                if let Err(record_err) = self.store.record_failure(job.id, last_result).await {
                    tracing::error!(
                        job_id = job.id,
                        error = %record_err,
                        "Failed to record job failure"
                    );
                }

                JobOutcome {
                    job_id: job.id,
                    job_name: job.name.clone(),
                    status: JobOutcomeStatus::Failed,
                    next_run: None,
                    error: Some(message),
                }
            }
        }
    }

    async fn execute(&self, job: &CronJob, now: DateTime<Utc>) -> JobResult<DateTime<Utc>> {
        let next_run = next_execution(&job.schedule_expression, now)
            .ok_or_else(|| JobError::NoUpcomingRun(job.schedule_expression.clone()))?;

        let record = ExecutionRecord {
            executed_at: now,
            next_execution: next_run,
            last_result: json!({
                "status": "executed",
                "executed_at": now,
                "next_run": next_run,
            }),
        };
        self.store.record_execution(job.id, record).await?;
        Ok(next_run)
    }
}

/// Error text with its source chain, as stored in `last_result`
fn describe(error: &JobError) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
