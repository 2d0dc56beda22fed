//! Cron administration DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::jobs::{CronJob, JobOutcome, PollReport, PollSummary};

/// Response of `POST /api/cron/run`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "success": true,
    "summary": { "total_jobs": 2, "executed": 1, "skipped": 1, "failed": 0 },
    "results": [
        {
            "job_id": 1,
            "job_name": "Process activity reminders",
            "status": "executed",
            "next_run": "2025-01-01T12:05:00Z"
        },
        { "job_id": 2, "job_name": "Send daily digest", "status": "skipped" }
    ],
    "duration_ms": 12
}))]
pub struct CronRunResponse {
    pub success: bool,
    pub summary: PollSummary,
    pub results: Vec<JobOutcome>,
    pub duration_ms: u64,
}

impl From<PollReport> for CronRunResponse {
    fn from(report: PollReport) -> Self {
        Self {
            success: true,
            summary: report.summary,
            results: report.results,
            duration_ms: report.duration_ms,
        }
    }
}

/// A cron job row as exposed by `GET /api/cron/jobs`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CronJobResponse {
    pub id: i32,
    pub name: String,
    #[schema(example = "processActivityReminders")]
    pub function_name: String,
    #[schema(example = "every_5_minutes")]
    pub schedule_expression: String,
    pub is_active: bool,
    pub next_execution: Option<DateTime<Utc>>,
    pub last_executed: Option<DateTime<Utc>>,
    pub execution_count: i32,
    pub error_count: i32,
    pub max_retries: i32,
    pub timeout_seconds: i32,
    #[schema(value_type = Option<Object>)]
    pub last_result: Option<Value>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CronJob> for CronJobResponse {
    fn from(job: CronJob) -> Self {
        Self {
            id: job.id,
            name: job.name,
            function_name: job.function_name,
            schedule_expression: job.schedule_expression,
            is_active: job.is_active,
            next_execution: job.next_execution,
            last_executed: job.last_executed,
            execution_count: job.execution_count,
            error_count: job.error_count,
            max_retries: job.max_retries,
            timeout_seconds: job.timeout_seconds,
            last_result: job.last_result,
            description: job.description,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}
