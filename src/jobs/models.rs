use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::schema::cron_jobs;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = cron_jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CronJob {
    pub id: i32,
    pub name: String,
    /// Target function dispatched by the worker pool; unique per job
    pub function_name: String,
    pub schedule_expression: String,
    pub is_active: bool,
    pub next_execution: Option<DateTime<Utc>>,
    pub last_executed: Option<DateTime<Utc>>,
    pub execution_count: i32,
    pub error_count: i32,
    pub max_retries: i32,
    pub timeout_seconds: i32,
    pub last_result: Option<JsonValue>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CronJob {
    /// Whether the runner should execute this job at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.next_execution {
            Some(next) => next <= now,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = cron_jobs)]
pub struct NewCronJob {
    pub name: String,
    pub function_name: String,
    pub schedule_expression: String,
    pub is_active: bool,
    pub next_execution: Option<DateTime<Utc>>,
    pub max_retries: i32,
    pub timeout_seconds: i32,
    pub description: Option<String>,
}

/// Bookkeeping written after a successful poll of one job.
///
/// `execution_count` is incremented by the store, not carried here.
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    pub executed_at: DateTime<Utc>,
    pub next_execution: DateTime<Utc>,
    pub last_result: JsonValue,
}
