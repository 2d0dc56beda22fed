use thiserror::Error;

use crate::error::AppError;

/// Per-job failures recorded by the runner.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Schedule '{0}' has no upcoming run")]
    NoUpcomingRun(String),

    #[error("Invalid schedule expression '{0}'")]
    InvalidSchedule(String),

    #[error(transparent)]
    Store(#[from] AppError),

    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

impl From<JobError> for AppError {
    fn from(error: JobError) -> Self {
        match error {
            JobError::Store(inner) => inner,
            JobError::InvalidSchedule(expr) => AppError::Validation {
                field: "schedule_expression".to_string(),
                reason: format!(
                    "'{}' is neither a schedule keyword nor a cron expression",
                    expr
                ),
            },
            other => AppError::Internal {
                source: anyhow::Error::from(other),
            },
        }
    }
}

pub type JobResult<T> = Result<T, JobError>;
