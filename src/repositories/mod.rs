//! Repository layer for data access operations.

mod cron_job_repo;

pub use cron_job_repo::CronJobRepository;
