//! Cron job bookkeeping: schedule evaluation, the poll runner, seeding and
//! an optional in-process trigger.

pub mod error;
pub mod memory;
pub mod models;
pub mod runner;
pub mod schedule;
pub mod seed;
pub mod store;
pub mod trigger;

pub use error::{JobError, JobResult};
pub use memory::MemoryCronJobStore;
pub use models::{CronJob, ExecutionRecord, NewCronJob};
pub use runner::{CronRunner, JobOutcome, JobOutcomeStatus, PollReport, PollSummary};
pub use schedule::{ScheduleKind, next_execution, validate_expression};
pub use seed::{JobDefinition, SeedReport, data_maintenance_jobs, initial_jobs, seed, seed_all};
pub use store::CronJobStore;
pub use trigger::PollTrigger;
