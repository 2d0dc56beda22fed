//! Built-in job definitions and the idempotent seeding routine.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppResult;
use crate::jobs::models::NewCronJob;
use crate::jobs::store::CronJobStore;

/// Static description of a job the platform ships with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobDefinition {
    pub name: &'static str,
    pub function_name: &'static str,
    pub schedule_expression: &'static str,
    pub max_retries: i32,
    pub timeout_seconds: i32,
    pub description: &'static str,
}

impl JobDefinition {
    /// New rows start without `next_execution`, so the first poll runs them.
    pub fn to_new_job(&self) -> NewCronJob {
        NewCronJob {
            name: self.name.to_string(),
            function_name: self.function_name.to_string(),
            schedule_expression: self.schedule_expression.to_string(),
            is_active: true,
            next_execution: None,
            max_retries: self.max_retries,
            timeout_seconds: self.timeout_seconds,
            description: Some(self.description.to_string()),
        }
    }
}

const INITIAL_JOBS: &[JobDefinition] = &[
    JobDefinition {
        name: "Process activity reminders",
        function_name: "processActivityReminders",
        schedule_expression: "every_5_minutes",
        max_retries: 3,
        timeout_seconds: 120,
        description: "Send due reminders for calls, meetings and tasks",
    },
    JobDefinition {
        name: "Sync email inbox",
        function_name: "syncEmailInbox",
        schedule_expression: "every_15_minutes",
        max_retries: 3,
        timeout_seconds: 300,
        description: "Pull new messages and link them to contacts and leads",
    },
    JobDefinition {
        name: "Refresh dashboard stats",
        function_name: "refreshDashboardStats",
        schedule_expression: "every_hour",
        max_retries: 2,
        timeout_seconds: 300,
        description: "Recompute cached per-tenant dashboard aggregates",
    },
    JobDefinition {
        name: "Send daily digest",
        function_name: "sendDailyDigest",
        schedule_expression: "daily",
        max_retries: 1,
        timeout_seconds: 600,
        description: "Email each user a summary of yesterday's pipeline activity",
    },
];

const DATA_MAINTENANCE_JOBS: &[JobDefinition] = &[
    JobDefinition {
        name: "Archive stale leads",
        function_name: "archiveStaleLeads",
        schedule_expression: "daily",
        max_retries: 2,
        timeout_seconds: 900,
        description: "Archive leads with no activity in the retention window",
    },
    JobDefinition {
        name: "Purge expired sessions",
        function_name: "purgeExpiredSessions",
        schedule_expression: "every_hour",
        max_retries: 3,
        timeout_seconds: 120,
        description: "Delete expired refresh sessions and one-time tokens",
    },
    JobDefinition {
        name: "Recalculate activity counts",
        function_name: "recalculateActivityCounts",
        schedule_expression: "30 2 * * *",
        max_retries: 2,
        timeout_seconds: 1800,
        description: "Rebuild denormalized activity counters on accounts and contacts",
    },
    JobDefinition {
        name: "Clean up orphaned records",
        function_name: "cleanupOrphanedRecords",
        schedule_expression: "0 3 * * Sun",
        max_retries: 1,
        timeout_seconds: 3600,
        description: "Remove notes and attachments whose parent record was deleted",
    },
];

pub fn initial_jobs() -> &'static [JobDefinition] {
    INITIAL_JOBS
}

pub fn data_maintenance_jobs() -> &'static [JobDefinition] {
    DATA_MAINTENANCE_JOBS
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SeedReport {
    /// `function_name`s inserted by this run
    pub created: Vec<String>,
    /// `function_name`s that were already present and left untouched
    pub existing: Vec<String>,
}

impl SeedReport {
    pub fn merge(mut self, other: SeedReport) -> Self {
        self.created.extend(other.created);
        self.existing.extend(other.existing);
        self
    }
}

/// Insert each definition unless its `function_name` already exists.
///
/// Existing rows are never modified, so operator edits survive reseeding.
pub async fn seed(
    store: &dyn CronJobStore,
    definitions: &[JobDefinition],
) -> AppResult<SeedReport> {
    let mut report = SeedReport::default();

    for definition in definitions {
        let function_name = definition.function_name.to_string();
        if store.insert_if_absent(definition.to_new_job()).await? {
            tracing::info!(function_name = %function_name, "Seeded cron job");
            report.created.push(function_name);
        } else {
            tracing::debug!(function_name = %function_name, "Cron job already present");
            report.existing.push(function_name);
        }
    }

    Ok(report)
}

/// Seed both the initial and the data maintenance definitions
pub async fn seed_all(store: &dyn CronJobStore) -> AppResult<SeedReport> {
    let initial = seed(store, initial_jobs()).await?;
    let maintenance = seed(store, data_maintenance_jobs()).await?;
    Ok(initial.merge(maintenance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::memory::MemoryCronJobStore;
    use crate::jobs::schedule::validate_expression;
    use std::collections::HashSet;

    #[test]
    fn test_definitions_have_valid_schedules() {
        for definition in initial_jobs().iter().chain(data_maintenance_jobs()) {
            assert!(
                validate_expression(definition.schedule_expression).is_ok(),
                "{} has an invalid schedule",
                definition.function_name
            );
        }
    }

    #[test]
    fn test_function_names_are_unique() {
        let names: HashSet<_> = initial_jobs()
            .iter()
            .chain(data_maintenance_jobs())
            .map(|d| d.function_name)
            .collect();
        assert_eq!(names.len(), initial_jobs().len() + data_maintenance_jobs().len());
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = MemoryCronJobStore::new();

        let first = seed_all(&store).await.unwrap();
        assert_eq!(first.created.len(), 8);
        assert!(first.existing.is_empty());

        let second = seed_all(&store).await.unwrap();
        assert!(second.created.is_empty());
        assert_eq!(second.existing.len(), 8);
        assert_eq!(store.list().await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_seed_does_not_overwrite_existing_rows() {
        let store = MemoryCronJobStore::new();
        let mut edited = initial_jobs()[0].to_new_job();
        edited.schedule_expression = "every_hour".to_string();
        edited.is_active = false;
        store.insert_if_absent(edited).await.unwrap();

        let report = seed(&store, initial_jobs()).await.unwrap();
        assert_eq!(report.existing, vec!["processActivityReminders".to_string()]);
        assert_eq!(report.created.len(), initial_jobs().len() - 1);

        let job = store.get(1).await.unwrap();
        assert_eq!(job.schedule_expression, "every_hour");
        assert!(!job.is_active);
    }
}
