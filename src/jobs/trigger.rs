//! In-process poll trigger for deployments without an external scheduler.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::jobs::error::{JobError, JobResult};
use crate::jobs::runner::CronRunner;

/// Calls `CronRunner::poll` on a cron cadence using tokio-cron-scheduler
pub struct PollTrigger {
    scheduler: Arc<Mutex<JobScheduler>>,
    runner: CronRunner,
    schedule: String,
}

impl PollTrigger {
    pub async fn new(runner: CronRunner, schedule: impl Into<String>) -> JobResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| JobError::Scheduler(e.to_string()))?;

        Ok(Self {
            scheduler: Arc::new(Mutex::new(scheduler)),
            runner,
            schedule: schedule.into(),
        })
    }

    pub async fn start(&self) -> JobResult<()> {
        let runner = self.runner.clone();

        let job = Job::new_async(self.schedule.as_str(), move |_uuid, _lock| {
            let runner = runner.clone();
            Box::pin(async move {
                if let Err(e) = runner.poll(Utc::now()).await {
                    tracing::error!(error = %e, "Scheduled cron poll failed");
                }
            })
        })
        .map_err(|_| JobError::InvalidSchedule(self.schedule.clone()))?;

        let scheduler = self.scheduler.lock().await;
        scheduler
            .add(job)
            .await
            .map_err(|e| JobError::Scheduler(e.to_string()))?;
        scheduler
            .start()
            .await
            .map_err(|e| JobError::Scheduler(e.to_string()))?;

        tracing::info!(schedule = %self.schedule, "In-process cron trigger started");
        Ok(())
    }

    pub async fn stop(&self) -> JobResult<()> {
        self.scheduler
            .lock()
            .await
            .shutdown()
            .await
            .map_err(|e| JobError::Scheduler(e.to_string()))?;
        tracing::info!("In-process cron trigger stopped");
        Ok(())
    }
}
