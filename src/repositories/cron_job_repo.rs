//! Postgres-backed cron job repository.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::upsert::on_constraint;
use diesel_async::RunQueryDsl;
use serde_json::Value as JsonValue;

use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult, convert_diesel_error};
use crate::jobs::{CronJob, CronJobStore, ExecutionRecord, NewCronJob};
use crate::schema::cron_jobs;

/// Cheap to clone; the pool is reference counted.
#[derive(Clone)]
pub struct CronJobRepository {
    pool: AsyncDbPool,
}

impl CronJobRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
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
impl CronJobStore for CronJobRepository {
    async fn list_active(&self, limit: i64) -> AppResult<Vec<CronJob>> {
        let mut conn = self.pool.get().await?;

        cron_jobs::table
            .filter(cron_jobs::is_active.eq(true))
            .order(cron_jobs::id.asc())
            .limit(limit)
            .select(CronJob::as_select())
            .load(&mut conn)
            .await
            .map_err(|e| convert_diesel_error(e, "list active cron jobs"))
    }

    async fn list(&self) -> AppResult<Vec<CronJob>> {
        let mut conn = self.pool.get().await?;

        cron_jobs::table
            .order(cron_jobs::id.asc())
            .select(CronJob::as_select())
            .load(&mut conn)
            .await
            .map_err(|e| convert_diesel_error(e, "list cron jobs"))
    }

    async fn record_execution(&self, id: i32, record: ExecutionRecord) -> AppResult<()> {
        let mut conn = self.pool.get().await?;

        let updated = diesel::update(cron_jobs::table.find(id))
            .set((
                cron_jobs::last_executed.eq(Some(record.executed_at)),
                cron_jobs::next_execution.eq(Some(record.next_execution)),
                cron_jobs::execution_count.eq(cron_jobs::execution_count + 1),
                cron_jobs::last_result.eq(Some(record.last_result)),
                cron_jobs::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .await
            .map_err(|e| convert_diesel_error(e, "record cron job execution"))?;

        if updated == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    async fn record_failure(&self, id: i32, last_result: JsonValue) -> AppResult<()> {
        let mut conn = self.pool.get().await?;

        let updated = diesel::update(cron_jobs::table.find(id))
            .set((
                cron_jobs::error_count.eq(cron_jobs::error_count + 1),
                cron_jobs::last_result.eq(Some(last_result)),
                cron_jobs::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .await
            .map_err(|e| convert_diesel_error(e, "record cron job failure"))?;

        if updated == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    async fn insert_if_absent(&self, job: NewCronJob) -> AppResult<bool> {
        let mut conn = self.pool.get().await?;

        let inserted = diesel::insert_into(cron_jobs::table)
            .values(&job)
            .on_conflict(on_constraint("cron_jobs_function_name_key"))
            .do_nothing()
            .execute(&mut conn)
            .await
            .map_err(|e| convert_diesel_error(e, "seed cron job"))?;

        Ok(inserted > 0)
    }
}
