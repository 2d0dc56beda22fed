//! Application state for Axum web framework.
//!
//! Contains shared services and resources that are accessible
//! across all request handlers.

use std::sync::Arc;

use crate::config::{CronConfig, CronStoreBackend, JwtConfig, Settings};
use crate::db::{AsyncDbPool, establish_async_connection_pool};
use crate::error::AppResult;
use crate::jobs::{CronJobStore, MemoryCronJobStore};
use crate::repositories::CronJobRepository;
use crate::services::Services;

/// Application state containing all shared services and resources.
///
/// Cloning is cheap since both Services and AsyncDbPool use Arc internally.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    /// Present when jobs live in Postgres; the readiness probe pings it
    pub db_pool: Option<AsyncDbPool>,
    /// JWT configuration for token generation and validation
    pub jwt_config: JwtConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CronJobStore>,
        db_pool: Option<AsyncDbPool>,
        jwt_config: JwtConfig,
        cron_config: &CronConfig,
    ) -> Self {
        Self {
            services: Services::new(store, cron_config),
            db_pool,
            jwt_config,
        }
    }

    /// Build the job store selected by `cron.store` and wrap it in state.
    pub async fn from_settings(settings: &Settings) -> AppResult<Self> {
        let (store, db_pool) = build_store(settings).await?;
        Ok(Self::new(
            store,
            db_pool,
            settings.jwt.clone(),
            &settings.cron,
        ))
    }
}

/// Open the configured cron job store.
///
/// The Postgres backend also hands back its pool so callers can run
/// migrations or health checks against it.
pub async fn build_store(
    settings: &Settings,
) -> AppResult<(Arc<dyn CronJobStore>, Option<AsyncDbPool>)> {
    match settings.cron.store {
        CronStoreBackend::Postgres => {
            let pool = establish_async_connection_pool(&settings.database).await?;
            tracing::info!(
                max_connections = settings.database.max_connections,
                "Database connection pool initialized"
            );
            let store: Arc<dyn CronJobStore> = Arc::new(CronJobRepository::new(pool.clone()));
            Ok((store, Some(pool)))
        }
        CronStoreBackend::Memory => {
            tracing::warn!("Using the in-memory cron job store; rows are lost on restart");
            Ok((Arc::new(MemoryCronJobStore::new()), None))
        }
    }
}
