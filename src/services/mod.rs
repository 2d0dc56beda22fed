//! Service layer for business logic operations.

mod cron_service;

pub use cron_service::CronService;

use std::sync::Arc;

use crate::config::CronConfig;
use crate::jobs::CronJobStore;

/// Aggregates all services for convenient access.
///
/// Cloning is cheap; the store is shared behind an `Arc`.
#[derive(Clone)]
pub struct Services {
    pub cron: CronService,
}

impl Services {
    pub fn new(store: Arc<dyn CronJobStore>, config: &CronConfig) -> Self {
        Self {
            cron: CronService::new(store, config.batch_limit),
        }
    }
}
