//! Trigger command handler: ask a remote instance to poll

use std::sync::Arc;

use crate::api::dto::CronRunResponse;
use crate::config::Settings;
use crate::external::{BackoffClient, CronTriggerClient, FetchError, HttpTokenRefresher};

pub struct TriggerCommandHandler {
    config: Settings,
}

impl TriggerCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// `POST /api/cron/run` on `client.base_url` and print the report.
    ///
    /// With a refresh token, a 401 is answered by one refresh and retry.
    pub async fn execute(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<CronRunResponse, FetchError> {
        let mut client =
            BackoffClient::from_config(&self.config.client)?.with_access_token(access_token);
        if let Some(refresh_token) = refresh_token {
            let refresher =
                HttpTokenRefresher::new(client.http().clone(), client.base_url(), refresh_token)?;
            client = client.with_refresher(Arc::new(refresher));
        }

        tracing::info!(base_url = %client.base_url(), "Triggering remote cron poll");
        let response = CronTriggerClient::new(client).run().await?;

        println!(
            "✓ Poll finished in {}ms: {} executed, {} skipped, {} failed of {} job(s)",
            response.duration_ms,
            response.summary.executed,
            response.summary.skipped,
            response.summary.failed,
            response.summary.total_jobs
        );
        Ok(response)
    }
}
