use std::time::Duration;

use crate::config::ClientConfig;
use crate::external::fetch::FetchError;

/// `User-Agent` sent on every outbound request
pub fn user_agent() -> String {
    format!("crm-cron/{}", crate::pkg_version())
}

/// Build the pooled `reqwest` client used for calls to the CRM API.
///
/// One client per process; it keeps connections to the API host alive
/// between polls.
pub fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client, FetchError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .gzip(true)
        .user_agent(user_agent())
        .build()?;
    Ok(client)
}
