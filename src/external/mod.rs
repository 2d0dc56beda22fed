//! Outbound calls to the CRM API.

pub mod backoff;
pub mod client;
pub mod fetch;
pub mod trigger;

pub use backoff::{BackoffEntry, BackoffState};
pub use client::build_http_client;
pub use fetch::{BackoffClient, FetchError, HttpTokenRefresher, TokenRefresher};
pub use trigger::CronTriggerClient;
