//! Data Transfer Objects for API requests and responses.

mod auth;
mod cron;
mod error;
mod health;
mod policy;

pub use auth::{RefreshTokenRequest, TokenResponse};
pub use cron::{CronJobResponse, CronRunResponse};
pub use error::ErrorResponse;
pub use health::{ComponentHealth, HealthResponse, HealthStatus};
pub use policy::{DiagnoseRequest, DiagnoseResponse};
