//! HTTP request handlers for API endpoints.

pub mod auth;
pub mod cron;
pub mod health;
pub mod policy;
