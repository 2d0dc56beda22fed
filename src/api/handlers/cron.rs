//! Cron administration handlers.

use axum::{Extension, Json, extract::State};
use chrono::Utc;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::api::doc::CRON_TAG;
use crate::api::dto::{CronJobResponse, CronRunResponse, ErrorResponse};
use crate::api::middleware::authorize;
use crate::error::AppResult;
use crate::jobs::SeedReport;
use crate::policy::{Principal, Resource};
use crate::state::AppState;

/// Creates cron routes. All of them require an admin or superadmin caller.
pub fn cron_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(run_cron))
        .routes(routes!(list_jobs))
        .routes(routes!(seed_jobs))
}

/// POST /api/cron/run - Poll every active job once
///
/// Due jobs get `last_executed`, `next_execution`, `execution_count` and
/// `last_result` updated; jobs scheduled in the future are skipped. The
/// request body is ignored.
#[utoipa::path(
    post,
    path = "/run",
    tag = CRON_TAG,
    responses(
        (status = 200, description = "Poll finished", body = CronRunResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 500, description = "Failed to load jobs", body = ErrorResponse),
        (status = 503, description = "Database unavailable", body = ErrorResponse)
    ),
    security(
        ("bearerAuth" = [])
    )
)]
async fn run_cron(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> AppResult<Json<CronRunResponse>> {
    authorize(&principal, &Resource::CronAdmin)?;
    tracing::info!(user_id = %principal.user_id, "Cron poll requested");

    let report = state.services.cron.run_poll(Utc::now()).await?;
    Ok(Json(CronRunResponse::from(report)))
}

/// GET /api/cron/jobs - List every cron job row
#[utoipa::path(
    get,
    path = "/jobs",
    tag = CRON_TAG,
    responses(
        (status = 200, description = "All cron jobs", body = Vec<CronJobResponse>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(
        ("bearerAuth" = [])
    )
)]
async fn list_jobs(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> AppResult<Json<Vec<CronJobResponse>>> {
    authorize(&principal, &Resource::CronAdmin)?;

    let jobs = state.services.cron.list_jobs().await?;
    Ok(Json(jobs.into_iter().map(CronJobResponse::from).collect()))
}

/// POST /api/cron/seed - Register the built-in job definitions
///
/// Inserts the initial and data maintenance jobs that are not present yet.
/// Existing rows are left untouched.
#[utoipa::path(
    post,
    path = "/seed",
    tag = CRON_TAG,
    responses(
        (status = 200, description = "Seeding finished", body = SeedReport),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(
        ("bearerAuth" = [])
    )
)]
async fn seed_jobs(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> AppResult<Json<SeedReport>> {
    authorize(&principal, &Resource::CronAdmin)?;

    let report = state.services.cron.seed().await?;
    Ok(Json(report))
}
