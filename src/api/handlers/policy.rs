//! Permission diagnosis handler.

use axum::{Extension, Json};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::api::doc::POLICY_TAG;
use crate::api::dto::{DiagnoseRequest, DiagnoseResponse, ErrorResponse};
use crate::error::AppResult;
use crate::policy::{Principal, diagnose};
use crate::state::AppState;
use crate::utils::validate::ValidatedJson;

pub fn policy_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(diagnose_access))
}

/// POST /api/policy/diagnose - Explain the caller's access to a record
///
/// Always answers 200; the decision and every check evaluated on the way
/// are in the body.
#[utoipa::path(
    post,
    path = "/diagnose",
    tag = POLICY_TAG,
    request_body = DiagnoseRequest,
    responses(
        (status = 200, description = "Decision with its checks", body = DiagnoseResponse),
        (status = 400, description = "Invalid request data", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(
        ("bearerAuth" = [])
    )
)]
async fn diagnose_access(
    Extension(principal): Extension<Principal>,
    ValidatedJson(request): ValidatedJson<DiagnoseRequest>,
) -> AppResult<Json<DiagnoseResponse>> {
    let resource = request.into_resource();
    let diagnosis = diagnose(&principal, &resource);

    Ok(Json(DiagnoseResponse {
        user_id: principal.user_id,
        decision: diagnosis.decision,
        checks: diagnosis.checks,
    }))
}
