//! Token refresh handler.

use axum::{Json, extract::State};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::api::doc::AUTH_TAG;
use crate::api::dto::{RefreshTokenRequest, TokenResponse};
use crate::error::AppResult;
use crate::state::AppState;
use crate::utils::jwt::{generate_token_pair, validate_refresh_token};
use crate::utils::validate::ValidatedJson;

/// # Routes
/// - `POST /refresh` - Exchange a refresh token for a new token pair
pub fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(refresh_token))
}

/// POST /api/auth/refresh - Refresh access token
///
/// Validates the refresh token and issues new access and refresh tokens
/// carrying the same role, tenant, tier and employee role.
#[utoipa::path(
    post,
    path = "/refresh",
    tag = AUTH_TAG,
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Tokens refreshed", body = TokenResponse),
        (status = 400, description = "Invalid request data"),
        (status = 401, description = "Invalid or expired refresh token")
    )
)]
async fn refresh_token(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RefreshTokenRequest>,
) -> AppResult<Json<TokenResponse>> {
    let jwt = &state.jwt_config;
    let claims = validate_refresh_token(&payload.refresh_token, &jwt.secret)?;
    let principal = claims.principal();

    let (access_token, refresh_token) = generate_token_pair(
        &principal,
        &jwt.secret,
        jwt.access_token_expiration,
        jwt.refresh_token_expiration,
    )?;
    tracing::debug!(user_id = %principal.user_id, "Issued refreshed token pair");

    Ok(Json(TokenResponse::bearer(
        access_token,
        refresh_token,
        jwt.access_token_expiration,
    )))
}
