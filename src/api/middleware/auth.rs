//! JWT authentication middleware.
//!
//! Validates the bearer token and makes the caller available to handlers as
//! an `Extension<Principal>`.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::error::{AppError, AppResult};
use crate::policy::{Principal, Resource, evaluate};
use crate::state::AppState;
use crate::utils::jwt::validate_access_token;

/// JWT authentication middleware
///
/// # Headers
/// Expects: `Authorization: Bearer <token>`
///
/// # Errors
/// Returns 401 Unauthorized when the header is missing or malformed, or the
/// token is invalid, expired, or not an access token.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::unauthorized("Invalid authorization header format. Expected: Bearer <token>")
    })?;

    let claims = validate_access_token(token, &state.jwt_config.secret)?;
    request.extensions_mut().insert(claims.principal());

    Ok(next.run(request).await)
}

/// Turn a policy denial into 403.
pub fn authorize(principal: &Principal, resource: &Resource) -> AppResult<()> {
    let decision = evaluate(principal, resource);
    if decision.allowed {
        return Ok(());
    }

    tracing::info!(
        user_id = %principal.user_id,
        role = %principal.role,
        reason = ?decision.reason,
        "Access denied"
    );
    let message = match resource {
        Resource::CronAdmin => "Admin or superadmin role required",
        Resource::Record { .. } => "You do not have access to this record",
    };
    Err(AppError::forbidden(message))
}
