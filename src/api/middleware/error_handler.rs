//! Error handler for converting AppError to HTTP responses.
//!
//! `AppError` renders the standard `ErrorResponse` body and leaves a copy in
//! the response extensions; [`global_error_handler`] stamps the request ID
//! into it and converts bare framework errors (unknown route, wrong method)
//! to the same format.

use axum::{
    Json,
    body::Body,
    extract::Request,
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::api::dto::ErrorResponse;
use crate::api::middleware::RequestId;
use crate::error::AppError;

/// Maps an AppError variant to its corresponding HTTP status code.
pub fn error_to_status_code(error: &AppError) -> StatusCode {
    match error {
        AppError::NotFound { .. } => StatusCode::NOT_FOUND,
        AppError::Duplicate { .. } => StatusCode::CONFLICT,
        AppError::Validation { .. } | AppError::ValidationErrors { .. } => StatusCode::BAD_REQUEST,
        AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
        AppError::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        AppError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        AppError::ConnectionPool { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Maps an AppError variant to its error code string.
pub fn error_to_code(error: &AppError) -> &'static str {
    match error {
        AppError::NotFound { .. } => "NOT_FOUND",
        AppError::Duplicate { .. } => "DUPLICATE_ENTRY",
        AppError::Validation { .. } | AppError::ValidationErrors { .. } => "VALIDATION_ERROR",
        AppError::BadRequest { .. } => "BAD_REQUEST",
        AppError::Unauthorized { .. } => "UNAUTHORIZED",
        AppError::Forbidden { .. } => "FORBIDDEN",
        AppError::Database { .. } => "DATABASE_ERROR",
        AppError::Configuration { .. } => "CONFIGURATION_ERROR",
        AppError::ConnectionPool { .. } => "SERVICE_UNAVAILABLE",
        AppError::Internal { .. } => "INTERNAL_ERROR",
    }
}

/// Builds the client-facing body. Sources of server-side failures are
/// logged, never returned.
fn error_body(error: &AppError) -> ErrorResponse {
    let code = error_to_code(error);
    match error {
        AppError::NotFound {
            entity,
            field,
            value,
        } => ErrorResponse::new(code, format!("{entity} not found")).with_details(json!({
            "entity": entity,
            "field": field,
            "value": value
        })),
        AppError::Duplicate { entity, field, .. } => {
            ErrorResponse::new(code, format!("{entity} with this {field} already exists"))
                .with_details(json!({ "entity": entity, "field": field }))
        }
        AppError::Validation { field, reason } => ErrorResponse::new(code, reason.clone())
            .with_details(json!({ "field": field })),
        AppError::ValidationErrors { errors } => {
            ErrorResponse::new(code, "Request validation failed")
                .with_details(json!({ "errors": errors }))
        }
        AppError::BadRequest { message }
        | AppError::Unauthorized { message }
        | AppError::Forbidden { message } => ErrorResponse::new(code, message.clone()),
        AppError::Database { operation, .. } => {
            ErrorResponse::new(code, format!("Database operation failed: {operation}"))
                .with_details(json!({ "operation": operation }))
        }
        AppError::Configuration { key, .. } => {
            ErrorResponse::new(code, format!("Configuration error: {key}"))
                .with_details(json!({ "key": key }))
        }
        AppError::ConnectionPool { .. } => {
            ErrorResponse::new(code, "Database connection unavailable")
        }
        AppError::Internal { .. } => ErrorResponse::new(code, "An internal error occurred"),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = error_to_status_code(&self);
        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = error_body(&self);
        let mut response = (status, Json(body.clone())).into_response();
        response.extensions_mut().insert(body);
        response
    }
}

fn fallback_body(status: StatusCode, original_message: String) -> ErrorResponse {
    let (code, default_message) = match status {
        StatusCode::BAD_REQUEST => ("BAD_REQUEST", "Bad request - invalid or malformed request"),
        StatusCode::NOT_FOUND => ("NOT_FOUND", "The requested resource was not found"),
        StatusCode::METHOD_NOT_ALLOWED => {
            ("METHOD_NOT_ALLOWED", "HTTP method not allowed for this endpoint")
        }
        StatusCode::UNSUPPORTED_MEDIA_TYPE => ("UNSUPPORTED_MEDIA_TYPE", "Unsupported media type"),
        StatusCode::PAYLOAD_TOO_LARGE => ("PAYLOAD_TOO_LARGE", "Request payload too large"),
        StatusCode::SERVICE_UNAVAILABLE => {
            ("SERVICE_UNAVAILABLE", "Service temporarily unavailable")
        }
        s if s.is_server_error() => ("INTERNAL_SERVER_ERROR", "An internal server error occurred"),
        _ => ("UNKNOWN_ERROR", "An unknown error occurred"),
    };

    if original_message.is_empty() || status.is_server_error() {
        ErrorResponse::new(code, default_message)
    } else {
        ErrorResponse::new(code, original_message)
    }
}

/// Puts every error response into the `ErrorResponse` format and tags it
/// with the request ID.
pub async fn global_error_handler(request: Request, next: Next) -> Response {
    let request_id = request.extensions().get::<RequestId>().map(|id| id.0.clone());
    let mut response = next.run(request).await;

    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let body = match response.extensions_mut().remove::<ErrorResponse>() {
        Some(body) => body,
        None => {
            let is_json = response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|value| value.contains("application/json"));
            if is_json {
                return response;
            }

            let (_parts, body) = response.into_parts();
            let bytes = axum::body::to_bytes(body, 64 * 1024)
                .await
                .unwrap_or_default();
            let message = String::from_utf8_lossy(&bytes).trim().to_string();
            let body = fallback_body(status, message);
            let body = match &request_id {
                Some(id) => body.with_request_id(id.clone()),
                None => body,
            };
            return (status, Json(body)).into_response();
        }
    };

    let Some(request_id) = request_id else {
        return response;
    };
    let body = body.with_request_id(request_id);
    match serde_json::to_vec(&body) {
        Ok(bytes) => {
            response.headers_mut().remove(header::CONTENT_LENGTH);
            *response.body_mut() = Body::from(bytes);
            response
        }
        Err(_) => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::middleware::request_id_middleware;
    use axum::{Router, middleware, routing::get};
    use tower::ServiceExt;

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn app() -> Router {
        Router::new()
            .route(
                "/forbidden",
                get(|| async { Err::<(), _>(AppError::forbidden("Admin role required")) }),
            )
            .route(
                "/broken",
                get(|| async { Err::<(), _>(AppError::internal("disk on fire")) }),
            )
            .layer(middleware::from_fn(global_error_handler))
            .layer(middleware::from_fn(request_id_middleware))
    }

    fn get_request(uri: &str) -> Request {
        Request::builder()
            .uri(uri)
            .header("x-request-id", "req-123")
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            error_to_status_code(&AppError::unauthorized("no token")),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            error_to_status_code(&AppError::forbidden("nope")),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            error_to_status_code(&AppError::ConnectionPool {
                source: anyhow::anyhow!("Pool exhausted"),
            }),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            error_to_code(&AppError::Duplicate {
                entity: "cron_jobs".to_string(),
                field: "function_name".to_string(),
                value: "syncEmailInbox".to_string(),
            }),
            "DUPLICATE_ENTRY"
        );
    }

    #[test]
    fn test_internal_error_hides_source() {
        let body = error_body(&AppError::internal("secret connection string"));
        assert_eq!(body.code, "INTERNAL_ERROR");
        assert!(!body.message.contains("secret"));
    }

    #[tokio::test]
    async fn test_app_error_gets_request_id() {
        let response = app().oneshot(get_request("/forbidden")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = json_body(response).await;
        assert_eq!(body["code"], "FORBIDDEN");
        assert_eq!(body["message"], "Admin role required");
        assert_eq!(body["request_id"], "req-123");
    }

    #[tokio::test]
    async fn test_unknown_route_is_converted() {
        let response = app().oneshot(get_request("/missing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = json_body(response).await;
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["request_id"], "req-123");
    }

    #[tokio::test]
    async fn test_server_error_body_is_generic() {
        let response = app().oneshot(get_request("/broken")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = json_body(response).await;
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert_eq!(body["message"], "An internal error occurred");
    }
}
