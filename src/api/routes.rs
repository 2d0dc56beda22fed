//! Router configuration for the API.

use axum::http::{Method, header};
use axum::{Router, middleware};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::doc::ApiDoc;
use crate::api::handlers;
use crate::api::middleware::{
    auth_middleware, global_error_handler, logging_middleware, request_id_middleware,
};
use crate::state::AppState;

pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";
pub const SWAGGER_PATH: &str = "/swagger-ui";

/// Creates the main application router with all routes and middleware.
///
/// # Middleware Order
/// Last added runs first:
/// 1. Request ID: generates or propagates `x-request-id`
/// 2. Logging: one span per request carrying the ID
/// 3. Error handler: normalizes error bodies and stamps the ID
///
/// # Routes
/// - `/health`, `/health/ready`, `/health/live`
/// - `/api/auth/refresh`
/// - `/api/cron/{run,jobs,seed}` (bearer token)
/// - `/api/policy/diagnose` (bearer token)
/// - `/swagger-ui` when `expose_docs` is set
pub fn create_router(state: AppState, expose_docs: bool) -> Router {
    let authenticated = || middleware::from_fn_with_state(state.clone(), auth_middleware);

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(handlers::health::health_routes())
        .nest("/api/auth", handlers::auth::auth_routes())
        .nest(
            "/api/cron",
            handlers::cron::cron_routes().layer(authenticated()),
        )
        .nest(
            "/api/policy",
            handlers::policy::policy_routes().layer(authenticated()),
        )
        .split_for_parts();

    let router = if expose_docs {
        router.merge(SwaggerUi::new(SWAGGER_PATH).url(OPENAPI_PATH, api))
    } else {
        router
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    router
        .layer(middleware::from_fn(global_error_handler))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
