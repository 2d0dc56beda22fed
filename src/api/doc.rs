use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub const AUTH_TAG: &str = "Auth";
pub const CRON_TAG: &str = "Cron";
pub const HEALTH_TAG: &str = "Health";
pub const POLICY_TAG: &str = "Policy";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "crm-cron",
        description = "Cron bookkeeping, job seeding and permission diagnostics for the CRM",
    ),
    modifiers(&SecurityAddon),
    components(
        schemas(
            crate::api::dto::ErrorResponse,
            crate::policy::Role,
            crate::policy::Tier,
            crate::policy::EmployeeRole,
        )
    ),
    tags(
        (name = AUTH_TAG, description = "Token refresh"),
        (name = CRON_TAG, description = "Cron job polling and registry"),
        (name = HEALTH_TAG, description = "Health check endpoints"),
        (name = POLICY_TAG, description = "Permission diagnostics"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer Token Authentication"))
                        .build(),
                ),
            )
        }
    }
}
