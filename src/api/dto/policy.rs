//! Permission diagnosis DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::policy::{Decision, PolicyCheck, Resource};

/// The record the caller wants to access
#[derive(Debug, Serialize, Deserialize, ToSchema, Validate)]
pub struct DiagnoseRequest {
    #[validate(length(min = 1, message = "Tenant is required"))]
    #[schema(example = "tenant-42")]
    pub tenant_id: String,
    #[serde(default)]
    #[schema(example = "user-7")]
    pub created_by: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

impl DiagnoseRequest {
    pub fn into_resource(self) -> Resource {
        Resource::Record {
            tenant_id: self.tenant_id,
            created_by: self.created_by,
            assigned_to: self.assigned_to,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DiagnoseResponse {
    /// Caller the decision was made for
    pub user_id: String,
    pub decision: Decision,
    /// Checks in evaluation order
    pub checks: Vec<PolicyCheck>,
}
