//! Access decisions for cron administration and tenant records.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::policy::principal::{EmployeeRole, Principal, Role};

/// What the caller wants to touch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resource {
    /// Running polls, listing and seeding cron jobs
    CronAdmin,
    /// A tenant-owned CRM record such as an activity or lead
    Record {
        tenant_id: String,
        #[serde(default)]
        created_by: Option<String>,
        #[serde(default)]
        assigned_to: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    Superadmin,
    Admin,
    AdminRequired,
    MissingTenant,
    CrossTenant,
    TenantWideVisibility,
    Owner,
    Assignee,
    NotPermitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Decision {
    pub allowed: bool,
    pub reason: DecisionReason,
}

impl Decision {
    fn allow(reason: DecisionReason) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    fn deny(reason: DecisionReason) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

/// One rule evaluated on the way to a decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PolicyCheck {
    pub check: String,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Diagnosis {
    pub decision: Decision,
    /// Checks in evaluation order; the last one decided the outcome
    pub checks: Vec<PolicyCheck>,
}

struct Trace {
    checks: Vec<PolicyCheck>,
}

impl Trace {
    fn record(&mut self, check: &str, passed: bool, detail: String) -> bool {
        self.checks.push(PolicyCheck {
            check: check.to_string(),
            passed,
            detail,
        });
        passed
    }
}

pub fn evaluate(principal: &Principal, resource: &Resource) -> Decision {
    diagnose(principal, resource).decision
}

/// Evaluate and keep the trail of checks that led to the decision.
pub fn diagnose(principal: &Principal, resource: &Resource) -> Diagnosis {
    let mut trace = Trace { checks: Vec::new() };
    let decision = match resource {
        Resource::CronAdmin => decide_cron_admin(principal, &mut trace),
        Resource::Record {
            tenant_id,
            created_by,
            assigned_to,
        } => decide_record(
            principal,
            tenant_id,
            created_by.as_deref(),
            assigned_to.as_deref(),
            &mut trace,
        ),
    };

    Diagnosis {
        decision,
        checks: trace.checks,
    }
}

fn decide_cron_admin(principal: &Principal, trace: &mut Trace) -> Decision {
    let detail = format!("role is {}", principal.role);
    if !trace.record("admin_role", principal.role.is_admin(), detail) {
        return Decision::deny(DecisionReason::AdminRequired);
    }

    match principal.role {
        Role::Superadmin => Decision::allow(DecisionReason::Superadmin),
        _ => Decision::allow(DecisionReason::Admin),
    }
}

fn decide_record(
    principal: &Principal,
    tenant_id: &str,
    created_by: Option<&str>,
    assigned_to: Option<&str>,
    trace: &mut Trace,
) -> Decision {
    if trace.record(
        "superadmin",
        principal.role == Role::Superadmin,
        format!("role is {}", principal.role),
    ) {
        return Decision::allow(DecisionReason::Superadmin);
    }

    let Some(user_tenant) = principal.tenant_id.as_deref() else {
        trace.record("has_tenant", false, "caller has no tenant".to_string());
        return Decision::deny(DecisionReason::MissingTenant);
    };
    trace.record("has_tenant", true, format!("caller tenant is {}", user_tenant));

    if !trace.record(
        "same_tenant",
        user_tenant == tenant_id,
        format!("record tenant is {}", tenant_id),
    ) {
        return Decision::deny(DecisionReason::CrossTenant);
    }

    if trace.record(
        "admin",
        principal.role == Role::Admin,
        format!("role is {}", principal.role),
    ) {
        return Decision::allow(DecisionReason::Admin);
    }

    let is_manager = principal.employee_role == Some(EmployeeRole::Manager);
    let wide_tier = principal.tier.is_some_and(|t| t.has_tenant_visibility());
    let detail = format!(
        "employee_role is {}, tier is {}",
        principal.employee_role.map_or("none", |r| r.as_str()),
        principal.tier.map_or("none", |t| t.as_str()),
    );
    if trace.record("tenant_wide_visibility", is_manager || wide_tier, detail) {
        return Decision::allow(DecisionReason::TenantWideVisibility);
    }

    let user_id = principal.user_id.as_str();
    if trace.record(
        "owner",
        created_by == Some(user_id),
        format!("created_by is {}", created_by.unwrap_or("none")),
    ) {
        return Decision::allow(DecisionReason::Owner);
    }

    if trace.record(
        "assignee",
        assigned_to == Some(user_id),
        format!("assigned_to is {}", assigned_to.unwrap_or("none")),
    ) {
        return Decision::allow(DecisionReason::Assignee);
    }

    Decision::deny(DecisionReason::NotPermitted)
}
