//! Caller identity as seen by the policy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Superadmin,
    Admin,
    PowerUser,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Superadmin => "superadmin",
            Role::Admin => "admin",
            Role::PowerUser => "power-user",
            Role::User => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::Superadmin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EmployeeRole {
    Manager,
    Employee,
}

impl EmployeeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmployeeRole::Manager => "manager",
            EmployeeRole::Employee => "employee",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Tier1,
    Tier2,
    Tier3,
    Tier4,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Tier1 => "tier1",
            Tier::Tier2 => "tier2",
            Tier::Tier3 => "tier3",
            Tier::Tier4 => "tier4",
        }
    }

    /// Tier 3 and above see every record in their tenant
    pub fn has_tenant_visibility(&self) -> bool {
        *self >= Tier::Tier3
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAttributeError {
    kind: &'static str,
    value: String,
}

impl fmt::Display for ParseAttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for ParseAttributeError {}

impl FromStr for Role {
    type Err = ParseAttributeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "superadmin" => Ok(Role::Superadmin),
            "admin" => Ok(Role::Admin),
            "power-user" | "power_user" => Ok(Role::PowerUser),
            "user" => Ok(Role::User),
            _ => Err(ParseAttributeError {
                kind: "role",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for EmployeeRole {
    type Err = ParseAttributeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manager" => Ok(EmployeeRole::Manager),
            "employee" => Ok(EmployeeRole::Employee),
            _ => Err(ParseAttributeError {
                kind: "employee role",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for Tier {
    type Err = ParseAttributeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tier1" => Ok(Tier::Tier1),
            "tier2" => Ok(Tier::Tier2),
            "tier3" => Ok(Tier::Tier3),
            "tier4" => Ok(Tier::Tier4),
            _ => Err(ParseAttributeError {
                kind: "tier",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub tier: Option<Tier>,
    #[serde(default)]
    pub employee_role: Option<EmployeeRole>,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            tenant_id: None,
            tier: None,
            employee_role: None,
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn with_employee_role(mut self, employee_role: EmployeeRole) -> Self {
        self.employee_role = Some(employee_role);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing_and_serde() {
        assert_eq!("power-user".parse::<Role>().unwrap(), Role::PowerUser);
        assert_eq!("Power_User".parse::<Role>().unwrap(), Role::PowerUser);
        assert!("root".parse::<Role>().is_err());
        assert_eq!(serde_json::to_string(&Role::PowerUser).unwrap(), "\"power-user\"");
        assert_eq!(
            serde_json::from_str::<Role>("\"superadmin\"").unwrap(),
            Role::Superadmin
        );
    }

    #[test]
    fn test_tier_visibility() {
        assert!(!Tier::Tier1.has_tenant_visibility());
        assert!(!Tier::Tier2.has_tenant_visibility());
        assert!(Tier::Tier3.has_tenant_visibility());
        assert!(Tier::Tier4.has_tenant_visibility());
    }

    #[test]
    fn test_parse_error_message() {
        let err = "tier9".parse::<Tier>().unwrap_err();
        assert_eq!(err.to_string(), "unknown tier 'tier9'");
    }
}
