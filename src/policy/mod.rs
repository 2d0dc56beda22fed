//! Permission policy.
//!
//! Every access check in the service goes through [`evaluate`]; the role,
//! tenant, tier and employee role rules live only here.

mod evaluate;
mod principal;

pub use evaluate::{Decision, DecisionReason, Diagnosis, PolicyCheck, Resource, diagnose, evaluate};
pub use principal::{EmployeeRole, ParseAttributeError, Principal, Role, Tier};
