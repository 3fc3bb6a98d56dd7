//! Role gates for role-restricted entry points (admin pages, teacher dashboards).

use serde::Serialize;
use thiserror::Error;

use crate::Role;

/// Set of roles allowed through a gated entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleGate {
    pub name: String,
    pub allowed: Vec<Role>,
}

impl RoleGate {
    pub fn new(name: impl Into<String>, allowed: impl IntoIterator<Item = Role>) -> Self {
        Self {
            name: name.into(),
            allowed: allowed.into_iter().collect(),
        }
    }

    /// Gate for staff-only pages.
    pub fn admin_only() -> Self {
        Self::new("admin", [Role::Admin])
    }

    /// Gate for classroom management pages.
    pub fn teachers() -> Self {
        Self::new("teacher", [Role::Teacher, Role::Admin])
    }

    pub fn admits(&self, role: Role) -> bool {
        self.allowed.contains(&role)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("no signed-in principal at gate '{gate}'")]
    Unauthenticated { gate: String },

    #[error("role '{role}' is not allowed at gate '{gate}'")]
    RoleMismatch { gate: String, role: Role },
}

/// Check a resolved role against a gate.
///
/// - No IO
/// - No panics
/// - `None` (nobody signed in / role unresolved) never passes
pub fn authorize_role(role: Option<Role>, gate: &RoleGate) -> Result<(), AuthzError> {
    match role {
        None => Err(AuthzError::Unauthenticated {
            gate: gate.name.clone(),
        }),
        Some(role) if gate.admits(role) => Ok(()),
        Some(role) => Err(AuthzError::RoleMismatch {
            gate: gate.name.clone(),
            role,
        }),
    }
}

/// Detailed explanation of a gate decision (for audit logs).
#[derive(Debug, Clone, Serialize)]
pub struct GateExplanation {
    pub gate: String,
    pub granted: bool,
    pub role: Option<Role>,
    pub allowed: Vec<Role>,
    pub reason: String,
}

/// Explain why a gate decision was made (or would be made).
pub fn explain_authorization(role: Option<Role>, gate: &RoleGate) -> GateExplanation {
    let (granted, reason) = match authorize_role(role, gate) {
        Ok(()) => (true, format!("role '{}' is admitted", role.unwrap_or(Role::Unknown))),
        Err(err) => (false, err.to_string()),
    };

    GateExplanation {
        gate: gate.name.clone(),
        granted,
        role,
        allowed: gate.allowed.clone(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_listed_role() {
        assert!(authorize_role(Some(Role::Teacher), &RoleGate::teachers()).is_ok());
    }

    #[test]
    fn rejects_role_mismatch() {
        let err = authorize_role(Some(Role::Student), &RoleGate::admin_only()).unwrap_err();
        assert_eq!(
            err,
            AuthzError::RoleMismatch {
                gate: "admin".to_string(),
                role: Role::Student
            }
        );
    }

    #[test]
    fn unknown_role_is_least_privilege() {
        assert!(authorize_role(Some(Role::Unknown), &RoleGate::teachers()).is_err());
    }

    #[test]
    fn unresolved_role_never_passes() {
        let err = authorize_role(None, &RoleGate::teachers()).unwrap_err();
        assert!(matches!(err, AuthzError::Unauthenticated { .. }));
    }

    #[test]
    fn explanation_carries_reason() {
        let explanation = explain_authorization(Some(Role::Learner), &RoleGate::teachers());
        assert!(!explanation.granted);
        assert!(explanation.reason.contains("learner"));
        assert_eq!(explanation.allowed, vec![Role::Teacher, Role::Admin]);
    }
}
