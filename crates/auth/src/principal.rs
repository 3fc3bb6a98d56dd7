use serde::{Deserialize, Serialize};

use eduforge_core::PrincipalId;

use crate::Role;

/// An authenticated identity, as reported by the credential provider.
///
/// `role_hint` is the role embedded in the provider's token claims, if any. It is
/// only a hint: the profile store is the authority, and the hint is consulted
/// only when the store cannot be reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub email: String,
    #[serde(default)]
    pub role_hint: Option<Role>,
}

impl Principal {
    pub fn new(id: PrincipalId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            role_hint: None,
        }
    }

    pub fn with_role_hint(mut self, role: Role) -> Self {
        self.role_hint = Some(role);
        self
    }
}
