//! Principal identity.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identity of an authenticated principal (student, teacher, school owner, staff).
///
/// Also the primary key of profile records, and the sponsor reference
/// (`school_owner_id`) on delegated teacher profiles.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(Uuid);

impl PrincipalId {
    /// UUIDv7 (time-ordered). Tests that need stable ids should use [`PrincipalId::from_uuid`].
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for PrincipalId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<PrincipalId> for Uuid {
    fn from(value: PrincipalId) -> Self {
        value.0
    }
}

impl FromStr for PrincipalId {
    type Err = DomainError;

    /// Parses the hyphenated form. The nil UUID is never issued to a principal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s.trim()).map_err(|e| DomainError::invalid_id(format!("PrincipalId: {e}")))?;
        if uuid.is_nil() {
            return Err(DomainError::NilId("PrincipalId"));
        }
        Ok(Self(uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_from_display_form() {
        let id = PrincipalId::new();
        let parsed: PrincipalId = format!(" {id} ").parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn rejects_malformed_id() {
        let err = "not-a-uuid".parse::<PrincipalId>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidId(ref msg) if msg.starts_with("PrincipalId")));
    }

    #[test]
    fn rejects_nil_id() {
        let err = Uuid::nil().to_string().parse::<PrincipalId>().unwrap_err();
        assert_eq!(err, DomainError::NilId("PrincipalId"));
    }
}
