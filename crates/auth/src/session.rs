use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Principal;

/// Opaque credential issued by the credential provider (e.g. an access token).
///
/// The engine never inspects it; `Debug` output is redacted so sessions can be
/// logged safely.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for Credential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// An authenticated session: principal + credential + expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub principal: Principal,
    pub credential: Credential,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(principal: Principal, credential: Credential, expires_at: DateTime<Utc>) -> Self {
        Self {
            principal,
            credential,
            expires_at,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("session has expired")]
    Expired,
}

/// Deterministically validate a session's time window.
///
/// Note: this validates the *expiry* only. Credential verification belongs to the
/// credential provider.
pub fn validate_session(session: &Session, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if now >= session.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use eduforge_core::PrincipalId;

    use super::*;

    fn session_expiring(expires_at: DateTime<Utc>) -> Session {
        Session::new(
            Principal::new(PrincipalId::new(), "ada@school.test"),
            Credential::new("secret-token"),
            expires_at,
        )
    }

    #[test]
    fn live_session_is_valid() {
        let now = Utc::now();
        assert!(validate_session(&session_expiring(now + Duration::minutes(5)), now).is_ok());
    }

    #[test]
    fn session_at_expiry_is_rejected() {
        let now = Utc::now();
        assert_eq!(
            validate_session(&session_expiring(now), now),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn debug_output_redacts_credential() {
        let session = session_expiring(Utc::now());
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
    }
}
