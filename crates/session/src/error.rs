//! Error taxonomy of the session engine.
//!
//! Only [`SessionError`] ever reaches consumers. Store and provider failures are
//! converted to safe defaults inside the resolvers and logged.

use std::time::Duration;

use thiserror::Error;

use eduforge_auth::AuthzError;
use eduforge_core::PrincipalId;

/// Failure reported by a [`crate::ProfileStore`] adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("profile store unavailable: {0}")]
    Unavailable(String),

    #[error("profile store backend error: {0}")]
    Backend(String),
}

/// Failure reported by a [`crate::CredentialProvider`] adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("credential provider unavailable: {0}")]
    Unavailable(String),

    #[error("credential provider rejected the request: {0}")]
    Rejected(String),
}

/// Why a profile lookup did not produce a record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("profile lookup for {principal_id} timed out after {deadline:?}")]
    BackingStoreTimeout {
        principal_id: PrincipalId,
        deadline: Duration,
    },

    #[error("profile lookup for {principal_id} failed: {source}")]
    BackingStoreError {
        principal_id: PrincipalId,
        #[source]
        source: StoreError,
    },

    #[error("no profile for {0}")]
    NotFound(PrincipalId),
}

/// Errors surfaced to consumers of the [`crate::SessionStore`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A credential was used at a role-restricted entry point it does not satisfy.
    /// The engine has already forced the session to signed-out.
    #[error("validation failed: {0}")]
    Validation(#[from] AuthzError),
}
