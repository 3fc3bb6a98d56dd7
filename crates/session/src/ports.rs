//! Ports to the engine's external collaborators.
//!
//! The engine never talks to a concrete auth vendor or database: it is handed
//! implementations of these traits at construction time (see
//! [`crate::SessionStore::builder`]).

use async_trait::async_trait;
use tokio::sync::broadcast;

use eduforge_auth::{ProfileRecord, Session};
use eduforge_core::PrincipalId;

use crate::error::{ProviderError, StoreError};

/// Lifecycle events emitted by the credential provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(Session),
    TokenRefreshed(Session),
    SignedOut,
}

impl AuthEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthEvent::SignedIn(_) => "signed_in",
            AuthEvent::TokenRefreshed(_) => "token_refreshed",
            AuthEvent::SignedOut => "signed_out",
        }
    }
}

/// Issues and revokes credentials (the hosted auth service).
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// The session the provider currently holds, if any.
    async fn current_session(&self) -> Result<Option<Session>, ProviderError>;

    /// Revoke the current session upstream.
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Remove locally persisted credential artifacts (stored tokens, cookies).
    ///
    /// The provider normally does this itself on sign-out; the engine calls it
    /// again so a partially failed upstream sign-out leaves nothing behind.
    async fn clear_local_artifacts(&self) -> Result<(), ProviderError>;

    /// Subscribe to lifecycle events.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Point lookups of profile records by principal id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// `Ok(None)` when no profile row exists for the principal.
    async fn get_profile(&self, principal_id: PrincipalId) -> Result<Option<ProfileRecord>, StoreError>;
}
