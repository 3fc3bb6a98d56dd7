//! Public facade consumed by dashboards, games, and admin pages.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use eduforge_auth::{Principal, Role, RoleGate};

use crate::cache::ProfileCache;
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, EngineConfig};
use crate::coordinator::{AuthEventCoordinator, AuthState, SessionSnapshot};
use crate::error::SessionError;
use crate::ports::{AuthEvent, CredentialProvider, ProfileStore};
use crate::profile::ProfileResolver;

/// Builder wiring the engine from its injected collaborators.
pub struct SessionStoreBuilder {
    provider: Arc<dyn CredentialProvider>,
    profile_store: Arc<dyn ProfileStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl SessionStoreBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Wire the engine. Fails if the configuration is out of range.
    pub fn build(self) -> Result<SessionStore, ConfigError> {
        self.config.validate()?;

        let cache = ProfileCache::new(self.clock.clone(), self.config.profile_ttl());
        let profiles = Arc::new(ProfileResolver::new(
            self.profile_store,
            cache,
            self.config.admin_emails.clone(),
            self.config.lookup_timeout(),
        ));
        let coordinator = AuthEventCoordinator::new(
            self.provider.clone(),
            profiles,
            self.clock,
            self.config.init_timeout(),
            self.config.lookup_timeout(),
        );

        Ok(SessionStore {
            coordinator: Arc::new(coordinator),
            provider: self.provider,
        })
    }
}

/// The current session, as seen by the rest of the application.
///
/// Cheap to clone; clones share the same engine.
#[derive(Clone)]
pub struct SessionStore {
    coordinator: Arc<AuthEventCoordinator>,
    provider: Arc<dyn CredentialProvider>,
}

impl core::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionStore")
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn builder(
        provider: Arc<dyn CredentialProvider>,
        profile_store: Arc<dyn ProfileStore>,
    ) -> SessionStoreBuilder {
        SessionStoreBuilder {
            provider,
            profile_store,
            clock: Arc::new(SystemClock),
            config: EngineConfig::default(),
        }
    }

    /// Initialize from the provider's current session (bounded by the init deadline).
    pub async fn start(&self) {
        self.coordinator.start().await;
    }

    /// Start the engine and follow the provider's lifecycle events on a
    /// background task. Must be called from within a tokio runtime.
    pub fn listen(&self) -> JoinHandle<()> {
        // Subscribe before starting so no event emitted during init is missed.
        let mut events = self.provider.subscribe();
        let coordinator = self.coordinator.clone();

        tokio::spawn(async move {
            let init = coordinator.clone();
            let started = tokio::spawn(async move { init.start().await });

            loop {
                match events.recv().await {
                    Ok(event) => coordinator.handle(event).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "auth event stream lagged; refreshing session");
                        coordinator.refresh().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            if let Err(err) = started.await {
                tracing::warn!(error = %err, "session initialization task failed");
            }
            tracing::debug!("auth event stream closed");
        })
    }

    /// Feed a lifecycle event directly (when not using [`SessionStore::listen`]).
    pub async fn handle_event(&self, event: AuthEvent) {
        self.coordinator.handle(event).await;
    }

    pub fn state(&self) -> AuthState {
        self.coordinator.state()
    }

    pub fn is_loading(&self) -> bool {
        self.coordinator.snapshot().is_loading
    }

    pub fn principal(&self) -> Option<Principal> {
        self.coordinator.snapshot().principal
    }

    pub fn role(&self) -> Option<Role> {
        self.coordinator.snapshot().role
    }

    pub fn has_entitlement(&self) -> bool {
        self.coordinator.snapshot().has_entitlement
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.coordinator.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.coordinator.subscribe()
    }

    /// Re-resolve the current session with fresh profile data. No-op while initializing.
    pub async fn refresh_session(&self) {
        self.coordinator.refresh().await;
    }

    /// Sign out locally right away, then upstream (failures tolerated).
    pub async fn sign_out(&self) {
        self.coordinator.sign_out().await;
    }

    /// Gate a role-restricted entry point; a mismatch signs the session out.
    pub async fn require_role(&self, gate: &RoleGate) -> Result<(), SessionError> {
        self.coordinator.require_role(gate).await
    }

    pub fn cache(&self) -> &ProfileCache {
        self.coordinator.profiles().cache()
    }
}
