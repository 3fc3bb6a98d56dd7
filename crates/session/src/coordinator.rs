//! Auth lifecycle state machine.
//!
//! ```text
//! Uninitialized ──start()──▶ Initializing ──▶ Ready(SignedIn) ◀──▶ Ready(SignedOut)
//! ```
//!
//! Lifecycle events that arrive before the coordinator is `Ready` are buffered
//! and replayed in order once initialization completes.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

use eduforge_auth::{Principal, Role, RoleGate, Session, authorize_role, explain_authorization, validate_session};
use eduforge_core::PrincipalId;

use crate::clock::Clock;
use crate::entitlement::{EntitlementResolution, EntitlementResolver, EntitlementSource};
use crate::error::SessionError;
use crate::ports::{AuthEvent, CredentialProvider};
use crate::profile::{ProfileResolver, RoleResolution, RoleSource};
use crate::timeout::{Raced, race};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    SignedIn,
    SignedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    Uninitialized,
    Initializing,
    Ready(Presence),
}

/// Point-in-time view of the session, published to consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: AuthState,
    pub is_loading: bool,
    pub principal: Option<Principal>,
    pub role: Option<Role>,
    pub has_entitlement: bool,
    pub role_source: Option<RoleSource>,
    pub entitlement_source: Option<EntitlementSource>,
}

impl SessionSnapshot {
    fn initial() -> Self {
        Self {
            state: AuthState::Uninitialized,
            is_loading: true,
            principal: None,
            role: None,
            has_entitlement: false,
            role_source: None,
            entitlement_source: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Initializing,
    Ready,
}

#[derive(Debug)]
struct Inner {
    phase: Phase,
    session: Option<Session>,
    role: Option<RoleResolution>,
    entitlement: Option<EntitlementResolution>,
    /// Principal whose first resolution is still running.
    resolving: Option<PrincipalId>,
    /// Bumped on every transition to signed-out; resolutions started under an
    /// older epoch are discarded.
    epoch: u64,
    pending: VecDeque<AuthEvent>,
}

impl Inner {
    fn current_principal(&self) -> Option<PrincipalId> {
        self.session.as_ref().map(|s| s.principal.id)
    }

    fn snapshot(&self) -> SessionSnapshot {
        let presence = if self.session.is_some() {
            Presence::SignedIn
        } else {
            Presence::SignedOut
        };
        let state = match self.phase {
            Phase::Uninitialized => AuthState::Uninitialized,
            Phase::Initializing => AuthState::Initializing,
            Phase::Ready => AuthState::Ready(presence),
        };

        SessionSnapshot {
            state,
            is_loading: self.phase != Phase::Ready || self.resolving.is_some(),
            principal: self.session.as_ref().map(|s| s.principal.clone()),
            role: self.role.as_ref().map(|r| r.role),
            has_entitlement: self.entitlement.is_some_and(|e| e.entitled),
            role_source: self.role.as_ref().map(|r| r.source),
            entitlement_source: self.entitlement.map(|e| e.source),
        }
    }
}

/// Drives role and entitlement resolution from credential lifecycle events.
pub struct AuthEventCoordinator {
    provider: Arc<dyn CredentialProvider>,
    profiles: Arc<ProfileResolver>,
    entitlements: EntitlementResolver,
    clock: Arc<dyn Clock>,
    /// Bounds every call into the credential provider.
    provider_timeout: Duration,
    /// Worst case for one full resolution (own profile + sponsor profile).
    settle_timeout: Duration,
    inner: Mutex<Inner>,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl core::fmt::Debug for AuthEventCoordinator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthEventCoordinator")
            .field("state", &self.state())
            .field("profiles", &self.profiles)
            .finish_non_exhaustive()
    }
}

impl AuthEventCoordinator {
    pub fn new(
        provider: Arc<dyn CredentialProvider>,
        profiles: Arc<ProfileResolver>,
        clock: Arc<dyn Clock>,
        provider_timeout: Duration,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            entitlements: EntitlementResolver::new(profiles.clone(), clock.clone()),
            profiles,
            clock,
            provider_timeout,
            settle_timeout: provider_timeout + lookup_timeout * 2,
            inner: Mutex::new(Inner {
                phase: Phase::Uninitialized,
                session: None,
                role: None,
                entitlement: None,
                resolving: None,
                epoch: 0,
                pending: VecDeque::new(),
            }),
            snapshot: watch::Sender::new(SessionSnapshot::initial()),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish the current state; callers hold the lock so snapshots are ordered.
    fn publish(&self, inner: &Inner) {
        self.snapshot.send_replace(inner.snapshot());
    }

    pub fn state(&self) -> AuthState {
        self.snapshot.borrow().state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn profiles(&self) -> &ProfileResolver {
        &self.profiles
    }

    /// Fetch the provider's current session and resolve it, then replay any
    /// events buffered meanwhile. Only the first call does anything.
    pub async fn start(&self) {
        let epoch = {
            let mut inner = self.inner();
            if inner.phase != Phase::Uninitialized {
                return;
            }
            inner.phase = Phase::Initializing;
            self.publish(&inner);
            inner.epoch
        };
        tracing::info!("initializing session");

        let session = match race(self.provider.current_session(), self.provider_timeout).await {
            Raced::Value(Ok(session)) => session,
            Raced::Value(Err(err)) => {
                tracing::warn!(error = %err, "initial session fetch failed; starting signed out");
                None
            }
            Raced::TimedOut => {
                tracing::warn!(
                    timeout_ms = self.provider_timeout.as_millis() as u64,
                    "initial session fetch timed out; starting signed out"
                );
                None
            }
        };

        // A sign-out that raced the fetch wins.
        let superseded = self.inner().epoch != epoch;
        match session {
            Some(session) if !superseded => self.sign_in(session).await,
            _ => self.enter_signed_out().await,
        }

        loop {
            let next = {
                let mut inner = self.inner();
                match inner.pending.pop_front() {
                    Some(event) => event,
                    None => {
                        inner.phase = Phase::Ready;
                        self.publish(&inner);
                        break;
                    }
                }
            };
            tracing::debug!(event = next.kind(), "replaying buffered auth event");
            self.apply(next).await;
        }

        tracing::info!(state = ?self.state(), "session initialized");
    }

    /// Feed one lifecycle event from the credential provider.
    pub async fn handle(&self, event: AuthEvent) {
        {
            let mut inner = self.inner();
            if inner.phase != Phase::Ready {
                tracing::debug!(event = event.kind(), "buffering auth event until initialized");
                inner.pending.push_back(event);
                return;
            }
        }
        self.apply(event).await;
    }

    async fn apply(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn(session) | AuthEvent::TokenRefreshed(session) => self.sign_in(session).await,
            AuthEvent::SignedOut => self.enter_signed_out().await,
        }
    }

    /// Re-read the provider's session and re-resolve it with a fresh profile.
    ///
    /// A no-op until initialization completes. Provider failures keep the
    /// current state.
    pub async fn refresh(&self) {
        let cached = {
            let inner = self.inner();
            if inner.phase != Phase::Ready {
                tracing::debug!("refresh ignored while initializing");
                return;
            }
            inner.role.as_ref().and_then(|r| r.profile.clone())
        };

        match race(self.provider.current_session(), self.provider_timeout).await {
            Raced::Value(Ok(Some(session))) => {
                let cache = self.profiles.cache();
                cache.invalidate(session.principal.id);
                if let Some(sponsor) = cached.and_then(|p| p.school_owner_id) {
                    cache.invalidate(sponsor);
                }
                self.sign_in(session).await;
            }
            Raced::Value(Ok(None)) => self.enter_signed_out().await,
            Raced::Value(Err(err)) => {
                tracing::warn!(error = %err, "session refresh failed; keeping current session");
            }
            Raced::TimedOut => {
                tracing::warn!("session refresh timed out; keeping current session");
            }
        }
    }

    /// Clear local state immediately, then sign out upstream. Upstream failure
    /// is logged and otherwise ignored: the local session is already gone.
    pub async fn sign_out(&self) {
        self.enter_signed_out().await;

        match race(self.provider.sign_out(), self.provider_timeout).await {
            Raced::Value(Ok(())) => tracing::debug!("provider sign-out completed"),
            Raced::Value(Err(err)) => tracing::warn!(error = %err, "provider sign-out failed; local session already cleared"),
            Raced::TimedOut => tracing::warn!("provider sign-out timed out; local session already cleared"),
        }
    }

    /// Admit the current principal through a role-restricted entry point.
    ///
    /// Waits (bounded) for an in-progress resolution. On rejection the session
    /// is forced to signed-out before the error is returned.
    pub async fn require_role(&self, gate: &RoleGate) -> Result<(), SessionError> {
        let mut rx = self.subscribe();
        // The borrowed snapshot must be released before anything publishes.
        let timed_out = race(rx.wait_for(|s| !s.is_loading), self.settle_timeout)
            .await
            .is_timed_out();
        if timed_out {
            tracing::warn!(gate = %gate.name, "session still loading at gate");
        }

        let (role, signed_in) = {
            let inner = self.inner();
            let ready = inner.phase == Phase::Ready && inner.resolving.is_none();
            let role = if ready { inner.role.as_ref().map(|r| r.role) } else { None };
            (role, inner.session.is_some())
        };

        if let Err(err) = authorize_role(role, gate) {
            let explanation = explain_authorization(role, gate);
            tracing::warn!(
                gate = %explanation.gate,
                role = ?explanation.role,
                allowed = ?explanation.allowed,
                reason = %explanation.reason,
                "entry point rejected session"
            );
            if signed_in {
                self.sign_out().await;
            }
            return Err(err.into());
        }
        Ok(())
    }

    async fn sign_in(&self, session: Session) {
        if let Err(err) = validate_session(&session, self.clock.now()) {
            tracing::warn!(principal_id = %session.principal.id, error = %err, "ignoring expired session");
            self.enter_signed_out().await;
            return;
        }

        let principal = session.principal.clone();
        let epoch = {
            let mut inner = self.inner();
            let same_principal = inner.current_principal() == Some(principal.id);
            inner.session = Some(session);
            if !same_principal {
                inner.role = None;
                inner.entitlement = None;
                inner.resolving = Some(principal.id);
            }
            self.publish(&inner);
            inner.epoch
        };

        let roles = self.profiles.resolve(&principal).await;
        let entitlement = self.entitlements.resolve(&principal, &roles).await;

        let mut inner = self.inner();
        if inner.epoch != epoch || inner.current_principal() != Some(principal.id) {
            tracing::debug!(principal_id = %principal.id, "discarding resolution for superseded principal");
            return;
        }

        tracing::info!(
            principal_id = %principal.id,
            role = %roles.role,
            role_source = ?roles.source,
            entitled = entitlement.entitled,
            "session resolved"
        );
        inner.role = Some(roles);
        inner.entitlement = Some(entitlement);
        if inner.resolving == Some(principal.id) {
            inner.resolving = None;
        }
        self.publish(&inner);
    }

    async fn enter_signed_out(&self) {
        let previous = {
            let mut inner = self.inner();
            let previous = inner.current_principal();
            inner.session = None;
            inner.role = None;
            inner.entitlement = None;
            inner.resolving = None;
            inner.epoch += 1;
            self.publish(&inner);
            previous
        };
        self.profiles.cache().clear_all();

        if let Some(id) = previous {
            tracing::info!(principal_id = %id, "signed out");
        }

        match race(self.provider.clear_local_artifacts(), self.provider_timeout).await {
            Raced::Value(Ok(())) => {}
            Raced::Value(Err(err)) => tracing::warn!(error = %err, "failed to clear local credential artifacts"),
            Raced::TimedOut => tracing::warn!("clearing local credential artifacts timed out"),
        }
    }
}
