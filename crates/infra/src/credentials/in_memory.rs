use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::broadcast;

use eduforge_auth::Session;
use eduforge_session::{AuthEvent, CredentialProvider, ProviderError};

use crate::fault::Fault;

/// In-memory stand-in for the hosted auth service.
///
/// - `sign_in` / `refresh_token` / `sign_out_upstream` update the held session
///   and emit the matching lifecycle event.
/// - Faults can be injected separately for session reads and sign-out.
#[derive(Debug)]
pub struct InMemoryCredentialProvider {
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
    session_fault: RwLock<Fault>,
    sign_out_fault: RwLock<Fault>,
    sign_outs: AtomicUsize,
    artifact_clears: AtomicUsize,
}

impl Default for InMemoryCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCredentialProvider {
    const EVENT_CAPACITY: usize = 64;

    pub fn new() -> Self {
        let (events, _) = broadcast::channel(Self::EVENT_CAPACITY);
        Self {
            session: RwLock::new(None),
            events,
            session_fault: RwLock::new(Fault::None),
            sign_out_fault: RwLock::new(Fault::None),
            sign_outs: AtomicUsize::new(0),
            artifact_clears: AtomicUsize::new(0),
        }
    }

    /// A provider that already holds `session` (e.g. restored from storage).
    pub fn with_session(session: Session) -> Self {
        let provider = Self::new();
        provider.store(Some(session));
        provider
    }

    fn store(&self, session: Option<Session>) {
        if let Ok(mut current) = self.session.write() {
            *current = session;
        }
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine: nobody is listening yet.
        let _ = self.events.send(event);
    }

    pub fn sign_in(&self, session: Session) {
        self.store(Some(session.clone()));
        self.emit(AuthEvent::SignedIn(session));
    }

    pub fn refresh_token(&self, session: Session) {
        self.store(Some(session.clone()));
        self.emit(AuthEvent::TokenRefreshed(session));
    }

    /// Session revoked upstream (another tab, admin action, expiry).
    pub fn sign_out_upstream(&self) {
        self.store(None);
        self.emit(AuthEvent::SignedOut);
    }

    pub fn set_session_fault(&self, fault: Fault) {
        if let Ok(mut current) = self.session_fault.write() {
            *current = fault;
        }
    }

    pub fn set_sign_out_fault(&self, fault: Fault) {
        if let Ok(mut current) = self.sign_out_fault.write() {
            *current = fault;
        }
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }

    pub fn artifact_clears(&self) -> usize {
        self.artifact_clears.load(Ordering::SeqCst)
    }

    pub fn held_session(&self) -> Option<Session> {
        self.session.read().ok().and_then(|s| s.clone())
    }
}

fn current(fault: &RwLock<Fault>) -> Fault {
    fault.read().map(|f| f.clone()).unwrap_or_default()
}

#[async_trait]
impl CredentialProvider for InMemoryCredentialProvider {
    async fn current_session(&self) -> Result<Option<Session>, ProviderError> {
        if let Some(msg) = current(&self.session_fault).inject().await {
            return Err(ProviderError::Unavailable(msg));
        }
        Ok(self.held_session())
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = current(&self.sign_out_fault).inject().await {
            tracing::debug!(error = %msg, "simulated upstream sign-out failure");
            return Err(ProviderError::Unavailable(msg));
        }
        self.sign_out_upstream();
        Ok(())
    }

    async fn clear_local_artifacts(&self) -> Result<(), ProviderError> {
        self.artifact_clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
