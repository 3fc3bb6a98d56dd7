//! Test doubles for unit tests inside this crate.
//!
//! Integration tests use the `eduforge-infra` adapters instead.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::watch;

use eduforge_auth::{Principal, ProfileRecord};
use eduforge_core::PrincipalId;

use crate::clock::Clock;
use crate::error::StoreError;
use crate::ports::ProfileStore;

pub(crate) fn principal(email: &str) -> Principal {
    Principal::new(PrincipalId::new(), email)
}

/// Clock pinned to a fixed instant that only moves when told to.
#[derive(Debug)]
pub(crate) struct StepClock(Mutex<DateTime<Utc>>);

impl Default for StepClock {
    fn default() -> Self {
        Self(Mutex::new(Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap()))
    }
}

impl StepClock {
    pub(crate) fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += chrono::Duration::from_std(by).unwrap();
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

#[derive(Clone, Copy)]
enum Mode {
    Serve,
    Fail,
    Hang,
}

/// Profile store that counts lookups and can fail, hang, or wait for a gate.
pub(crate) struct CountingStore {
    records: HashMap<PrincipalId, ProfileRecord>,
    calls: AtomicUsize,
    gate: watch::Sender<bool>,
    mode: Mode,
    overrides: HashMap<PrincipalId, Mode>,
}

impl CountingStore {
    fn build(records: impl IntoIterator<Item = ProfileRecord>, open: bool, mode: Mode) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.principal_id, r)).collect(),
            calls: AtomicUsize::new(0),
            gate: watch::Sender::new(open),
            mode,
            overrides: HashMap::new(),
        }
    }

    pub(crate) fn new(records: impl IntoIterator<Item = ProfileRecord>) -> Self {
        Self::build(records, true, Mode::Serve)
    }

    /// Lookups block until [`CountingStore::release`] is called.
    pub(crate) fn gated(records: impl IntoIterator<Item = ProfileRecord>) -> Self {
        Self::build(records, false, Mode::Serve)
    }

    pub(crate) fn failing() -> Self {
        Self::build([], true, Mode::Fail)
    }

    pub(crate) fn hanging() -> Self {
        Self::build([], true, Mode::Hang)
    }

    /// Lookups for `id` fail while every other id is served normally.
    pub(crate) fn failing_for(mut self, id: PrincipalId) -> Self {
        self.overrides.insert(id, Mode::Fail);
        self
    }

    /// Lookups for `id` never answer while every other id is served normally.
    pub(crate) fn hanging_for(mut self, id: PrincipalId) -> Self {
        self.overrides.insert(id, Mode::Hang);
        self
    }

    pub(crate) fn release(&self) {
        self.gate.send_replace(true);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileStore for CountingStore {
    async fn get_profile(&self, principal_id: PrincipalId) -> Result<Option<ProfileRecord>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        match self.overrides.get(&principal_id).copied().unwrap_or(self.mode) {
            Mode::Serve => Ok(self.records.get(&principal_id).cloned()),
            Mode::Fail => Err(StoreError::Unavailable("connection refused".to_string())),
            Mode::Hang => std::future::pending().await,
        }
    }
}
