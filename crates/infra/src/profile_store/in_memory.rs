use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use eduforge_auth::ProfileRecord;
use eduforge_core::PrincipalId;
use eduforge_session::{ProfileStore, StoreError};

use crate::fault::Fault;

/// In-memory profile table keyed by principal id.
///
/// Intended for tests/dev. Counts lookups per principal so callers can assert
/// how often the backing store was actually hit.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    rows: RwLock<HashMap<PrincipalId, ProfileRecord>>,
    lookups: RwLock<HashMap<PrincipalId, usize>>,
    total: AtomicUsize,
    fault: RwLock<Fault>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: impl IntoIterator<Item = ProfileRecord>) -> Self {
        let store = Self::new();
        for profile in profiles {
            store.upsert(profile);
        }
        store
    }

    pub fn upsert(&self, profile: ProfileRecord) {
        if let Ok(mut rows) = self.rows.write() {
            rows.insert(profile.principal_id, profile);
        }
    }

    pub fn remove(&self, id: PrincipalId) {
        if let Ok(mut rows) = self.rows.write() {
            rows.remove(&id);
        }
    }

    /// Behaviour of subsequent lookups.
    pub fn set_fault(&self, fault: Fault) {
        if let Ok(mut current) = self.fault.write() {
            *current = fault;
        }
    }

    /// Lookups issued for `id` so far (including failed and hanging ones).
    pub fn lookups(&self, id: PrincipalId) -> usize {
        self.lookups
            .read()
            .ok()
            .and_then(|l| l.get(&id).copied())
            .unwrap_or(0)
    }

    /// Lookups issued so far, across all principals.
    pub fn total_lookups(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_profile(&self, principal_id: PrincipalId) -> Result<Option<ProfileRecord>, StoreError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut lookups) = self.lookups.write() {
            *lookups.entry(principal_id).or_default() += 1;
        }

        let fault = self.fault.read().map(|f| f.clone()).unwrap_or_default();
        if fault != Fault::None {
            tracing::debug!(principal_id = %principal_id, fault = ?fault, "injecting profile store fault");
        }
        if let Some(msg) = fault.inject().await {
            return Err(StoreError::Unavailable(msg));
        }

        let rows = self
            .rows
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        Ok(rows.get(&principal_id).cloned())
    }
}
