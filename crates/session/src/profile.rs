//! Role resolution.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use eduforge_auth::{AdminAllowList, Principal, ProfileRecord, Role};
use eduforge_core::PrincipalId;

use crate::cache::ProfileCache;
use crate::error::ResolveError;
use crate::ports::ProfileStore;
use crate::timeout::{Raced, race};

/// Which step of the cascade produced a role (diagnostic only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleSource {
    AdminAllowList,
    Cache,
    ProfileStore,
    ClaimHint,
    Default,
}

/// A resolved role, the path that produced it, and the profile it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleResolution {
    pub role: Role,
    pub source: RoleSource,
    pub profile: Option<ProfileRecord>,
}

impl RoleResolution {
    fn without_profile(role: Role, source: RoleSource) -> Self {
        Self {
            role,
            source,
            profile: None,
        }
    }
}

/// Resolves a principal's role; owns the engine's access to the profile store.
///
/// Cascade, first match wins:
/// 1. email on the admin allow-list → `Admin`
/// 2. fresh cache entry → its role
/// 3. deadline-bounded store lookup → the stored role (and cache it)
/// 4. store unreachable and the token carries a role hint → the hint
/// 5. otherwise → `Student`
///
/// Never fails: every error along the way degrades to the least-privilege default.
#[derive(Clone)]
pub struct ProfileResolver {
    store: Arc<dyn ProfileStore>,
    cache: ProfileCache,
    admins: AdminAllowList,
    lookup_timeout: Duration,
}

impl core::fmt::Debug for ProfileResolver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProfileResolver")
            .field("cache", &self.cache)
            .field("admins", &self.admins.len())
            .field("lookup_timeout", &self.lookup_timeout)
            .finish_non_exhaustive()
    }
}

impl ProfileResolver {
    /// Role assigned when the profile store cannot say otherwise.
    pub const FALLBACK_ROLE: Role = Role::Student;

    pub fn new(
        store: Arc<dyn ProfileStore>,
        cache: ProfileCache,
        admins: AdminAllowList,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            admins,
            lookup_timeout,
        }
    }

    /// How long an abandoned store call may keep running to warm the cache
    /// before its in-flight slot is released.
    fn store_call_limit(&self) -> Duration {
        self.lookup_timeout * 2
    }

    pub fn cache(&self) -> &ProfileCache {
        &self.cache
    }

    pub fn is_admin(&self, principal: &Principal) -> bool {
        self.admins.contains(&principal.email)
    }

    pub async fn resolve(&self, principal: &Principal) -> RoleResolution {
        if self.is_admin(principal) {
            tracing::debug!(principal_id = %principal.id, "role resolved from admin allow-list");
            return RoleResolution::without_profile(Role::Admin, RoleSource::AdminAllowList);
        }

        match self.lookup(principal.id).await {
            Ok((record, source)) => RoleResolution {
                role: record.role,
                source,
                profile: Some(record),
            },
            Err(ResolveError::NotFound(id)) => {
                tracing::info!(principal_id = %id, role = %Self::FALLBACK_ROLE, "no profile; using fallback role");
                RoleResolution::without_profile(Self::FALLBACK_ROLE, RoleSource::Default)
            }
            Err(err) => match principal.role_hint {
                Some(hint) => {
                    tracing::warn!(principal_id = %principal.id, error = %err, role = %hint, "profile store unreachable; using claim role hint");
                    RoleResolution::without_profile(hint, RoleSource::ClaimHint)
                }
                None => {
                    tracing::warn!(principal_id = %principal.id, error = %err, role = %Self::FALLBACK_ROLE, "profile store unreachable; using fallback role");
                    RoleResolution::without_profile(Self::FALLBACK_ROLE, RoleSource::Default)
                }
            },
        }
    }

    /// Profile for `id` from the cache, or from a coalesced, deadline-bounded
    /// store lookup. Does not apply any role cascade.
    pub async fn fetch_profile(&self, id: PrincipalId) -> Result<ProfileRecord, ResolveError> {
        self.lookup(id).await.map(|(record, _)| record)
    }

    async fn lookup(&self, id: PrincipalId) -> Result<(ProfileRecord, RoleSource), ResolveError> {
        if let Some((record, age)) = self.cache.get(id) {
            tracing::debug!(principal_id = %id, age_ms = age.as_millis() as u64, "profile cache hit");
            return Ok((record, RoleSource::Cache));
        }

        let started = Instant::now();
        let fetch = self.cache.load(id, self.store.clone(), self.store_call_limit());
        let raced = race(fetch, self.lookup_timeout).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match raced {
            Raced::Value(Ok(Some(record))) => {
                tracing::debug!(principal_id = %id, elapsed_ms, "profile fetched from store");
                Ok((record, RoleSource::ProfileStore))
            }
            Raced::Value(Ok(None)) => Err(ResolveError::NotFound(id)),
            Raced::Value(Err(source)) => Err(ResolveError::BackingStoreError {
                principal_id: id,
                source,
            }),
            Raced::TimedOut => {
                tracing::warn!(principal_id = %id, elapsed_ms, "profile lookup timed out");
                Err(ResolveError::BackingStoreTimeout {
                    principal_id: id,
                    deadline: self.lookup_timeout,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingStore, StepClock, principal};

    const LOOKUP: Duration = Duration::from_millis(1500);

    fn resolver(store: Arc<CountingStore>, admins: &str) -> ProfileResolver {
        let cache = ProfileCache::new(Arc::new(StepClock::default()), ProfileCache::DEFAULT_TTL);
        ProfileResolver::new(store, cache, AdminAllowList::parse(admins), LOOKUP)
    }

    #[tokio::test]
    async fn admin_allow_list_wins_over_stored_role() {
        let p = principal("head@eduforge.test");
        let store = Arc::new(CountingStore::new([ProfileRecord::new(p.id, Role::Student)]));
        let resolution = resolver(store.clone(), "head@eduforge.test").resolve(&p).await;

        assert_eq!(resolution.role, Role::Admin);
        assert_eq!(resolution.source, RoleSource::AdminAllowList);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn stored_role_is_cached() {
        let p = principal("teach@school.test");
        let store = Arc::new(CountingStore::new([ProfileRecord::new(p.id, Role::Teacher)]));
        let resolver = resolver(store.clone(), "");

        let first = resolver.resolve(&p).await;
        let second = resolver.resolve(&p).await;

        assert_eq!(first.role, Role::Teacher);
        assert_eq!(first.source, RoleSource::ProfileStore);
        assert_eq!(second.source, RoleSource::Cache);
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn missing_profile_falls_back_to_student() {
        let p = principal("new@school.test").with_role_hint(Role::Teacher);
        let resolution = resolver(Arc::new(CountingStore::new([])), "").resolve(&p).await;

        assert_eq!(resolution.role, Role::Student);
        assert_eq!(resolution.source, RoleSource::Default);
    }

    #[tokio::test]
    async fn store_error_uses_claim_hint_when_present() {
        let p = principal("t@school.test").with_role_hint(Role::Teacher);
        let resolution = resolver(Arc::new(CountingStore::failing()), "").resolve(&p).await;

        assert_eq!(resolution.role, Role::Teacher);
        assert_eq!(resolution.source, RoleSource::ClaimHint);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_store_fails_open_within_deadline() {
        let p = principal("slow@school.test");
        let started = Instant::now();
        let resolution = resolver(Arc::new(CountingStore::hanging()), "").resolve(&p).await;

        assert_eq!(resolution.role, Role::Student);
        assert!(started.elapsed() <= LOOKUP + Duration::from_millis(5));
    }

    #[tokio::test]
    async fn fetch_profile_reports_not_found() {
        let id = PrincipalId::new();
        let err = resolver(Arc::new(CountingStore::new([])), "")
            .fetch_profile(id)
            .await
            .unwrap_err();
        assert_eq!(err, ResolveError::NotFound(id));
    }
}
