//! Entitlement (paid access) resolution, including sponsor delegation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use eduforge_auth::{Principal, ProfileRecord, Role};
use eduforge_core::PrincipalId;

use crate::clock::Clock;
use crate::profile::{ProfileResolver, RoleResolution, RoleSource};

/// Which path decided an entitlement (diagnostic only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementSource {
    AdminAllowList,
    /// The role needs no paid subscription.
    RoleExempt,
    OwnSubscription,
    SponsorSubscription(PrincipalId),
    /// A profile needed for the decision could not be read.
    LookupFailed,
    UnknownRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntitlementResolution {
    pub entitled: bool,
    pub source: EntitlementSource,
}

impl EntitlementResolution {
    fn new(entitled: bool, source: EntitlementSource) -> Self {
        Self { entitled, source }
    }

    fn denied(source: EntitlementSource) -> Self {
        Self::new(false, source)
    }
}

/// Decides whether a principal currently holds paid access.
///
/// Fails closed: whenever a profile needed for the decision cannot be read, the
/// answer is `false`.
#[derive(Debug, Clone)]
pub struct EntitlementResolver {
    profiles: Arc<ProfileResolver>,
    clock: Arc<dyn Clock>,
}

impl EntitlementResolver {
    pub fn new(profiles: Arc<ProfileResolver>, clock: Arc<dyn Clock>) -> Self {
        Self { profiles, clock }
    }

    pub async fn resolve(&self, principal: &Principal, roles: &RoleResolution) -> EntitlementResolution {
        if self.profiles.is_admin(principal) {
            return EntitlementResolution::new(true, EntitlementSource::AdminAllowList);
        }

        let own = match (&roles.profile, roles.source) {
            (Some(profile), _) => profile.clone(),
            // The role cascade already failed to read this profile.
            (None, RoleSource::Default | RoleSource::ClaimHint) => {
                tracing::info!(principal_id = %principal.id, "no readable profile; entitlement denied");
                return EntitlementResolution::denied(EntitlementSource::LookupFailed);
            }
            (None, RoleSource::AdminAllowList | RoleSource::Cache | RoleSource::ProfileStore) => {
                match self.profiles.fetch_profile(principal.id).await {
                    Ok(profile) => profile,
                    Err(err) => {
                        tracing::warn!(principal_id = %principal.id, error = %err, "own profile lookup failed; entitlement denied");
                        return EntitlementResolution::denied(EntitlementSource::LookupFailed);
                    }
                }
            }
        };

        let now = self.clock.now();
        let resolution = match roles.role {
            Role::Admin | Role::Student => EntitlementResolution::new(true, EntitlementSource::RoleExempt),
            Role::Learner => own_subscription(&own, now),
            Role::Teacher => self.teacher(&own, now).await,
            Role::Unknown => EntitlementResolution::denied(EntitlementSource::UnknownRole),
        };

        tracing::debug!(
            principal_id = %principal.id,
            role = %roles.role,
            entitled = resolution.entitled,
            source = ?resolution.source,
            "entitlement resolved"
        );
        resolution
    }

    async fn teacher(&self, own: &ProfileRecord, now: DateTime<Utc>) -> EntitlementResolution {
        if own.is_school_owner {
            return own_subscription(own, now);
        }

        let Some(sponsor_id) = own.school_owner_id else {
            return own_subscription(own, now);
        };

        // The whole entitlement is delegated; the sponsor's role does not matter.
        match self.profiles.fetch_profile(sponsor_id).await {
            Ok(sponsor) => EntitlementResolution::new(
                sponsor.is_active(now),
                EntitlementSource::SponsorSubscription(sponsor_id),
            ),
            Err(err) => {
                tracing::warn!(
                    principal_id = %own.principal_id,
                    sponsor_id = %sponsor_id,
                    error = %err,
                    "sponsor profile lookup failed; entitlement denied"
                );
                EntitlementResolution::denied(EntitlementSource::LookupFailed)
            }
        }
    }
}

fn own_subscription(profile: &ProfileRecord, now: DateTime<Utc>) -> EntitlementResolution {
    EntitlementResolution::new(profile.is_active(now), EntitlementSource::OwnSubscription)
}
