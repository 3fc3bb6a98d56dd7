//! Profile records and subscription activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eduforge_core::PrincipalId;

use crate::Role;

/// Subscription lifecycle state as stored on a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    None,
    Trialing,
    Active,
    Expired,
}

/// A principal's stored profile (one row per principal in the profile store).
///
/// # Invariants
/// - `school_owner_id` names the sponsoring organization owner whose subscription
///   a teacher's entitlement is delegated to.
/// - `is_school_owner` profiles pay for themselves, even if `school_owner_id` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub principal_id: PrincipalId,
    pub role: Role,
    #[serde(default)]
    pub subscription_status: SubscriptionStatus,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trial_ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub school_owner_id: Option<PrincipalId>,
    #[serde(default)]
    pub is_school_owner: bool,
}

impl ProfileRecord {
    /// A profile with the given role and no subscription.
    pub fn new(principal_id: PrincipalId, role: Role) -> Self {
        Self {
            principal_id,
            role,
            subscription_status: SubscriptionStatus::None,
            expires_at: None,
            trial_ends_at: None,
            school_owner_id: None,
            is_school_owner: false,
        }
    }

    pub fn with_active_subscription(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.subscription_status = SubscriptionStatus::Active;
        self.expires_at = expires_at;
        self
    }

    pub fn with_trial(mut self, trial_ends_at: DateTime<Utc>) -> Self {
        self.subscription_status = SubscriptionStatus::Trialing;
        self.trial_ends_at = Some(trial_ends_at);
        self
    }

    pub fn with_status(mut self, status: SubscriptionStatus) -> Self {
        self.subscription_status = status;
        self
    }

    pub fn sponsored_by(mut self, owner: PrincipalId) -> Self {
        self.school_owner_id = Some(owner);
        self
    }

    pub fn as_school_owner(mut self) -> Self {
        self.is_school_owner = true;
        self
    }

    /// Whether this profile currently holds paid access.
    ///
    /// - `active` with no `expires_at` never expires.
    /// - `active` with `expires_at` is active strictly before that instant.
    /// - `trialing` is active strictly before `trial_ends_at`; a trial without an
    ///   end date is not active.
    /// - `none` / `expired` are never active.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.subscription_status {
            SubscriptionStatus::Active => self.expires_at.is_none_or(|at| at > now),
            SubscriptionStatus::Trialing => self.trial_ends_at.is_some_and(|at| at > now),
            SubscriptionStatus::None | SubscriptionStatus::Expired => false,
        }
    }
}
