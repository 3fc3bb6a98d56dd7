//! Engine configuration.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use eduforge_auth::AdminAllowList;

pub const ENV_ADMIN_EMAILS: &str = "EDUFORGE_ADMIN_EMAILS";
pub const ENV_PROFILE_TTL_SECS: &str = "EDUFORGE_PROFILE_TTL_SECS";
pub const ENV_LOOKUP_TIMEOUT_MS: &str = "EDUFORGE_LOOKUP_TIMEOUT_MS";
pub const ENV_INIT_TIMEOUT_MS: &str = "EDUFORGE_INIT_TIMEOUT_MS";

/// Accepted range for the profile lookup deadline: long enough for a healthy
/// store, short enough that the UI never waits noticeably.
pub const LOOKUP_TIMEOUT_RANGE_MS: core::ops::RangeInclusive<u64> = 1000..=1500;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be an unsigned integer, got '{value}'")]
    NotANumber { key: &'static str, value: String },

    #[error("{key} out of range: {reason}")]
    OutOfRange { key: &'static str, reason: String },
}

/// Session engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Emails that always resolve to `Admin` with full entitlement.
    pub admin_emails: AdminAllowList,
    /// Time-to-live of cached profile records.
    pub profile_ttl_secs: u64,
    /// Deadline for a single profile-store lookup.
    pub lookup_timeout_ms: u64,
    /// Deadline for fetching the initial session at startup.
    pub init_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            admin_emails: AdminAllowList::default(),
            profile_ttl_secs: 5 * 60,
            lookup_timeout_ms: 1500,
            init_timeout_ms: 2000,
        }
    }
}

impl EngineConfig {
    pub fn with_admin_emails(mut self, admins: AdminAllowList) -> Self {
        self.admin_emails = admins;
        self
    }

    pub fn with_profile_ttl(mut self, ttl: Duration) -> Self {
        self.profile_ttl_secs = ttl.as_secs();
        self
    }

    pub fn with_lookup_timeout(mut self, deadline: Duration) -> Self {
        self.lookup_timeout_ms = deadline.as_millis() as u64;
        self
    }

    pub fn with_init_timeout(mut self, deadline: Duration) -> Self {
        self.init_timeout_ms = deadline.as_millis() as u64;
        self
    }

    pub fn profile_ttl(&self) -> Duration {
        Duration::from_secs(self.profile_ttl_secs)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    /// Load configuration from the process environment.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup (environment, test map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_ADMIN_EMAILS) {
            config.admin_emails = AdminAllowList::parse(&raw);
        }
        if let Some(secs) = parse_u64(&lookup, ENV_PROFILE_TTL_SECS)? {
            config.profile_ttl_secs = secs;
        }
        if let Some(ms) = parse_u64(&lookup, ENV_LOOKUP_TIMEOUT_MS)? {
            config.lookup_timeout_ms = ms;
        }
        if let Some(ms) = parse_u64(&lookup, ENV_INIT_TIMEOUT_MS)? {
            config.init_timeout_ms = ms;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOOKUP_TIMEOUT_RANGE_MS.contains(&self.lookup_timeout_ms) {
            return Err(ConfigError::OutOfRange {
                key: ENV_LOOKUP_TIMEOUT_MS,
                reason: format!(
                    "{} not within {}..={} ms",
                    self.lookup_timeout_ms,
                    LOOKUP_TIMEOUT_RANGE_MS.start(),
                    LOOKUP_TIMEOUT_RANGE_MS.end()
                ),
            });
        }
        if self.init_timeout_ms == 0 {
            return Err(ConfigError::OutOfRange {
                key: ENV_INIT_TIMEOUT_MS,
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.profile_ttl_secs == 0 {
            return Err(ConfigError::OutOfRange {
                key: ENV_PROFILE_TTL_SECS,
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_u64<F>(lookup: &F, key: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::NotANumber { key, value: raw }),
    }
}
