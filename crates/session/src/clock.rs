use chrono::{DateTime, Utc};

/// Wall-clock source for cache ages, session expiry, and subscription checks.
///
/// Injected so tests can move time without sleeping.
pub trait Clock: Send + Sync + core::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
