//! `eduforge-session`
//!
//! **Responsibility:** resolve who the signed-in principal is, what role they hold,
//! and whether they currently have paid access, under bounded latency.
//!
//! This crate provides:
//! - `race`: deadline-bounded awaiting (`timeout`)
//! - `ProfileCache`: TTL cache with request coalescing (`cache`)
//! - `ProfileResolver` / `EntitlementResolver`: fallback cascades (`profile`, `entitlement`)
//! - `AuthEventCoordinator`: the auth lifecycle state machine (`coordinator`)
//! - `SessionStore`: the facade consumed by dashboards and games (`store`)
//!
//! Role resolution fails open (least-privilege `Student`); entitlement resolution
//! fails closed (`false`). Neither ever surfaces a backing-store error.

pub mod cache;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod entitlement;
pub mod error;
pub mod ports;
pub mod profile;
pub mod store;
pub mod timeout;

pub use cache::ProfileCache;
pub use clock::{Clock, SystemClock};
pub use config::{ConfigError, EngineConfig};
pub use coordinator::{AuthEventCoordinator, AuthState, Presence, SessionSnapshot};
pub use entitlement::{EntitlementResolution, EntitlementResolver, EntitlementSource};
pub use error::{ProviderError, ResolveError, SessionError, StoreError};
pub use ports::{AuthEvent, CredentialProvider, ProfileStore};
pub use profile::{ProfileResolver, RoleResolution, RoleSource};
pub use store::{SessionStore, SessionStoreBuilder};
pub use timeout::{Raced, race};

#[cfg(test)]
pub(crate) mod testing;
