//! `eduforge-auth`: pure authentication/authorization domain (no IO).
//!
//! This crate is intentionally decoupled from the credential provider and the
//! profile store: it models who a principal is, what their profile says, and the
//! pure policy decisions (admin allow-list, subscription activity, role gates)
//! that the session engine composes.

pub mod admin;
pub mod authorize;
pub mod principal;
pub mod profile;
pub mod roles;
pub mod session;

pub use admin::AdminAllowList;
pub use authorize::{AuthzError, RoleGate, authorize_role, explain_authorization};
pub use eduforge_core::PrincipalId;
pub use principal::Principal;
pub use profile::{ProfileRecord, SubscriptionStatus};
pub use roles::Role;
pub use session::{Credential, Session, TokenValidationError, validate_session};
