//! `eduforge-core`: identity primitives shared by the auth and session crates.
//!
//! Pure domain code (no IO, no async).

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::PrincipalId;
