//! Domain error model.

use thiserror::Error;

/// Deterministic failures on malformed domain input.
///
/// Backing-store and provider failures belong to the session engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("nil identifier is not a valid {0}")]
    NilId(&'static str),
}

impl DomainError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
