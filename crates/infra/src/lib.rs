//! Infrastructure adapters for the session engine's ports.
//!
//! Production deployments plug in adapters for the hosted auth service and the
//! profile database; the in-memory adapters here back tests and local dev, and
//! can simulate slow, failing, or hanging collaborators.

pub mod clock;
pub mod credentials;
pub mod fault;
pub mod profile_store;

pub use clock::ManualClock;
pub use credentials::InMemoryCredentialProvider;
pub use fault::Fault;
pub use profile_store::InMemoryProfileStore;
