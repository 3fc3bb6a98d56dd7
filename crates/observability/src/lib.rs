//! Tracing/logging setup shared by every process embedding the session engine.

/// Tracing configuration (filters, layers).
pub mod tracing;

/// Initialize process-wide observability (JSON logs, `RUST_LOG` filtering).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Initialize human-readable logging captured by the test harness.
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_for_tests() {
    tracing::init_test();
}
