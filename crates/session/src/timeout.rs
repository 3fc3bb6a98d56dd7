//! Deadline-bounded awaiting.

use std::future::Future;
use std::time::Duration;

/// Outcome of [`race`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Raced<T> {
    Value(T),
    TimedOut,
}

impl<T> Raced<T> {
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Raced::TimedOut)
    }
}

/// Race `op` against `deadline`.
///
/// Returns within `deadline` (plus timer granularity) whatever `op` does. On
/// timeout `op` is dropped, so its eventual output can never reach this caller.
/// Work that must outlive the caller (such as a profile fetch that should still
/// warm the cache) has to be spawned by the caller before racing its handle.
pub async fn race<F>(op: F, deadline: Duration) -> Raced<F::Output>
where
    F: Future,
{
    match tokio::time::timeout(deadline, op).await {
        Ok(value) => Raced::Value(value),
        Err(_elapsed) => Raced::TimedOut,
    }
}
