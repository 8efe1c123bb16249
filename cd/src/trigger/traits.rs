//! The trigger engine seam consumed by the coordinator

use std::sync::Arc;

use async_trait::async_trait;

use super::error::TriggerError;

/// Opaque identifier of one registered recurrence.
///
/// Owned exclusively by the coordinator's mapping entry for the task it was
/// registered for, and released by cancelling it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerHandle(u64);

impl TriggerHandle {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TriggerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "trigger-{}", self.0)
    }
}

/// Callback invoked at each firing.
///
/// Called with no arguments, on a worker from the engine's own pool - never
/// on the administrative caller's task. Must be cheap or manage its own
/// asynchrony, and safe to invoke concurrently and repeatedly.
pub type TriggerCallback = Arc<dyn Fn() + Send + Sync>;

/// A timezone- and second-granularity-aware recurring timer.
///
/// Contract notes beyond the signatures:
/// - before [`start`](TriggerEngine::start) the engine is dormant and
///   produces no fires, regardless of how many registrations exist
/// - a firing already in flight when [`cancel`](TriggerEngine::cancel) is
///   called may complete; no new firing starts after `cancel` returns
#[async_trait]
pub trait TriggerEngine: Send + Sync {
    /// Parse `expression` and schedule `callback` at every matching instant
    async fn register(&self, expression: &str, callback: TriggerCallback) -> Result<TriggerHandle, TriggerError>;

    /// Unregister a handle; safe to call with an unknown or already
    /// cancelled handle
    async fn cancel(&self, handle: TriggerHandle);

    /// Begin comparing wall-clock time against registered expressions.
    /// Idempotent; expected to run for the lifetime of the process.
    async fn start(&self);
}
