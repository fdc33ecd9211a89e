//! Thin wrapper over the host timer facility (the Tokio runtime).

use std::time::Duration;

use tokio::task::JoinHandle;

/// A single armed timer. Cancellation is explicit; an already-delivered fire
/// is unaffected (the job's epoch check rejects stale deliveries).
#[derive(Debug)]
pub(crate) struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Arm a timer that invokes `on_fire` once after `delay`.
    ///
    /// Must be called within a Tokio runtime.
    pub(crate) fn arm(delay: Duration, on_fire: impl FnOnce() + Send + 'static) -> Self {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire();
        });
        Self { task }
    }

    /// Cancel the pending fire.
    pub(crate) fn cancel(&self) {
        self.task.abort();
    }
}
