//! Job run-control options.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Run-control options copied into each job. Every recognized option is a
/// struct field with an explicit default; there is no dynamic option bag, so
/// unknown options are unrepresentable.
#[derive(Debug, Clone, Default)]
pub struct JobOptions {
    /// Remaining permitted executions; `None` is unlimited. Decremented
    /// before each invocation; the job stops once it reaches 0.
    pub max_runs: Option<u32>,
    /// Contain callback panics and keep the recurrence alive.
    pub catch: bool,
    /// Start in the paused state.
    pub paused: bool,
    /// Baseline for the first computed occurrence instead of "now".
    pub start_at: Option<DateTime<Utc>>,
    /// IANA zone name; `None` observes the host-local zone.
    pub timezone: Option<String>,
    /// Opaque value handed to every callback invocation.
    pub context: Option<Value>,
}

impl JobOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_runs(mut self, runs: u32) -> Self {
        self.max_runs = Some(runs);
        self
    }

    pub fn catch(mut self, catch: bool) -> Self {
        self.catch = catch;
        self
    }

    pub fn paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }

    pub fn start_at(mut self, at: DateTime<Utc>) -> Self {
        self.start_at = Some(at);
        self
    }

    pub fn timezone(mut self, zone: impl Into<String>) -> Self {
        self.timezone = Some(zone.into());
        self
    }

    pub fn context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}
