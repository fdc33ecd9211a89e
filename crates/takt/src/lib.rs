//! Takt — an embedded time-pattern scheduler.
//!
//! Parses six-field cron patterns (seconds granularity) and ISO-8601
//! timestamps, computes future occurrences in any IANA timezone, and drives
//! a recurring callback bound to the pattern. No daemon, no persistence: a
//! job is a value owned by the host process, armed on the Tokio runtime.
//!
//! - [`job`] — the [`Job`] handle and its lifecycle state machine
//! - [`options`] — run-control options ([`JobOptions`])
//! - [`error`] — the error taxonomy
//!
//! The pure pattern/engine core is re-exported from `takt-pattern`.
//!
//! ```no_run
//! use takt::{schedule, JobOptions};
//!
//! # fn demo() -> takt::Result<()> {
//! let job = schedule("*/30 * * * * *", JobOptions::new().max_runs(10), |job, _context| {
//!     println!("fired; next up at {:?}", job.next(None));
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod job;
pub mod options;
mod timer;

pub use error::{Error, Result};
pub use job::{Job, JobState};
pub use options::JobOptions;

pub use takt_pattern::{engine, CronPattern, FieldSet, PatternError, Schedule};

use serde_json::Value;

/// Parse `pattern`, build a job with `options`, bind `callback`, and arm it:
/// shorthand for [`Job::new`] followed by [`Job::schedule`].
///
/// Must be called within a Tokio runtime.
pub fn schedule(
    pattern: &str,
    options: JobOptions,
    callback: impl Fn(&Job, Option<&Value>) + Send + Sync + 'static,
) -> Result<Job> {
    Job::new(pattern, options)?.schedule(callback)
}
