//! Job lifecycle — a schedule bound to a callback, driven by one timer.
//!
//! Control calls and the timer-fire sequence are serialized through a single
//! mutex plus an arm-generation counter (`epoch`): every state-affecting
//! transition bumps the epoch, and a firing timer that observes a stale epoch
//! does nothing. The callback itself always runs outside the lock, so it may
//! freely call `pause`/`resume`/`stop` on the handle it receives; those
//! transitions are observed by the post-fire re-arm decision, never raced.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Local, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use takt_pattern::{engine, Schedule};

use crate::error::{Error, Result};
use crate::options::JobOptions;
use crate::timer::TimerHandle;

/// Longest single timer the job arms. Waits beyond this are chunked: the
/// timer wakes, observes the target is still ahead, and re-arms the
/// remainder. Keeps far-future occurrences well inside the runtime's timer
/// range.
const MAX_TIMER_CHUNK: StdDuration = StdDuration::from_secs(30 * 24 * 60 * 60);

/// Explicit lifecycle state, checked after every callback return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Constructed, no callback bound yet.
    Idle,
    /// A timer is armed for the next occurrence.
    Armed,
    /// Suspended; `resume()` re-arms against "now".
    Paused,
    /// Terminal. No further timers are ever armed.
    Stopped,
}

type Callback = Arc<dyn Fn(&Job, Option<&Value>) + Send + Sync + 'static>;

struct Control {
    state: JobState,
    options: JobOptions,
    previous_run: Option<DateTime<Utc>>,
    callback: Option<Callback>,
    /// Arm generation counter; stale timers compare against it and bail.
    epoch: u64,
    timer: Option<TimerHandle>,
}

struct Inner {
    schedule: Schedule,
    zone: Option<Tz>,
    control: Mutex<Control>,
}

/// A live binding of a schedule to a callback, with run-control state.
///
/// Cheap to clone; every clone controls the same underlying job, and the
/// callback receives one as its first argument for re-entrant self-control.
#[derive(Clone)]
pub struct Job {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("schedule", &self.inner.schedule)
            .field("zone", &self.inner.zone)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Job {
    /// Parse `pattern` (six-field cron or ISO-8601 timestamp) and build an
    /// idle job with `options`. Naive timestamps resolve in the configured
    /// timezone, host-local when none is set.
    pub fn new(pattern: &str, options: JobOptions) -> Result<Self> {
        let zone = resolve_zone(options.timezone.as_deref())?;
        let schedule = match zone {
            Some(tz) => Schedule::parse_in(pattern, &tz)?,
            None => Schedule::parse(pattern)?,
        };
        Ok(Self::build(schedule, zone, options))
    }

    /// Build from `pattern` with default options.
    pub fn from_pattern(pattern: &str) -> Result<Self> {
        Self::new(pattern, JobOptions::default())
    }

    /// Fixed-instant job from a typed instant: fires once at `at`, or never
    /// if `at` is already past when the job is scheduled.
    pub fn once(at: DateTime<Utc>, options: JobOptions) -> Result<Self> {
        let zone = resolve_zone(options.timezone.as_deref())?;
        Ok(Self::build(Schedule::once(at), zone, options))
    }

    fn build(schedule: Schedule, zone: Option<Tz>, options: JobOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                schedule,
                zone,
                control: Mutex::new(Control {
                    state: JobState::Idle,
                    options,
                    previous_run: None,
                    callback: None,
                    epoch: 0,
                    timer: None,
                }),
            }),
        }
    }

    /// Bind `callback` and arm the first timer against `start_at` (or now).
    /// Exactly one callback may ever be bound to a job; a second call fails
    /// with [`Error::AlreadyScheduled`]. Returns a clone of the handle.
    ///
    /// Must be called within a Tokio runtime.
    pub fn schedule(
        &self,
        callback: impl Fn(&Job, Option<&Value>) + Send + Sync + 'static,
    ) -> Result<Job> {
        let mut control = self.inner.control.lock();
        if control.callback.is_some() {
            return Err(Error::AlreadyScheduled);
        }
        control.callback = Some(Arc::new(callback));

        if control.options.paused {
            control.state = JobState::Paused;
        } else if control.options.max_runs == Some(0) {
            control.state = JobState::Stopped;
        } else {
            let baseline = control.options.start_at.unwrap_or_else(Utc::now);
            self.arm_locked(&mut control, baseline);
        }
        Ok(self.clone())
    }

    /// Suspend the job and cancel its pending timer. Idempotent, never
    /// panics; returns whether the job is now not running. On an idle
    /// (unscheduled) job this sets the paused option, so `schedule()` will
    /// start paused.
    pub fn pause(&self) -> bool {
        let mut control = self.inner.control.lock();
        match control.state {
            JobState::Armed => {
                control.epoch += 1;
                if let Some(timer) = control.timer.take() {
                    timer.cancel();
                }
                control.state = JobState::Paused;
                debug!(pattern = %self.inner.schedule, "job paused");
            }
            JobState::Idle => control.options.paused = true,
            JobState::Paused | JobState::Stopped => {}
        }
        control.state != JobState::Armed
    }

    /// Re-arm a paused job against "now"; occurrences missed while paused
    /// are not queued. No-op on a stopped job. Returns whether the job is
    /// armed after the call.
    pub fn resume(&self) -> bool {
        let mut control = self.inner.control.lock();
        control.options.paused = false;
        match control.state {
            JobState::Stopped => false,
            JobState::Armed => true,
            // Not yet scheduled: `schedule()` performs the first arm.
            JobState::Idle => false,
            JobState::Paused => {
                if control.options.max_runs == Some(0) {
                    control.state = JobState::Stopped;
                    return false;
                }
                self.arm_locked(&mut control, Utc::now());
                control.state == JobState::Armed
            }
        }
    }

    /// Cancel any pending timer and stop permanently. Terminal: `resume()`
    /// on a stopped job is a no-op, and an in-flight invocation completes
    /// without re-arming.
    pub fn stop(&self) {
        let mut control = self.inner.control.lock();
        control.epoch += 1;
        if let Some(timer) = control.timer.take() {
            timer.cancel();
        }
        if control.state != JobState::Stopped {
            debug!(pattern = %self.inner.schedule, "job stopped");
        }
        control.state = JobState::Stopped;
    }

    /// Whether a timer is currently armed.
    pub fn running(&self) -> bool {
        self.inner.control.lock().state == JobState::Armed
    }

    /// The current lifecycle state.
    pub fn state(&self) -> JobState {
        self.inner.control.lock().state
    }

    /// Instant of the last completed invocation, `None` before the first.
    pub fn previous(&self) -> Option<DateTime<Utc>> {
        self.inner.control.lock().previous_run
    }

    /// Snapshot of the current options; `max_runs` reflects completed runs.
    pub fn options(&self) -> JobOptions {
        self.inner.control.lock().options.clone()
    }

    /// The schedule in textual form.
    pub fn pattern(&self) -> String {
        self.inner.schedule.to_string()
    }

    /// Next occurrence after `after`, falling back to the last run, the
    /// configured start, or now. Pure query: job state does not advance.
    pub fn next(&self, after: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        let baseline = after.unwrap_or_else(|| self.baseline());
        self.occurrence_after(baseline)
    }

    /// Up to `count` future occurrences seeded from `from` (or the same
    /// baseline as [`next`](Self::next)), strictly increasing.
    pub fn enumerate(&self, count: usize, from: Option<DateTime<Utc>>) -> Vec<DateTime<Utc>> {
        let from = from.unwrap_or_else(|| self.baseline());
        match self.inner.zone {
            Some(tz) => engine::enumerate(&self.inner.schedule, &tz, from, count),
            None => engine::enumerate(&self.inner.schedule, &Local, from, count),
        }
    }

    /// Milliseconds from `after` (or now) to the next occurrence; `None`
    /// when no occurrence exists.
    pub fn ms_to_next(&self, after: Option<DateTime<Utc>>) -> Option<i64> {
        let after = after.unwrap_or_else(Utc::now);
        match self.inner.zone {
            Some(tz) => engine::ms_until(&self.inner.schedule, &tz, after),
            None => engine::ms_until(&self.inner.schedule, &Local, after),
        }
    }

    fn baseline(&self) -> DateTime<Utc> {
        let control = self.inner.control.lock();
        control
            .previous_run
            .or(control.options.start_at)
            .unwrap_or_else(Utc::now)
    }

    fn occurrence_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.inner.zone {
            Some(tz) => engine::next(&self.inner.schedule, &tz, after),
            None => engine::next(&self.inner.schedule, &Local, after),
        }
    }

    /// Arm the timer for the next occurrence after `baseline`, or stop when
    /// none exists. The caller holds the control lock.
    fn arm_locked(&self, control: &mut Control, baseline: DateTime<Utc>) {
        match self.occurrence_after(baseline) {
            None => {
                debug!(pattern = %self.inner.schedule, "no next occurrence; job stopped");
                control.state = JobState::Stopped;
            }
            Some(at) => {
                self.arm_at_locked(control, at);
                debug!(pattern = %self.inner.schedule, at = %at, "timer armed");
            }
        }
    }

    /// Arm a timer toward the known target `at`, chunking long waits. The
    /// caller holds the control lock.
    fn arm_at_locked(&self, control: &mut Control, at: DateTime<Utc>) {
        control.epoch += 1;
        let epoch = control.epoch;
        let delay = (at - Utc::now())
            .to_std()
            .unwrap_or(StdDuration::ZERO)
            .min(MAX_TIMER_CHUNK);
        let job = self.clone();
        control.timer = Some(TimerHandle::arm(delay, move || job.fire(epoch, at)));
        control.state = JobState::Armed;
    }

    /// Timer-fire sequence. Run bookkeeping commits before the callback is
    /// invoked, so an unwinding callback never corrupts run counts; the
    /// re-arm decision re-reads state afterwards.
    fn fire(&self, epoch: u64, at: DateTime<Utc>) {
        let fired_at = Utc::now();
        let (callback, context, catch) = {
            let mut control = self.inner.control.lock();
            if control.state != JobState::Armed || control.epoch != epoch {
                return; // stale delivery: stopped, paused, or re-armed since
            }
            control.timer = None;
            if fired_at < at {
                // End of a wait chunk, target still ahead: arm the remainder.
                self.arm_at_locked(&mut control, at);
                return;
            }
            if let Some(remaining) = control.options.max_runs.as_mut() {
                *remaining = remaining.saturating_sub(1);
            }
            control.previous_run = Some(fired_at);
            let callback = match control.callback.clone() {
                Some(callback) => callback,
                None => return, // unreachable: armed implies bound
            };
            (callback, control.options.context.clone(), control.options.catch)
        };

        if catch {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                callback(self, context.as_ref());
            }));
            if outcome.is_err() {
                warn!(pattern = %self.inner.schedule, "callback panicked; recurrence continues");
            }
        } else {
            // A panic must tear the job down on its way out to the host;
            // the guard is disarmed on normal return.
            let mut teardown = StopOnUnwind {
                job: self,
                active: true,
            };
            callback(self, context.as_ref());
            teardown.active = false;
        }

        let mut control = self.inner.control.lock();
        if control.state != JobState::Armed || control.epoch != epoch {
            return; // the callback paused, resumed, or stopped the job itself
        }
        if control.options.max_runs == Some(0) {
            debug!(pattern = %self.inner.schedule, "max runs exhausted; job stopped");
            control.state = JobState::Stopped;
            return;
        }
        self.arm_locked(&mut control, Utc::now());
    }
}

fn resolve_zone(name: Option<&str>) -> Result<Option<Tz>> {
    match name {
        None => Ok(None),
        Some(name) => takt_pattern::timezone::parse_zone(name)
            .map(Some)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown timezone '{name}'"))),
    }
}

/// Tears the job down if dropped while a callback panic is unwinding.
struct StopOnUnwind<'a> {
    job: &'a Job,
    active: bool,
}

impl Drop for StopOnUnwind<'_> {
    fn drop(&mut self) {
        if self.active {
            let mut control = self.job.inner.control.lock();
            control.epoch += 1;
            control.timer = None;
            control.state = JobState::Stopped;
            warn!(pattern = %self.job.inner.schedule, "callback panicked; job stopped");
        }
    }
}
