//! Job lifecycle integration tests. Patterns that need a real fire use
//! `* * * * * *` (every second), so each wait is bounded by a few seconds.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::json;
use takt::{schedule, Error, Job, JobOptions, JobState};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

const WAIT: Duration = Duration::from_secs(3);

#[tokio::test]
async fn double_schedule_is_rejected() {
    let job = Job::from_pattern("* * * * * *").unwrap();
    job.schedule(|this, _| this.stop()).unwrap();
    let second = job.schedule(|this, _| this.stop());
    assert!(matches!(second, Err(Error::AlreadyScheduled)));
    job.stop();
}

#[tokio::test]
async fn shorthand_schedules_and_fires() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let job = schedule("* * * * * *", JobOptions::new(), move |_, _| {
        tx.send(Utc::now()).ok();
    })
    .unwrap();
    timeout(WAIT, rx.recv()).await.expect("fired").unwrap();
    job.stop();
    assert_eq!(job.state(), JobState::Stopped);
}

#[tokio::test]
async fn context_reaches_the_callback() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let options = JobOptions::new().context(json!({"a": "b"}));
    let job = schedule("* * * * * *", options, move |this, context| {
        tx.send(context.cloned()).ok();
        this.stop();
    })
    .unwrap();
    let seen = timeout(WAIT, rx.recv()).await.expect("fired").unwrap();
    assert_eq!(seen, Some(json!({"a": "b"})));
    job.stop();
}

#[tokio::test]
async fn max_runs_one_is_observed_exhausted_then_stops() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let job = schedule(
        "* * * * * *",
        JobOptions::new().max_runs(1),
        move |this, _| {
            tx.send(this.options().max_runs).ok();
        },
    )
    .unwrap();
    let inside = timeout(WAIT, rx.recv()).await.expect("fired").unwrap();
    // The decrement commits before the callback runs.
    assert_eq!(inside, Some(0));
    sleep(Duration::from_millis(300)).await;
    assert_eq!(job.state(), JobState::Stopped);
    assert!(!job.running());
}

#[tokio::test]
async fn max_runs_is_inherited_by_the_returned_handle() {
    let scheduler = Job::new("0 0 0 1 11 4", JobOptions::new().max_runs(14)).unwrap();
    let job = scheduler.schedule(|_, _| {}).unwrap();
    assert_eq!(job.options().max_runs, Some(14));
    job.stop();
}

#[tokio::test]
async fn catch_true_contains_a_panicking_invocation() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let job = schedule(
        "* * * * * *",
        JobOptions::new().catch(true),
        move |this, _| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first invocation fails");
            }
            this.stop();
            tx.send(()).ok();
        },
    )
    .unwrap();
    // The second invocation only happens if the first panic was contained.
    timeout(WAIT, rx.recv()).await.expect("second run").unwrap();
    assert!(calls.load(Ordering::SeqCst) >= 2);
    job.stop();
}

#[tokio::test]
async fn catch_false_panic_stops_the_job() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let job = schedule("* * * * * *", JobOptions::new(), move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        panic!("unhandled");
    })
    .unwrap();
    sleep(Duration::from_millis(2500)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1, "no re-arm after the panic");
    assert_eq!(job.state(), JobState::Stopped);
    // Bookkeeping committed before the callback ran.
    assert!(job.previous().is_some());
}

#[tokio::test]
async fn paused_option_defers_the_first_fire() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let job = schedule(
        "* * * * * *",
        JobOptions::new().paused(true),
        move |this, _| {
            tx.send(()).ok();
            this.stop();
        },
    )
    .unwrap();
    assert_eq!(job.state(), JobState::Paused);
    assert!(
        timeout(Duration::from_millis(1500), rx.recv()).await.is_err(),
        "paused job must not fire"
    );
    assert!(job.resume());
    timeout(WAIT, rx.recv()).await.expect("fired after resume").unwrap();
    job.stop();
}

#[tokio::test]
async fn control_calls_never_panic_and_running_tracks_state() {
    let job = Job::from_pattern("0 0 0 * * 0").unwrap();
    assert!(!job.running());
    job.schedule(|_, _| {}).unwrap();
    assert!(job.running());
    assert!(job.pause());
    assert!(!job.running());
    assert!(job.resume());
    assert!(job.running());
    job.stop();
    assert!(!job.running());
    // All of these are idempotent no-ops on a stopped job.
    assert!(job.pause());
    assert!(!job.resume());
    job.stop();
    assert_eq!(job.state(), JobState::Stopped);
}

#[tokio::test]
async fn previous_is_none_until_the_first_run() {
    let idle = Job::from_pattern("* * * 1 11 4").unwrap();
    assert_eq!(idle.previous(), None);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let job = schedule(
        "* * * * * *",
        JobOptions::new().max_runs(1),
        move |_, _| {
            tx.send(()).ok();
        },
    )
    .unwrap();
    timeout(WAIT, rx.recv()).await.expect("fired").unwrap();
    let previous = job.previous().expect("recorded");
    let now = Utc::now();
    assert!(previous <= now);
    assert!(now - previous < chrono::Duration::seconds(3));
    job.stop();
}

#[tokio::test]
async fn stop_from_inside_the_callback_prevents_rearm() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let job = schedule("* * * * * *", JobOptions::new(), move |this, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        this.stop();
    })
    .unwrap();
    sleep(Duration::from_millis(2500)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(job.state(), JobState::Stopped);
}

#[tokio::test]
async fn pause_from_inside_the_callback_suspends_until_resumed() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let job = schedule("* * * * * *", JobOptions::new(), move |this, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        this.pause();
    })
    .unwrap();
    sleep(Duration::from_millis(2500)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(job.state(), JobState::Paused);

    assert!(job.resume());
    sleep(Duration::from_millis(2500)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(job.state(), JobState::Paused);
    job.stop();
}

#[tokio::test]
async fn past_fixed_instant_stops_at_schedule_time() {
    let job = Job::new("2020-01-01T00:00:00", JobOptions::new()).unwrap();
    job.schedule(|_, _| {}).unwrap();
    assert_eq!(job.state(), JobState::Stopped);
    assert!(!job.running());
    assert_eq!(job.next(None), None);
}

#[tokio::test]
async fn future_fixed_instant_fires_once_then_stops() {
    let at = Utc::now() + chrono::Duration::seconds(1);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let job = Job::once(at, JobOptions::new())
        .unwrap()
        .schedule(move |_, _| {
            tx.send(Utc::now()).ok();
        })
        .unwrap();
    let fired = timeout(WAIT, rx.recv()).await.expect("fired").unwrap();
    assert!(fired >= at - chrono::Duration::milliseconds(50));
    sleep(Duration::from_millis(300)).await;
    assert_eq!(job.state(), JobState::Stopped);
}

#[tokio::test]
async fn enumeration_through_the_job_is_deterministic() {
    let job = Job::new("*/30 * * * * *", JobOptions::new().timezone("Etc/UTC")).unwrap();
    let from = Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 10).unwrap();
    let runs = job.enumerate(10, Some(from));
    assert_eq!(runs.len(), 10);
    assert!(runs.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(runs[0], Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 30).unwrap());
    assert_eq!(runs[9], Utc.with_ymd_and_hms(2024, 6, 15, 10, 5, 0).unwrap());
}
