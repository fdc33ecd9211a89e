//! Takt pattern core — cron/ISO pattern parsing and timezone-aware
//! next-occurrence search.
//!
//! Pure and synchronous: every engine function takes its reference instant as
//! an explicit parameter and never reads the wall clock. The timer-driven job
//! runtime lives in the `takt` crate.
//!
//! - [`field`] — per-field grammar and bitmask sets
//! - [`schedule`] — the parsed [`Schedule`] descriptor
//! - [`engine`] — bounded next-occurrence search
//! - [`timezone`] — zone conversion adapter over chrono/chrono-tz

pub mod engine;
pub mod error;
pub mod field;
pub mod schedule;
pub mod timezone;

pub use error::{PatternError, Result};
pub use field::FieldSet;
pub use schedule::{CronPattern, Schedule};
