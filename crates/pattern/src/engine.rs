//! Next-occurrence search — a bounded odometer walk over wall-clock fields.
//!
//! Every function takes its reference instant explicitly and never reads the
//! wall clock, so results are a pure function of schedule, zone, and start.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, TimeZone, Timelike, Utc};
use tracing::debug;

use crate::schedule::{CronPattern, Schedule};
use crate::timezone;

/// Year-carry bound on the forward search. An unsatisfiable pattern (such as
/// Feb 31) walks the calendar to the horizon and resolves to `None` instead
/// of looping forever.
const YEAR_HORIZON: i32 = 3000;

/// Earliest instant strictly greater than `after` satisfying `schedule`, as
/// observed on the wall clock of `zone`, or `None` within the horizon.
pub fn next<Z: TimeZone>(
    schedule: &Schedule,
    zone: &Z,
    after: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match schedule {
        Schedule::Once { at } => {
            if *at > after {
                Some(*at)
            } else {
                None
            }
        }
        Schedule::Cron(pattern) => next_cron(pattern, zone, after),
    }
}

/// Up to `count` future occurrences seeded from `from`, strictly increasing;
/// each element re-seeds [`next`] with the previous result.
pub fn enumerate<Z: TimeZone>(
    schedule: &Schedule,
    zone: &Z,
    from: DateTime<Utc>,
    count: usize,
) -> Vec<DateTime<Utc>> {
    let mut occurrences = Vec::with_capacity(count);
    let mut cursor = from;
    for _ in 0..count {
        match next(schedule, zone, cursor) {
            Some(at) => {
                occurrences.push(at);
                cursor = at;
            }
            None => break,
        }
    }
    occurrences
}

/// Milliseconds from `from` to the next occurrence, or `None` when no
/// occurrence exists.
pub fn ms_until<Z: TimeZone>(schedule: &Schedule, zone: &Z, from: DateTime<Utc>) -> Option<i64> {
    next(schedule, zone, from).map(|at| (at - from).num_milliseconds())
}

fn next_cron<Z: TimeZone>(
    pattern: &CronPattern,
    zone: &Z,
    after: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    // Strictly-greater start: drop sub-second precision, advance one second.
    let start = timezone::to_wall_clock(zone, after).with_nanosecond(0)? + Duration::seconds(1);
    let horizon = start.year() + YEAR_HORIZON;

    let mut year = start.year();
    let mut month = start.month();
    let mut day = start.day();
    let mut hour = start.hour();
    let mut minute = start.minute();
    let mut second = start.second();

    loop {
        if year > horizon {
            debug!(pattern = %pattern.source(), "no occurrence within the search horizon");
            return None;
        }

        // Month, carrying into the next year when exhausted.
        match pattern.months.next_at_or_after(month) {
            Some(m) if m == month => {}
            Some(m) => {
                month = m;
                day = 1;
                hour = pattern.hours.first();
                minute = pattern.minutes.first();
                second = pattern.seconds.first();
            }
            None => {
                year += 1;
                month = pattern.months.first();
                day = 1;
                hour = pattern.hours.first();
                minute = pattern.minutes.first();
                second = pattern.seconds.first();
                continue;
            }
        }

        // Day: the smallest calendar day ≥ `day` admitted by both day fields
        // in this concrete month (out-of-range days simply never match).
        let last = timezone::days_in_month(year, month);
        match (day..=last).find(|&d| pattern.day_matches(year, month, d)) {
            Some(d) if d == day => {}
            Some(d) => {
                day = d;
                hour = pattern.hours.first();
                minute = pattern.minutes.first();
                second = pattern.seconds.first();
            }
            None => {
                // The month-set lookup above turns 13 into a year carry.
                month += 1;
                day = 1;
                hour = pattern.hours.first();
                minute = pattern.minutes.first();
                second = pattern.seconds.first();
                continue;
            }
        }

        // Hour.
        match pattern.hours.next_at_or_after(hour) {
            Some(h) if h == hour => {}
            Some(h) => {
                hour = h;
                minute = pattern.minutes.first();
                second = pattern.seconds.first();
            }
            None => {
                day += 1;
                hour = pattern.hours.first();
                minute = pattern.minutes.first();
                second = pattern.seconds.first();
                continue;
            }
        }

        // Minute.
        match pattern.minutes.next_at_or_after(minute) {
            Some(m) if m == minute => {}
            Some(m) => {
                minute = m;
                second = pattern.seconds.first();
            }
            None => {
                hour += 1;
                minute = pattern.minutes.first();
                second = pattern.seconds.first();
                continue;
            }
        }

        // Second.
        match pattern.seconds.next_at_or_after(second) {
            Some(s) => second = s,
            None => {
                minute += 1;
                second = pattern.seconds.first();
                continue;
            }
        }

        // Candidate wall-clock time assembled; map it through the zone.
        let wall = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, minute, second))?;
        match timezone::to_instant(zone, wall) {
            LocalResult::Single(dt) => return Some(dt.with_timezone(&Utc)),
            // Fall-back overlap: the earliest mapping is canonical.
            LocalResult::Ambiguous(earliest, _) => return Some(earliest.with_timezone(&Utc)),
            // Spring-forward gap: this wall-clock time never happens.
            LocalResult::None => {
                minute += 1;
                second = pattern.seconds.first();
                continue;
            }
        }
    }
}
