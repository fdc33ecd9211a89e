//! Zone conversion adapter — the contract the parser and engine consume from
//! chrono/chrono-tz. All DST policy lives here and in the engine's match on
//! [`LocalResult`]; nothing else interprets offsets.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Number of days in `month` of `year`, leap-aware.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    // Day 1 of the following month, stepped back one day.
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(0)
}

/// Map a wall-clock time observed in `zone` to an instant using the zone's
/// canonical rules. The [`LocalResult`] is forwarded untouched: the caller
/// decides what a DST gap or overlap means for its search.
pub fn to_instant<Z: TimeZone>(zone: &Z, wall: NaiveDateTime) -> LocalResult<DateTime<Z>> {
    zone.from_local_datetime(&wall)
}

/// Wall-clock calendar fields of `instant` as observed in `zone`.
pub fn to_wall_clock<Z: TimeZone>(zone: &Z, instant: DateTime<Utc>) -> NaiveDateTime {
    instant.with_timezone(zone).naive_local()
}

/// Resolve a wall-clock time to a single UTC instant: unambiguous times map
/// directly, fall-back overlaps take the earliest mapping, and spring-forward
/// gaps shift one hour forward to the first representable instant.
pub fn resolve_forward<Z: TimeZone>(zone: &Z, wall: NaiveDateTime) -> Option<DateTime<Utc>> {
    match zone.from_local_datetime(&wall) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => match zone.from_local_datetime(&(wall + Duration::hours(1))) {
            LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
            LocalResult::None => None,
        },
    }
}

/// Strict IANA zone lookup. An unknown name is the caller's error to surface,
/// never a silent fallback.
pub fn parse_zone(name: &str) -> Option<chrono_tz::Tz> {
    name.parse::<chrono_tz::Tz>().ok()
}
