//! Schedule descriptor — the parsed, immutable form of a pattern.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PatternError, Result};
use crate::field::{self, FieldSet};
use crate::timezone;

/// Recurring six-field cron pattern:
/// `second minute hour day-of-month month day-of-week`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronPattern {
    pub(crate) seconds: FieldSet,
    pub(crate) minutes: FieldSet,
    pub(crate) hours: FieldSet,
    pub(crate) days_of_month: FieldSet,
    pub(crate) months: FieldSet,
    pub(crate) days_of_week: FieldSet,
    source: String,
}

impl CronPattern {
    pub fn parse(source: &str) -> Result<Self> {
        let fields: Vec<&str> = source.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(PatternError::Unrecognized {
                input: source.to_string(),
            });
        }
        Ok(Self {
            seconds: FieldSet::parse(fields[0], &field::SECONDS)?,
            minutes: FieldSet::parse(fields[1], &field::MINUTES)?,
            hours: FieldSet::parse(fields[2], &field::HOURS)?,
            days_of_month: FieldSet::parse(fields[3], &field::DAYS_OF_MONTH)?,
            months: FieldSet::parse(fields[4], &field::MONTHS)?,
            days_of_week: FieldSet::parse(fields[5], &field::DAYS_OF_WEEK)?,
            source: source.to_string(),
        })
    }

    /// Day validity: a restricted day-of-month and a restricted day-of-week
    /// must BOTH admit the candidate; a wildcard field constrains nothing.
    pub(crate) fn day_matches(&self, year: i32, month: u32, day: u32) -> bool {
        if !self.days_of_month.is_wildcard() && !self.days_of_month.contains(day) {
            return false;
        }
        if self.days_of_week.is_wildcard() {
            return true;
        }
        match NaiveDate::from_ymd_opt(year, month, day) {
            Some(date) => self
                .days_of_week
                .contains(date.weekday().num_days_from_sunday()),
            None => false,
        }
    }

    /// The original pattern text.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// A parsed pattern: either a recurring cron rule or a single fixed instant.
/// The two modes are mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Schedule {
    /// Fires exactly once, at a predetermined absolute instant.
    Once { at: DateTime<Utc> },
    /// Recurring six-field cron pattern.
    Cron(CronPattern),
}

impl Schedule {
    /// Parse `source`, resolving naive ISO timestamps in the host-local zone.
    pub fn parse(source: &str) -> Result<Self> {
        Self::parse_in(source, &chrono::Local)
    }

    /// Parse `source` as a six-field cron pattern or, failing the field
    /// count, as an ISO-8601 timestamp resolved in `zone`. A naive timestamp
    /// inside a DST gap shifts forward; an ambiguous one takes the earliest
    /// mapping.
    pub fn parse_in<Z: TimeZone>(source: &str, zone: &Z) -> Result<Self> {
        let trimmed = source.trim();
        if trimmed.split_whitespace().count() == 6 {
            return Ok(Self::Cron(CronPattern::parse(trimmed)?));
        }
        if let Some(at) = parse_iso(trimmed, zone) {
            return Ok(Self::Once { at });
        }
        Err(PatternError::Unrecognized {
            input: source.to_string(),
        })
    }

    /// Fixed-instant schedule from a typed instant.
    pub fn once(at: DateTime<Utc>) -> Self {
        Self::Once { at }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Once { at } => write!(f, "{}", at.to_rfc3339()),
            Self::Cron(pattern) => f.write_str(pattern.source()),
        }
    }
}

/// RFC 3339 first (carries its own offset), then naive ISO forms resolved in
/// `zone`, then a bare date at midnight.
fn parse_iso<Z: TimeZone>(text: &str, zone: &Z) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return timezone::resolve_forward(zone, naive);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return timezone::resolve_forward(zone, date.and_hms_opt(0, 0, 0)?);
    }
    None
}
