//! Cron field grammar — each field parses into a bitmask set over its range.

use serde::{Deserialize, Serialize};

use crate::error::{PatternError, Result};

/// Declared numeric range and symbolic names of one cron field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub min: u32,
    pub max: u32,
    /// Names accepted in this field (three-letter and full English forms),
    /// resolved to numeric values before range validation.
    names: &'static [(&'static str, u32)],
    /// A value folded into another at insertion (weekday 7 → 0, Sunday).
    fold: Option<(u32, u32)>,
}

pub const SECONDS: FieldSpec = FieldSpec {
    name: "second",
    min: 0,
    max: 59,
    names: &[],
    fold: None,
};

pub const MINUTES: FieldSpec = FieldSpec {
    name: "minute",
    min: 0,
    max: 59,
    names: &[],
    fold: None,
};

pub const HOURS: FieldSpec = FieldSpec {
    name: "hour",
    min: 0,
    max: 23,
    names: &[],
    fold: None,
};

pub const DAYS_OF_MONTH: FieldSpec = FieldSpec {
    name: "day-of-month",
    min: 1,
    max: 31,
    names: &[],
    fold: None,
};

pub const MONTHS: FieldSpec = FieldSpec {
    name: "month",
    min: 1,
    max: 12,
    names: MONTH_NAMES,
    fold: None,
};

/// Weekdays accept both 0 and 7 for Sunday; 7 folds to the canonical 0.
pub const DAYS_OF_WEEK: FieldSpec = FieldSpec {
    name: "day-of-week",
    min: 0,
    max: 7,
    names: WEEKDAY_NAMES,
    fold: Some((7, 0)),
};

const MONTH_NAMES: &[(&str, u32)] = &[
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("may", 5),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
];

const WEEKDAY_NAMES: &[(&str, u32)] = &[
    ("sun", 0),
    ("mon", 1),
    ("tue", 2),
    ("wed", 3),
    ("thu", 4),
    ("fri", 5),
    ("sat", 6),
    ("sunday", 0),
    ("monday", 1),
    ("tuesday", 2),
    ("wednesday", 3),
    ("thursday", 4),
    ("friday", 5),
    ("saturday", 6),
];

impl FieldSpec {
    /// Resolve one token to a numeric value: symbolic names first, then a
    /// range-checked integer.
    fn value(&self, token: &str) -> Result<u32> {
        let lower = token.to_ascii_lowercase();
        if let Some(&(_, v)) = self.names.iter().find(|(n, _)| *n == lower) {
            return Ok(v);
        }
        match token.parse::<i64>() {
            Ok(v) if v >= self.min as i64 && v <= self.max as i64 => Ok(v as u32),
            Ok(v) => Err(PatternError::OutOfRange {
                field: self.name,
                value: v,
                min: self.min,
                max: self.max,
            }),
            Err(_) => Err(PatternError::Malformed {
                field: self.name,
                token: token.to_string(),
            }),
        }
    }
}

/// One parsed cron field: a membership bitmask plus a wildcard marker.
///
/// The wildcard flag distinguishes `*` from an explicit full-range list,
/// which is what decides whether the field constrains day matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSet {
    bits: u64,
    wildcard: bool,
}

impl FieldSet {
    /// Parse one field (`*`, `N`, `N-M`, `*/S`, `N-M/S`, comma lists).
    ///
    /// Every accepted part inserts at least one value, so a parsed set is
    /// never empty.
    pub fn parse(text: &str, spec: &FieldSpec) -> Result<Self> {
        let mut set = Self {
            bits: 0,
            wildcard: text == "*",
        };
        for part in text.split(',') {
            set.add_part(part, spec)?;
        }
        Ok(set)
    }

    fn add_part(&mut self, part: &str, spec: &FieldSpec) -> Result<()> {
        let (base, step) = match part.split_once('/') {
            Some((base, step_text)) => {
                let step = step_text.parse::<u32>().map_err(|_| PatternError::Malformed {
                    field: spec.name,
                    token: part.to_string(),
                })?;
                if step == 0 {
                    return Err(PatternError::ZeroStep { field: spec.name });
                }
                (base, step)
            }
            None => (part, 1),
        };

        let (start, end) = if base == "*" {
            (spec.min, spec.max)
        } else if let Some((lo, hi)) = base.split_once('-') {
            let lo = spec.value(lo)?;
            let hi = spec.value(hi)?;
            if lo > hi {
                return Err(PatternError::InvertedRange {
                    field: spec.name,
                    start: lo,
                    end: hi,
                });
            }
            (lo, hi)
        } else {
            let v = spec.value(base)?;
            if step != 1 {
                // `N/S` is only meaningful on a range or wildcard base.
                return Err(PatternError::Malformed {
                    field: spec.name,
                    token: part.to_string(),
                });
            }
            (v, v)
        };

        let mut v = start;
        while v <= end {
            self.insert(v, spec);
            v += step;
        }
        Ok(())
    }

    fn insert(&mut self, value: u32, spec: &FieldSpec) {
        let v = match spec.fold {
            Some((from, to)) if value == from => to,
            _ => value,
        };
        self.bits |= 1 << v;
    }

    pub fn contains(&self, value: u32) -> bool {
        value < 64 && self.bits & (1 << value) != 0
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Smallest member of the set.
    pub fn first(&self) -> u32 {
        self.bits.trailing_zeros()
    }

    /// Smallest member ≥ `value`, or `None` when the set is exhausted there.
    pub fn next_at_or_after(&self, value: u32) -> Option<u32> {
        if value >= 64 {
            return None;
        }
        let masked = self.bits & (u64::MAX << value);
        if masked == 0 {
            None
        } else {
            Some(masked.trailing_zeros())
        }
    }
}
