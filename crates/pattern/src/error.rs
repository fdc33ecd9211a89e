use thiserror::Error;

/// Errors produced while parsing a pattern into a [`Schedule`](crate::Schedule).
///
/// All of these surface synchronously at construction time; a pattern that
/// parses can still turn out to be unsatisfiable, which is reported as a
/// `None` occurrence by the engine, never as an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("'{input}' is neither a 6-field cron pattern nor an ISO-8601 timestamp")]
    Unrecognized { input: String },

    #[error("{field}: value {value} out of range {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: u32,
        max: u32,
    },

    #[error("{field}: malformed token '{token}'")]
    Malformed { field: &'static str, token: String },

    #[error("{field}: range start {start} > end {end}")]
    InvertedRange {
        field: &'static str,
        start: u32,
        end: u32,
    },

    #[error("{field}: step must be at least 1")]
    ZeroStep { field: &'static str },
}

pub type Result<T> = std::result::Result<T, PatternError>;
