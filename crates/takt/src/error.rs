use thiserror::Error;

/// Errors raised synchronously by job construction and control.
#[derive(Error, Debug)]
pub enum Error {
    /// The pattern text failed to parse.
    #[error(transparent)]
    Pattern(#[from] takt_pattern::PatternError),

    /// An option or argument had a shape the API cannot accept, such as an
    /// IANA zone name that does not resolve.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `schedule()` was called a second time on the same job.
    #[error("a callback is already scheduled on this job")]
    AlreadyScheduled,
}

pub type Result<T> = std::result::Result<T, Error>;
