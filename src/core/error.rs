use thiserror::Error;

/// Errors rejecting run input before any model is built.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("month must be within 1..=12, got {0}")]
    InvalidMonth(u32),
    #[error("year {0} is outside of the supported calendar range")]
    InvalidYear(i32),
    #[error("at least one crew is required")]
    EmptyCrew,
    #[error("crew capacity must be positive")]
    ZeroCapacity,
    #[error("cannot parse timestamp `{0}`")]
    InvalidTimestamp(String),
}
