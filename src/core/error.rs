use thiserror::Error;

/// Business-rule violations detected before a record or range reaches the
/// repository or the aggregator.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("record date is missing or invalid")]
    InvalidDate,

    #[error("time slot must fall exactly on a half-hour boundary")]
    InvalidTimeSlot,

    #[error("sleep state reference is missing or invalid")]
    InvalidSleepState,

    #[error("record type must be one of STATE, EVENT, MEAL")]
    InvalidRecordType,

    #[error("range start must not be after range end")]
    InvertedRange,

    #[error("range exceeds the allowed length")]
    RangeTooLong,
}

/// A record points at master data that does not exist.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("unknown sleep state id {0}")]
    UnknownState(i64),

    #[error("unknown meal type id {0}")]
    UnknownMealType(i64),
}

/// Everything the core can report back to the caller.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error("computation cancelled before completion")]
    Cancelled,
}
