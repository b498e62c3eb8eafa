//! Pure computation core: time-grid validation, record aggregation and
//! period statistics.
//!
//! Nothing in this module performs I/O, logs, or holds process-wide state.
//! The HTTP layer fetches rows, calls in, and serializes whatever comes
//! back. All business violations are returned as typed errors, never
//! panics.

pub mod aggregate;
pub mod cancel;
pub mod error;
pub mod slot;
pub mod stats;
pub mod validate;

pub use aggregate::{aggregate, AggregateOptions, DaySummary, SlotCell};
pub use cancel::CancelToken;
pub use error::{CoreError, ReferenceError, ValidationError};
pub use stats::{compute_statistics, PeriodStatistics};
