//! Contract violations
//!
//! Raised at the call site when a caller hands the core types a value that
//! breaks one of their invariants. These are never corrected silently.

use thiserror::Error;

/// A caller broke an invariant of the data model or the script builder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("Unexpected loop count: {0} (expected a positive integer)")]
    InvalidLoopCount(String),

    #[error("Repeat count must be at least 1, got {0}")]
    InvalidRepeatCount(usize),

    #[error("Executable '{0}' has an empty command")]
    EmptyCommand(String),

    #[error("Duplicate job name: {0}")]
    DuplicateJob(String),
}
