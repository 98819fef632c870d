//! Errors in the library.
use thiserror::Error;

/// Errors raised by the core types of the library.
#[derive(Error, Debug)]
pub enum ArenaError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// A vector did not have the length the run was configured with.
    #[error("Dimension mismatch for {name}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// What was being checked.
        name: &'static str,
        /// Configured length.
        expected: usize,
        /// Observed length.
        actual: usize,
    },

    /// A checkpoint document violated an invariant of the stored state.
    #[error("Invalid checkpoint: {0}")]
    InvalidCheckpoint(String),

    /// A configuration value was out of its valid range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
