//! Error types for `latbin`.

use thiserror::Error;

use crate::InstanceId;

/// Errors surfaced by construction and by malformed inputs.
///
/// Data inconsistencies met while consuming a stream (a label for an instance that was never
/// buffered) are not errors: they are logged and reported through [`crate::Arrival`].
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// An unlabelled instance arrived while another instance with the same identity is pending.
    #[error("instance {0} is already pending")]
    DuplicateInstance(InstanceId),

    /// A record list handed to the bin planner does not start with a first prediction.
    #[error("prediction records must start with a first prediction")]
    MissingFirstPrediction,

    /// A record list handed to the bin planner does not end with a final prediction.
    #[error("prediction records must end with a final prediction")]
    MissingFinalPrediction,

    /// A pending instance was finalized twice.
    #[error("instance {0} was already finalized")]
    AlreadyFinalized(InstanceId),

    /// The evaluator array does not have `bin_count + 2` members.
    #[error("expected {expected} bin evaluators, got {actual}")]
    EvaluatorCount { expected: usize, actual: usize },

    /// A snapshot's measurement names do not match the learning curve header.
    #[error("snapshot columns do not match the learning curve header")]
    ColumnMismatch,

    /// I/O error while writing a report.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error comes from configuration rather than stream data.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::InvalidConfig(_) | Error::EvaluatorCount { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
