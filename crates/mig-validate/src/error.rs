//! Error types for validation jobs.

use mig_model::JobStateError;
use thiserror::Error;

/// Errors that prevent a validation job from running.
///
/// Records that fail a rule are not errors at this level; they become
/// [`mig_model::ValidationError`] rows on the job.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("field {field}: rule {rule}: invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        field: String,
        rule: u64,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("field {field}: rule {rule}: minimum {min} exceeds maximum {max}")]
    InvalidRange {
        field: String,
        rule: u64,
        min: f64,
        max: f64,
    },

    #[error("field {field}: rule {rule}: unknown reference set {reference:?}")]
    MissingReference {
        field: String,
        rule: u64,
        reference: String,
    },

    #[error("field {field}: rule {rule}: unknown predicate {function:?}")]
    UnknownPredicate {
        field: String,
        rule: u64,
        function: String,
    },

    #[error("job {job} is bound to entity mapping {expected}, got {actual}")]
    MappingMismatch { job: u64, expected: u64, actual: u64 },

    #[error(transparent)]
    JobState(#[from] JobStateError),
}

pub type Result<T> = std::result::Result<T, ValidateError>;
