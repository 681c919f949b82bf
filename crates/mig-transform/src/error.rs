//! Error types for transformation jobs.

use mig_model::JobStateError;
use thiserror::Error;

/// Errors that prevent a transformation job from running.
///
/// Per-record failures are not represented here; they become
/// [`mig_model::TransformationError`] rows on the job.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("field {field}: rule {rule}: invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        field: String,
        rule: u64,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("field {field}: rule {rule}: invalid date format {format:?}")]
    InvalidDateFormat {
        field: String,
        rule: u64,
        format: String,
    },

    #[error("field {field}: rule {rule}: invalid number template {template:?}: {reason}")]
    InvalidTemplate {
        field: String,
        rule: u64,
        template: String,
        reason: String,
    },

    #[error("field {field}: rule {rule}: split separator is empty")]
    EmptySeparator { field: String, rule: u64 },

    #[error("field {field}: rule {rule}: unknown function {function:?}")]
    UnknownFunction {
        field: String,
        rule: u64,
        function: String,
    },

    #[error("job {job} is bound to entity mapping {expected}, got {actual}")]
    MappingMismatch { job: u64, expected: u64, actual: u64 },

    #[error(transparent)]
    JobState(#[from] JobStateError),
}

pub type Result<T> = std::result::Result<T, TransformError>;
