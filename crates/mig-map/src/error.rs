//! Error types for mapping operations.

use thiserror::Error;

/// Errors from mapping operations.
///
/// All of these are configuration or call-contract errors. An entity or field
/// that finds no counterpart is not an error; it is simply left unmapped.
#[derive(Debug, Error)]
pub enum MappingError {
    /// A pattern rule carries a regex that does not compile.
    #[error("mapping rule {rule}: invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        rule: u64,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    /// A custom rule names a predicate that was never registered.
    #[error("mapping rule {rule}: unknown custom predicate {function:?}")]
    UnknownFunction { rule: u64, function: String },
    /// A custom rule declares a confidence outside [0, 1].
    #[error("mapping rule {rule}: confidence {confidence} outside [0, 1]")]
    InvalidConfidence { rule: u64, confidence: f64 },
    /// The entities passed to the field matcher are not the ones the mapping links.
    #[error("entity mapping {mapping} links entities {expected_source}->{expected_target}, got {source_entity}->{target_entity}")]
    EntityMismatch {
        mapping: u64,
        expected_source: u64,
        expected_target: u64,
        source_entity: u64,
        target_entity: u64,
    },
}

pub type Result<T> = std::result::Result<T, MappingError>;
