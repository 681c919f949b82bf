use thiserror::Error;

use crate::job::JobStatus;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid record id: {0:?}")]
    InvalidRecordId(String),
    #[error("field {field} not found in entity {entity}")]
    FieldNotFound { entity: String, field: String },
    #[error("no field mapping for source field {0}")]
    FieldMappingNotFound(String),
    #[error(transparent)]
    JobState(#[from] JobStateError),
}

/// Illegal job lifecycle transition.
///
/// Jobs only move Pending -> InProgress -> {Completed, Failed}, once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("job {job}: cannot move from {from} to {to}")]
pub struct JobStateError {
    pub job: u64,
    pub from: JobStatus,
    pub to: JobStatus,
}

pub type Result<T> = std::result::Result<T, ModelError>;
