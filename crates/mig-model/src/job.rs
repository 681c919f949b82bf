//! Job records for transformation and validation runs.
//!
//! A job is one execution attempt over one dataset for one entity mapping.
//! Counters are accumulated in memory by the engines and written to the job
//! once, when it completes or fails.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EntityMappingId, JobId, JobStateError, RecordId, RuleId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        })
    }
}

/// Validation error ranking, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        })
    }
}

/// Running record counters.
///
/// For validation jobs `succeeded` counts passed records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounters {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl JobCounters {
    pub fn record_success(&mut self) {
        self.processed += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self) {
        self.processed += 1;
        self.failed += 1;
    }

    /// Sum counters of independently processed partitions.
    pub fn merge(&mut self, other: JobCounters) {
        self.processed += other.processed;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}

/// Error row of a transformation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationError {
    pub job_id: JobId,
    pub record_id: RecordId,
    pub field_name: Option<String>,
    pub message: String,
}

/// Error row of a validation job; one per failing rule per record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub job_id: JobId,
    pub record_id: RecordId,
    pub rule_id: RuleId,
    pub field_name: String,
    pub message: String,
    pub severity: Severity,
}

/// One execution attempt bound to an entity mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job<E> {
    pub id: JobId,
    pub entity_mapping_id: EntityMappingId,
    status: JobStatus,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    counters: JobCounters,
    failure_reason: Option<String>,
    errors: Vec<E>,
}

pub type TransformationJob = Job<TransformationError>;
pub type ValidationJob = Job<ValidationError>;

impl<E> Job<E> {
    /// A fresh job in `PENDING` state.
    pub fn new(id: JobId, entity_mapping_id: EntityMappingId) -> Self {
        Self {
            id,
            entity_mapping_id,
            status: JobStatus::Pending,
            started_at: None,
            completed_at: None,
            counters: JobCounters::default(),
            failure_reason: None,
            errors: Vec::new(),
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn counters(&self) -> JobCounters {
        self.counters
    }

    pub fn records_processed(&self) -> u64 {
        self.counters.processed
    }

    pub fn records_failed(&self) -> u64 {
        self.counters.failed
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn errors(&self) -> &[E] {
        &self.errors
    }

    /// `PENDING -> IN_PROGRESS`.
    pub fn start(&mut self) -> Result<(), JobStateError> {
        self.transition(JobStatus::InProgress)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// `IN_PROGRESS -> COMPLETED`, persisting the accumulated counters and error rows.
    pub fn complete(&mut self, counters: JobCounters, errors: Vec<E>) -> Result<(), JobStateError> {
        self.transition(JobStatus::Completed)?;
        self.finish(counters, errors);
        Ok(())
    }

    /// `IN_PROGRESS -> FAILED` with whatever was accumulated so far.
    pub fn fail(
        &mut self,
        reason: impl Into<String>,
        counters: JobCounters,
        errors: Vec<E>,
    ) -> Result<(), JobStateError> {
        self.transition(JobStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        self.finish(counters, errors);
        Ok(())
    }

    fn finish(&mut self, counters: JobCounters, errors: Vec<E>) {
        self.counters = counters;
        self.errors = errors;
        self.completed_at = Some(Utc::now());
    }

    fn transition(&mut self, to: JobStatus) -> Result<(), JobStateError> {
        let allowed = matches!(
            (self.status, to),
            (JobStatus::Pending, JobStatus::InProgress)
                | (JobStatus::InProgress, JobStatus::Completed)
                | (JobStatus::InProgress, JobStatus::Failed)
        );
        if !allowed {
            return Err(JobStateError {
                job: self.id.get(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

impl Job<TransformationError> {
    pub fn records_succeeded(&self) -> u64 {
        self.counters.succeeded
    }
}

impl Job<ValidationError> {
    pub fn records_passed(&self) -> u64 {
        self.counters.succeeded
    }
}
