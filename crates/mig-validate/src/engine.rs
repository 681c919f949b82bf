//! Job-driven validation of target records.

use std::collections::BTreeMap;

use mig_model::{
    EntityMapping, JobCounters, JobId, JobStatus, Record, Severity, ValidationError,
    ValidationJob,
};
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::checks::CompiledCheck;
use crate::context::ValidationContext;
use crate::error::{Result, ValidateError};

/// Evaluates the validation rules bound to an entity mapping.
#[derive(Debug, Clone, Default)]
pub struct ValidationEngine {
    context: ValidationContext,
}

impl ValidationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(context: ValidationContext) -> Self {
        Self { context }
    }

    pub fn context_mut(&mut self) -> &mut ValidationContext {
        &mut self.context
    }

    /// Start `job` and compile every rule bound to `mapping`.
    ///
    /// A job that is not pending is left alone. A wrong mapping, a malformed
    /// regex, a missing reference set or an unknown predicate marks the job
    /// failed before any record is evaluated.
    pub fn begin<'j>(
        &self,
        job: &'j mut ValidationJob,
        mapping: &EntityMapping,
    ) -> Result<ValidationRun<'j>> {
        job.start()?;

        let compiled = if job.entity_mapping_id == mapping.id {
            mapping
                .validation_rules
                .iter()
                .map(|rule| CompiledCheck::compile(rule, &self.context))
                .collect::<Result<Vec<_>>>()
        } else {
            Err(ValidateError::MappingMismatch {
                job: job.id.get(),
                expected: job.entity_mapping_id.get(),
                actual: mapping.id.get(),
            })
        };

        match compiled {
            Ok(checks) => {
                info!(
                    job = %job.id,
                    mapping = %mapping.id,
                    rules = checks.len(),
                    "validation job started"
                );
                Ok(ValidationRun {
                    job,
                    checks,
                    counters: JobCounters::default(),
                    errors: Vec::new(),
                })
            }
            Err(error) => {
                warn!(job = %job.id, %error, "validation job cannot run");
                job.fail(error.to_string(), JobCounters::default(), Vec::new())?;
                Err(error)
            }
        }
    }

    /// Validate every record and complete the job. `true` iff no record failed.
    pub fn run<'r>(
        &self,
        job: &mut ValidationJob,
        mapping: &EntityMapping,
        records: impl IntoIterator<Item = &'r Record>,
    ) -> Result<bool> {
        let span = info_span!("validate", job = %job.id, mapping = %mapping.id);
        let _guard = span.enter();

        let mut run = self.begin(job, mapping)?;
        for record in records {
            run.process(record);
        }
        Ok(run.finish()?.all_passed)
    }
}

/// An in-progress validation job.
pub struct ValidationRun<'j> {
    job: &'j mut ValidationJob,
    checks: Vec<CompiledCheck>,
    counters: JobCounters,
    errors: Vec<ValidationError>,
}

impl ValidationRun<'_> {
    /// Evaluate every rule against `record`. Returns whether it passed.
    ///
    /// Each failing rule adds one error row; the record is counted once.
    pub fn process(&mut self, record: &Record) -> bool {
        let mut failures = 0usize;
        for check in &mut self.checks {
            if let Err(message) = check.evaluate(record) {
                failures += 1;
                self.errors.push(ValidationError {
                    job_id: self.job.id,
                    record_id: record.id.clone(),
                    rule_id: check.rule_id(),
                    field_name: check.field().to_string(),
                    message,
                    severity: check.severity(),
                });
            }
        }
        if failures == 0 {
            self.counters.record_success();
            true
        } else {
            debug!(record = %record.id, failures, "record failed validation");
            self.counters.record_failure();
            false
        }
    }

    pub fn counters(&self) -> JobCounters {
        self.counters
    }

    /// Complete the job and summarise it.
    pub fn finish(self) -> Result<ValidationReport> {
        self.job.complete(self.counters, self.errors)?;
        let report = ValidationReport::from_job(self.job);
        info!(
            job = %report.job_id,
            processed = report.records_processed,
            passed = report.records_passed,
            failed = report.records_failed,
            "validation job completed"
        );
        Ok(report)
    }

    /// Stop early and mark the job failed with what was accumulated.
    pub fn abort(self, reason: impl Into<String>) -> Result<ValidationReport> {
        self.job.fail(reason, self.counters, self.errors)?;
        Ok(ValidationReport::from_job(self.job))
    }
}

/// Summary of a finished validation job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub job_id: JobId,
    pub status: JobStatus,
    pub records_processed: u64,
    pub records_passed: u64,
    pub records_failed: u64,
    /// Error rows per severity.
    pub by_severity: BTreeMap<Severity, usize>,
    pub all_passed: bool,
}

impl ValidationReport {
    pub fn from_job(job: &ValidationJob) -> Self {
        let mut by_severity = BTreeMap::new();
        for error in job.errors() {
            *by_severity.entry(error.severity).or_insert(0) += 1;
        }
        Self {
            job_id: job.id,
            status: job.status(),
            records_processed: job.records_processed(),
            records_passed: job.records_passed(),
            records_failed: job.records_failed(),
            by_severity,
            all_passed: job.status() == JobStatus::Completed && job.records_failed() == 0,
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.by_severity.get(&severity).copied().unwrap_or(0)
    }
}
