use std::collections::BTreeMap;
use std::path::PathBuf;

use mig_map::{ConfidenceLevel, ConfidenceStats, UnmappedEntity};
use mig_model::{EntityMapping, JobStatus, TransformationJob, ValidationJob};
use mig_validate::ValidationReport;
use serde::Serialize;

/// Result of the matching stages.
#[derive(Debug, Serialize)]
pub struct MatchOutcome {
    pub similarity: &'static str,
    pub mappings: Vec<EntityMapping>,
    pub unmapped: Vec<UnmappedEntity>,
    pub stats: Option<ConfidenceStats>,
    /// Entity mappings per confidence level.
    pub levels: BTreeMap<ConfidenceLevel, usize>,
}

/// Everything that happened to one entity mapping during a run.
#[derive(Debug, Serialize)]
pub struct MappingOutcome {
    pub mapping: EntityMapping,
    /// Dataset the source records came from; `None` when there was none.
    pub dataset: Option<PathBuf>,
    pub records_loaded: usize,
    pub transformation: Option<TransformationJob>,
    pub validation: Option<ValidationJob>,
    pub validation_report: Option<ValidationReport>,
    pub output: Option<PathBuf>,
}

impl MappingOutcome {
    pub fn skipped(mapping: EntityMapping) -> Self {
        Self {
            mapping,
            dataset: None,
            records_loaded: 0,
            transformation: None,
            validation: None,
            validation_report: None,
            output: None,
        }
    }

    /// A job failed or any record was rejected.
    pub fn has_failures(&self) -> bool {
        let transformation_failed = self
            .transformation
            .as_ref()
            .is_some_and(|job| job.status() == JobStatus::Failed || job.records_failed() > 0);
        let validation_failed = self
            .validation_report
            .as_ref()
            .is_some_and(|report| !report.all_passed);
        transformation_failed || validation_failed
    }
}

#[derive(Debug, Serialize)]
pub struct RunResult {
    pub mappings: Vec<MappingOutcome>,
    pub unmapped: Vec<UnmappedEntity>,
    pub errors: Vec<String>,
    pub report: Option<PathBuf>,
}

impl RunResult {
    pub fn has_failures(&self) -> bool {
        !self.errors.is_empty() || self.mappings.iter().any(MappingOutcome::has_failures)
    }
}
