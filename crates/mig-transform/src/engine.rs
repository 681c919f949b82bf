//! Job-driven transformation of source records into target records.

use mig_model::{
    EntityMapping, JobCounters, Record, TransformationError, TransformationJob,
};
use tracing::{debug, info, info_span, warn};

use crate::chain::FieldChain;
use crate::error::{Result, TransformError};
use crate::functions::FunctionRegistry;

/// Applies the transformation chains of an entity mapping to records.
#[derive(Debug, Clone, Default)]
pub struct TransformationEngine {
    functions: FunctionRegistry,
}

impl TransformationEngine {
    /// An engine with the built-in functions.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_functions(functions: FunctionRegistry) -> Self {
        Self { functions }
    }

    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    /// Start `job` and compile every chain of `mapping`.
    ///
    /// A job that is not pending is left alone and reported as
    /// [`TransformError::JobState`]. A wrong mapping or a malformed rule marks
    /// the job failed before any record is processed.
    pub fn begin<'j>(
        &self,
        job: &'j mut TransformationJob,
        mapping: &EntityMapping,
    ) -> Result<TransformationRun<'j>> {
        job.start()?;

        let compiled = if job.entity_mapping_id == mapping.id {
            let outputs = mapping.output_mappings();
            for shadowed in mapping
                .field_mappings
                .iter()
                .filter(|field| !outputs.iter().any(|kept| std::ptr::eq(*kept, *field)))
            {
                warn!(
                    job = %job.id,
                    source = %shadowed.source_field,
                    target = %shadowed.target_field,
                    confidence = shadowed.confidence,
                    "field mapping shadowed by a stronger mapping to the same target"
                );
            }
            outputs
                .into_iter()
                .map(|field| FieldChain::compile(field, &self.functions))
                .collect::<Result<Vec<_>>>()
        } else {
            Err(TransformError::MappingMismatch {
                job: job.id.get(),
                expected: job.entity_mapping_id.get(),
                actual: mapping.id.get(),
            })
        };

        match compiled {
            Ok(chains) => {
                info!(
                    job = %job.id,
                    mapping = %mapping.id,
                    fields = chains.len(),
                    steps = chains.iter().map(FieldChain::len).sum::<usize>(),
                    "transformation job started"
                );
                Ok(TransformationRun {
                    job,
                    chains,
                    counters: JobCounters::default(),
                    errors: Vec::new(),
                })
            }
            Err(error) => {
                warn!(job = %job.id, %error, "transformation job cannot run");
                job.fail(error.to_string(), JobCounters::default(), Vec::new())?;
                Err(error)
            }
        }
    }

    /// Transform every record and complete the job.
    ///
    /// Records that fail are counted and reported on the job, not returned.
    pub fn run<'r>(
        &self,
        job: &mut TransformationJob,
        mapping: &EntityMapping,
        records: impl IntoIterator<Item = &'r Record>,
    ) -> Result<Vec<Record>> {
        let span = info_span!("transform", job = %job.id, mapping = %mapping.id);
        let _guard = span.enter();

        let mut run = self.begin(job, mapping)?;
        let output: Vec<Record> = records
            .into_iter()
            .filter_map(|record| run.process(record))
            .collect();
        run.finish()?;
        Ok(output)
    }
}

/// An in-progress transformation job.
///
/// Counters and error rows accumulate here and are written to the job once,
/// by [`Self::finish`] or [`Self::abort`]. Dropping a run without either
/// leaves the job in progress.
pub struct TransformationRun<'j> {
    job: &'j mut TransformationJob,
    chains: Vec<FieldChain>,
    counters: JobCounters,
    errors: Vec<TransformationError>,
}

impl TransformationRun<'_> {
    /// Transform one record, keyed by target field names.
    ///
    /// Returns `None` when the record failed; the failure is recorded.
    pub fn process(&mut self, record: &Record) -> Option<Record> {
        let mut output = Record::new(record.id.clone());
        for chain in &self.chains {
            match chain.apply(record) {
                Ok(value) => output.insert(chain.target_field(), value),
                Err(message) => {
                    warn!(
                        record = %record.id,
                        field = chain.source_field(),
                        "record failed transformation"
                    );
                    self.counters.record_failure();
                    self.errors.push(TransformationError {
                        job_id: self.job.id,
                        record_id: record.id.clone(),
                        field_name: Some(chain.source_field().to_string()),
                        message,
                    });
                    return None;
                }
            }
        }
        self.counters.record_success();
        Some(output)
    }

    pub fn counters(&self) -> JobCounters {
        self.counters
    }

    pub fn errors(&self) -> &[TransformationError] {
        &self.errors
    }

    /// Complete the job with the accumulated counters.
    pub fn finish(self) -> Result<JobCounters> {
        let counters = self.counters;
        info!(
            job = %self.job.id,
            processed = counters.processed,
            succeeded = counters.succeeded,
            failed = counters.failed,
            "transformation job completed"
        );
        self.job.complete(counters, self.errors)?;
        Ok(counters)
    }

    /// Stop early and mark the job failed with what was accumulated.
    pub fn abort(self, reason: impl Into<String>) -> Result<JobCounters> {
        let reason = reason.into();
        let counters = self.counters;
        debug!(job = %self.job.id, %reason, processed = counters.processed, "transformation job aborted");
        self.job.fail(reason, counters, self.errors)?;
        Ok(counters)
    }
}
