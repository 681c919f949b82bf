//! Reference orchestrator: runs the matching, transformation and validation
//! stages in order and keeps the job records.
//!
//! Stages:
//! 1. entity matching over the two catalogs
//! 2. field matching for each entity mapping (rule phase, then similarity)
//! 3. binding configured transformation chains and validation rules
//! 4. per mapping: load the source dataset, transform, validate, write

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use mig_map::{EntityMatcher, FieldMatcher, MappingRuleSet, MatchFunctions};
use mig_model::{
    EntityMapping, JobId, Record, SchemaCatalog, TransformationJob, ValidationJob,
};
use mig_transform::{FunctionRegistry, TransformationEngine};
use mig_validate::{ValidationContext, ValidationEngine, ValidationReport};
use tracing::{debug, error, info, info_span, warn};

use crate::config::MigrationConfig;
use crate::dataset::{CsvOptions, find_dataset, read_records, write_records};
use crate::logging::redact_value;
use crate::types::{MappingOutcome, MatchOutcome, RunResult};

/// Header of the identifier column when no id column is configured.
pub const DEFAULT_ID_HEADER: &str = "record_id";

/// File name of the JSON run report inside the output directory.
pub const REPORT_FILE: &str = "report.json";

pub fn load_catalog(path: &Path) -> Result<SchemaCatalog> {
    let file = File::open(path).with_context(|| format!("open catalog: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parse catalog: {}", path.display()))
}

/// Load the config at `path`, or the defaults when there is none.
pub fn load_config(path: Option<&Path>) -> Result<MigrationConfig> {
    match path {
        Some(path) => MigrationConfig::load(path),
        None => Ok(MigrationConfig::default()),
    }
}

pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("write {}", path.display()))
}

/// Jobs produced for one mapping over one batch of records.
#[derive(Debug)]
pub struct MigratedBatch {
    pub transformation: TransformationJob,
    /// Target records; `None` when the transformation job could not run.
    pub records: Option<Vec<Record>>,
    pub validation: Option<ValidationJob>,
}

pub struct Orchestrator {
    config: MigrationConfig,
    match_functions: MatchFunctions,
    transformer: TransformationEngine,
    validator: ValidationEngine,
    next_job_id: u64,
}

impl Orchestrator {
    /// Orchestrator with the built-in transformation functions and the
    /// config's reference sets.
    pub fn new(config: MigrationConfig) -> Self {
        let mut context = ValidationContext::new();
        for set in &config.references {
            context.add_reference(set.name.clone(), set.values.iter().cloned());
        }
        Self {
            config,
            match_functions: MatchFunctions::new(),
            transformer: TransformationEngine::new(),
            validator: ValidationEngine::with_context(context),
            next_job_id: 1,
        }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Predicates for `custom` mapping rules.
    pub fn match_functions_mut(&mut self) -> &mut MatchFunctions {
        &mut self.match_functions
    }

    /// Functions for `custom_function` transformation steps.
    pub fn transform_functions_mut(&mut self) -> &mut FunctionRegistry {
        self.transformer.functions_mut()
    }

    /// Reference sets and predicates for validation rules.
    pub fn validation_context_mut(&mut self) -> &mut ValidationContext {
        self.validator.context_mut()
    }

    /// Match entities and fields, then bind the configured rules.
    pub fn discover(&self, source: &SchemaCatalog, target: &SchemaCatalog) -> Result<MatchOutcome> {
        let span = info_span!(
            "discover",
            source = %source.data_source,
            target = %target.data_source
        );
        let _guard = span.enter();
        let started = Instant::now();

        let matching = &self.config.matching;
        let rules = MappingRuleSet::compile(self.config.mapping_rules.clone(), &self.match_functions)
            .context("compile mapping rules")?;

        let report = EntityMatcher::with_similarity(matching.similarity.build())
            .with_threshold(matching.entity_threshold)
            .report(&source.entities, &target.entities);
        let stats = report.stats();
        let levels = report.count_by_level();
        let field_matcher = FieldMatcher::with_similarity(matching.similarity.build())
            .with_threshold(matching.field_threshold);

        let mut mappings = report.mappings;
        for mapping in &mut mappings {
            let source_entity = source
                .entity(mapping.source_entity_id)
                .with_context(|| format!("source entity {} not in catalog", mapping.source_entity))?;
            let target_entity = target
                .entity(mapping.target_entity_id)
                .with_context(|| format!("target entity {} not in catalog", mapping.target_entity))?;
            mapping.field_mappings = field_matcher
                .match_fields(mapping, source_entity, target_entity, &rules)
                .with_context(|| {
                    format!(
                        "match fields of {} -> {}",
                        mapping.source_entity, mapping.target_entity
                    )
                })?;
            self.bind_rules(mapping);
        }

        info!(
            mappings = mappings.len(),
            unmapped = report.unmapped.len(),
            similarity = matching.similarity.display_name(),
            duration_ms = started.elapsed().as_millis(),
            "discovery complete"
        );
        Ok(MatchOutcome {
            similarity: matching.similarity.display_name(),
            mappings,
            unmapped: report.unmapped,
            stats,
            levels,
        })
    }

    /// Attach configured transformation chains and validation rules to
    /// `mapping`. Chains for source fields that were not mapped are skipped.
    pub fn bind_rules(&self, mapping: &mut EntityMapping) {
        let source_entity = mapping.source_entity.clone();
        for binding in self.config.transformations_for(&source_entity) {
            if let Err(err) =
                mapping.attach_transformations(&binding.source_field, binding.rules.clone())
            {
                warn!(
                    mapping = %mapping.id,
                    field = %binding.source_field,
                    %err,
                    "transformation chain not attached"
                );
            }
        }
        for rule in self.config.validations_for(&source_entity) {
            mapping.bind_validation_rule(rule.clone());
        }
        debug!(
            mapping = %mapping.id,
            chains = mapping
                .field_mappings
                .iter()
                .filter(|m| !m.transformations.is_empty())
                .count(),
            validations = mapping.validation_rules.len(),
            "rules bound"
        );
    }

    fn next_job_id(&mut self) -> JobId {
        let id = JobId::new(self.next_job_id);
        self.next_job_id += 1;
        id
    }

    /// Transform `records` along `mapping`, then validate what came out.
    ///
    /// Configuration errors end up as failed jobs, not as `Err`: the
    /// orchestrator owns the job records and keeps them either way.
    pub fn migrate(&mut self, mapping: &EntityMapping, records: &[Record]) -> MigratedBatch {
        let mut transformation = TransformationJob::new(self.next_job_id(), mapping.id);
        let output = match self.transformer.run(&mut transformation, mapping, records) {
            Ok(output) => output,
            Err(err) => {
                error!(mapping = %mapping.id, %err, "transformation job failed");
                return MigratedBatch {
                    transformation,
                    records: None,
                    validation: None,
                };
            }
        };
        for failure in transformation.errors() {
            debug!(
                record = %failure.record_id,
                field = failure.field_name.as_deref().unwrap_or("-"),
                message = redact_value(&failure.message),
                "record rejected"
            );
        }

        let mut validation = ValidationJob::new(self.next_job_id(), mapping.id);
        if let Err(err) = self.validator.run(&mut validation, mapping, &output) {
            error!(mapping = %mapping.id, %err, "validation job failed");
        }
        MigratedBatch {
            transformation,
            records: Some(output),
            validation: Some(validation),
        }
    }

    /// Run every stage. Datasets are looked up as `<source entity>.csv` in
    /// `data_dir`; outputs and `report.json` go to `output_dir` when given.
    pub fn run(
        &mut self,
        source: &SchemaCatalog,
        target: &SchemaCatalog,
        data_dir: &Path,
        output_dir: Option<&Path>,
    ) -> Result<RunResult> {
        let outcome = self.discover(source, target)?;
        if let Some(dir) = output_dir {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create output directory: {}", dir.display()))?;
        }
        let options = CsvOptions {
            delimiter: self.config.delimiter_byte(),
            id_column: self.config.input.id_column.clone(),
        };
        let mut target_uses: BTreeMap<String, usize> = BTreeMap::new();
        for mapping in &outcome.mappings {
            *target_uses.entry(mapping.target_entity.clone()).or_insert(0) += 1;
        }

        let mut errors = Vec::new();
        let mut outcomes = Vec::with_capacity(outcome.mappings.len());
        for mapping in outcome.mappings {
            let span = info_span!(
                "mapping",
                source = %mapping.source_entity,
                target = %mapping.target_entity
            );
            let _guard = span.enter();

            let path = match find_dataset(data_dir, &mapping.source_entity) {
                Ok(Some(path)) => path,
                Ok(None) => {
                    warn!("no dataset for source entity, skipping");
                    outcomes.push(MappingOutcome::skipped(mapping));
                    continue;
                }
                Err(err) => {
                    error!(data_dir = %data_dir.display(), "dataset lookup failed");
                    errors.push(format!("{err:#}"));
                    outcomes.push(MappingOutcome::skipped(mapping));
                    continue;
                }
            };
            let records = match read_records(&path, &options) {
                Ok(records) => records,
                Err(err) => {
                    error!(path = %path.display(), "dataset unreadable");
                    errors.push(format!("{err:#}"));
                    outcomes.push(MappingOutcome::skipped(mapping));
                    continue;
                }
            };

            let batch = self.migrate(&mapping, &records);
            let output = match (output_dir, &batch.records) {
                (Some(dir), Some(migrated)) => {
                    let shared = target_uses.get(&mapping.target_entity).copied() > Some(1);
                    let path = dir.join(output_file_name(&mapping, shared));
                    let columns: Vec<String> = mapping
                        .output_mappings()
                        .into_iter()
                        .map(|m| m.target_field.clone())
                        .collect();
                    let configured = options.id_column.as_deref().unwrap_or(DEFAULT_ID_HEADER);
                    let id_column = id_header(configured, &columns);
                    match write_records(&path, id_column, &columns, migrated, options.delimiter) {
                        Ok(()) => Some(path),
                        Err(err) => {
                            error!(path = %path.display(), "output not written");
                            errors.push(format!("{err:#}"));
                            None
                        }
                    }
                }
                _ => None,
            };
            outcomes.push(MappingOutcome {
                validation_report: batch.validation.as_ref().map(ValidationReport::from_job),
                records_loaded: records.len(),
                dataset: Some(path),
                transformation: Some(batch.transformation),
                validation: batch.validation,
                output,
                mapping,
            });
        }

        let mut result = RunResult {
            mappings: outcomes,
            unmapped: outcome.unmapped,
            errors,
            report: None,
        };
        if let Some(dir) = output_dir {
            let path = dir.join(REPORT_FILE);
            result.report = Some(path.clone());
            if let Err(err) = write_json(&path, &result) {
                error!(path = %path.display(), "report not written");
                result.report = None;
                result.errors.push(format!("{err:#}"));
            }
        }
        info!(
            mappings = result.mappings.len(),
            failures = result.has_failures(),
            "run complete"
        );
        Ok(result)
    }
}

/// Header of the record id column, or `None` when a target field already
/// uses that name and the id column is left out.
fn id_header<'a>(configured: &'a str, columns: &[String]) -> Option<&'a str> {
    if columns.iter().any(|column| column == configured) {
        debug!(column = configured, "id column shadowed by a target field");
        None
    } else {
        Some(configured)
    }
}

/// `<target>.csv`, or `<source>_<target>.csv` when several sources feed the same target.
pub fn output_file_name(mapping: &EntityMapping, shared_target: bool) -> PathBuf {
    if shared_target {
        PathBuf::from(format!(
            "{}_{}.csv",
            mapping.source_entity, mapping.target_entity
        ))
    } else {
        PathBuf::from(format!("{}.csv", mapping.target_entity))
    }
}
