//! Data model for the schema correspondence and transformation pipeline.
//!
//! - **catalog**: entities and fields produced by schema extraction
//! - **mapping**: entity and field correspondences
//! - **rules**: mapping, transformation and validation rule definitions
//! - **job**: transformation/validation jobs, counters and error rows
//! - **value**: scalar values and dataset records

#![deny(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod ids;
pub mod job;
pub mod mapping;
pub mod rules;
pub mod value;

pub use catalog::{Entity, Field, SchemaCatalog};
pub use error::{JobStateError, ModelError, Result};
pub use ids::{EntityId, EntityMappingId, FieldId, JobId, RecordId, RuleId};
pub use job::{
    Job, JobCounters, JobStatus, Severity, TransformationError, TransformationJob,
    ValidationError, ValidationJob,
};
pub use mapping::{EntityMapping, FieldMapping, MatchOrigin};
pub use rules::{
    CUSTOM_DEFAULT_CONFIDENCE, EXACT_MATCH_CONFIDENCE, MappingRule, MappingRuleKind,
    PATTERN_CONFIDENCE, SYNONYM_CONFIDENCE, TransformationKind, TransformationRule,
    ValidationRule, ValidationRuleKind,
};
pub use value::{Record, Value, parse_numeric};
