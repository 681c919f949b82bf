//! Entity and field correspondence discovery.
//!
//! [`EntityMatcher`] pairs source entities with target entities by textual
//! similarity; [`FieldMatcher`] resolves field pairs inside one entity
//! mapping, consulting a priority-ordered [`MappingRuleSet`] before falling
//! back to similarity.

#![deny(unsafe_code)]

pub mod confidence;
pub mod entity;
pub mod error;
pub mod field;
pub mod rules;
pub mod similarity;
mod utils;

pub use confidence::{
    ConfidenceLevel, ConfidenceStats, ConfidenceThresholds, MatchReport, UnmappedEntity,
};
pub use entity::{DEFAULT_MATCH_THRESHOLD, EntityMatcher};
pub use error::{MappingError, Result};
pub use field::{FieldMatcher, render_field_mappings};
pub use rules::{CompiledRule, MappingRuleSet, MatchFn, MatchFunctions};
pub use similarity::{
    JaroWinklerSimilarity, SimilarityMatrix, TextSimilarity, TfIdfSimilarity, tokenize,
};
pub use utils::{entity_descriptor, field_descriptor, normalize_text};
