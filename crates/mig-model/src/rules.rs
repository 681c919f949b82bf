//! Rule definitions for matching, transformation and validation.
//!
//! Every rule family is a tagged union whose variants carry their own typed
//! parameters. Engines dispatch on them with exhaustive `match`, so adding a
//! variant is a compile error until every engine handles it.

use serde::{Deserialize, Serialize};

use crate::{EntityMappingId, RuleId};

/// Confidence committed by an exact (case-insensitive) name match.
pub const EXACT_MATCH_CONFIDENCE: f64 = 1.0;
/// Confidence committed by a synonym pair.
pub const SYNONYM_CONFIDENCE: f64 = 0.9;
/// Confidence committed by a regex pattern pair.
pub const PATTERN_CONFIDENCE: f64 = 0.8;
/// Default confidence for custom predicates that do not declare one.
pub const CUSTOM_DEFAULT_CONFIDENCE: f64 = 0.7;

fn default_custom_confidence() -> f64 {
    CUSTOM_DEFAULT_CONFIDENCE
}

// ============================================================================
// Mapping rules
// ============================================================================

/// Predicate used by the rule phase of field matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MappingRuleKind {
    /// Source and target field names are equal ignoring case.
    ExactMatch,
    /// Source field named `source_pattern` maps to the target field named `target_pattern`.
    Synonym {
        source_pattern: String,
        target_pattern: String,
    },
    /// Case-insensitive regexes, anchored at the start of the field names.
    Pattern {
        source_pattern: String,
        target_pattern: String,
    },
    /// Named predicate supplied by the caller at match time.
    Custom {
        function: String,
        #[serde(default = "default_custom_confidence")]
        confidence: f64,
    },
}

impl MappingRuleKind {
    /// Fixed confidence committed when this kind of rule matches.
    pub fn confidence(&self) -> f64 {
        match self {
            Self::ExactMatch => EXACT_MATCH_CONFIDENCE,
            Self::Synonym { .. } => SYNONYM_CONFIDENCE,
            Self::Pattern { .. } => PATTERN_CONFIDENCE,
            Self::Custom { confidence, .. } => *confidence,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ExactMatch => "Exact match",
            Self::Synonym { .. } => "Synonym",
            Self::Pattern { .. } => "Pattern",
            Self::Custom { .. } => "Custom",
        }
    }
}

/// A static, priority-ordered matching directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRule {
    #[serde(default)]
    pub id: RuleId,
    #[serde(flatten)]
    pub kind: MappingRuleKind,
    /// Higher priority is evaluated first.
    #[serde(default)]
    pub priority: i32,
}

impl MappingRule {
    pub fn new(id: u64, kind: MappingRuleKind, priority: i32) -> Self {
        Self {
            id: RuleId::new(id),
            kind,
            priority,
        }
    }
}

// ============================================================================
// Transformation rules
// ============================================================================

/// One step of a field's transformation chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformationKind {
    /// Regex substitution over the string form of the value.
    StringReplace {
        pattern: String,
        /// Replacement template: `$1`, `${1}` and `${name}` insert capture
        /// groups, `$$` is a literal dollar sign.
        #[serde(default)]
        replacement: String,
    },
    /// Parse with `source_format`, render with `target_format` (strftime syntax).
    DateFormat {
        source_format: String,
        target_format: String,
    },
    /// Render the value as a number through a `{}`-style template, e.g. `"{:,.2f} EUR"`.
    NumberFormat { template: String },
    /// Join the value with sibling source fields of the same record.
    Concatenate {
        fields: Vec<String>,
        #[serde(default)]
        separator: String,
    },
    /// Token at `index` after splitting on `separator`. Negative indexes count from the end.
    Split {
        separator: String,
        #[serde(default)]
        index: i64,
    },
    /// Named function from the transformation function registry.
    CustomFunction { function: String },
}

impl TransformationKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::StringReplace { .. } => "String replace",
            Self::DateFormat { .. } => "Date format",
            Self::NumberFormat { .. } => "Number format",
            Self::Concatenate { .. } => "Concatenate",
            Self::Split { .. } => "Split",
            Self::CustomFunction { .. } => "Custom function",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationRule {
    #[serde(default)]
    pub id: RuleId,
    /// Execution position within the chain (ascending).
    #[serde(default)]
    pub order: u32,
    #[serde(flatten)]
    pub kind: TransformationKind,
}

impl TransformationRule {
    pub fn new(order: u32, kind: TransformationKind) -> Self {
        Self {
            id: RuleId::default(),
            order,
            kind,
        }
    }
}

// ============================================================================
// Validation rules
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationRuleKind {
    /// Value must be present and not the empty string.
    Required,
    /// String form must fully match the regex.
    Format { pattern: String },
    /// Numeric value within the inclusive bounds.
    Range {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    /// No two records of the same job share the value.
    Unique,
    /// Value must exist in the named reference set.
    Referential { reference: String },
    /// Named predicate from the validation context.
    Custom { function: String },
}

impl ValidationRuleKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Required => "Required",
            Self::Format { .. } => "Format",
            Self::Range { .. } => "Range",
            Self::Unique => "Unique",
            Self::Referential { .. } => "Referential",
            Self::Custom { .. } => "Custom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub id: RuleId,
    #[serde(default)]
    pub entity_mapping_id: EntityMappingId,
    /// Target field the rule inspects.
    pub field_name: String,
    #[serde(flatten)]
    pub kind: ValidationRuleKind,
    /// Escalates failures to [`crate::Severity::Critical`].
    #[serde(default)]
    pub is_critical: bool,
}

impl ValidationRule {
    pub fn new(field_name: impl Into<String>, kind: ValidationRuleKind) -> Self {
        Self {
            id: RuleId::default(),
            entity_mapping_id: EntityMappingId::default(),
            field_name: field_name.into(),
            kind,
            is_critical: false,
        }
    }

    pub fn critical(mut self) -> Self {
        self.is_critical = true;
        self
    }
}
