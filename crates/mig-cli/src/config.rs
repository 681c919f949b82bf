//! TOML migration config.
//!
//! ```toml
//! [matching]
//! entity_threshold = 0.3
//! field_threshold = 0.3
//! similarity = "tfidf"          # or "jaro_winkler"
//!
//! [input]
//! id_column = "id"
//! delimiter = ","
//!
//! [[mapping_rules]]
//! kind = "synonym"
//! source_pattern = "cust_id"
//! target_pattern = "id"
//! priority = 10
//!
//! [[transformations]]
//! source_entity = "Customers"
//! source_field = "email"
//! rules = [{ kind = "custom_function", function = "lowercase" }]
//!
//! [[validations]]
//! source_entity = "Customers"
//! field_name = "email"
//! kind = "required"
//! is_critical = true
//!
//! [[references]]
//! name = "countries"
//! values = ["DE", "FR", "NL"]
//! ```

use std::path::Path;

use anyhow::{Context, Result, bail};
use mig_map::{DEFAULT_MATCH_THRESHOLD, JaroWinklerSimilarity, TextSimilarity, TfIdfSimilarity};
use mig_model::{MappingRule, RuleId, TransformationRule, ValidationRule};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    pub matching: MatchingConfig,
    pub input: InputConfig,
    pub mapping_rules: Vec<MappingRule>,
    pub transformations: Vec<TransformationBinding>,
    pub validations: Vec<ValidationBinding>,
    pub references: Vec<ReferenceSet>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchingConfig {
    pub entity_threshold: f64,
    pub field_threshold: f64,
    pub similarity: SimilarityBackend,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            entity_threshold: DEFAULT_MATCH_THRESHOLD,
            field_threshold: DEFAULT_MATCH_THRESHOLD,
            similarity: SimilarityBackend::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityBackend {
    #[default]
    Tfidf,
    JaroWinkler,
}

impl SimilarityBackend {
    pub fn build(self) -> Box<dyn TextSimilarity> {
        match self {
            Self::Tfidf => Box::new(TfIdfSimilarity),
            Self::JaroWinkler => Box::new(JaroWinklerSimilarity),
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Tfidf => "tf-idf",
            Self::JaroWinkler => "jaro-winkler",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    /// Column holding record identifiers. Rows without one are numbered from 1.
    pub id_column: Option<String>,
    pub delimiter: char,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            id_column: None,
            delimiter: ',',
        }
    }
}

/// Transformation chain for one source field of one source entity.
#[derive(Debug, Clone, Deserialize)]
pub struct TransformationBinding {
    pub source_entity: String,
    pub source_field: String,
    pub rules: Vec<TransformationRule>,
}

/// Validation rule for the target records of one source entity's mapping.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationBinding {
    pub source_entity: String,
    #[serde(flatten)]
    pub rule: ValidationRule,
}

/// Named value set for `referential` validation rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceSet {
    pub name: String,
    pub values: Vec<String>,
}

impl MigrationConfig {
    /// Read and check a config file. Rules without an id get one assigned.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parse config: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        config.check()?;
        config.assign_rule_ids();
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        for (name, threshold) in [
            ("entity_threshold", self.matching.entity_threshold),
            ("field_threshold", self.matching.field_threshold),
        ] {
            if !(0.0..=1.0).contains(&threshold) {
                bail!("matching.{name} must be within [0, 1], got {threshold}");
            }
        }
        if self.input.delimiter == '\n' || !self.input.delimiter.is_ascii() {
            bail!(
                "input.delimiter must be a single ASCII character, got {:?}",
                self.input.delimiter
            );
        }
        for binding in &self.transformations {
            if binding.rules.is_empty() {
                bail!(
                    "transformations for {}.{} has no rules",
                    binding.source_entity,
                    binding.source_field
                );
            }
        }
        Ok(())
    }

    /// Number unset rule ids per rule family, continuing after the highest explicit id.
    fn assign_rule_ids(&mut self) {
        assign_ids(self.mapping_rules.iter_mut().map(|rule| &mut rule.id));
        assign_ids(
            self.transformations
                .iter_mut()
                .flat_map(|binding| binding.rules.iter_mut())
                .map(|rule| &mut rule.id),
        );
        assign_ids(self.validations.iter_mut().map(|binding| &mut binding.rule.id));
    }

    pub fn transformations_for<'a>(
        &'a self,
        source_entity: &'a str,
    ) -> impl Iterator<Item = &'a TransformationBinding> + 'a {
        self.transformations
            .iter()
            .filter(move |b| b.source_entity.eq_ignore_ascii_case(source_entity))
    }

    pub fn validations_for<'a>(
        &'a self,
        source_entity: &'a str,
    ) -> impl Iterator<Item = &'a ValidationRule> + 'a {
        self.validations
            .iter()
            .filter(move |b| b.source_entity.eq_ignore_ascii_case(source_entity))
            .map(|b| &b.rule)
    }

    pub fn delimiter_byte(&self) -> u8 {
        // `check` guarantees an ASCII delimiter.
        u8::try_from(u32::from(self.input.delimiter)).unwrap_or(b',')
    }
}

fn assign_ids<'a>(ids: impl Iterator<Item = &'a mut RuleId>) {
    let ids: Vec<&mut RuleId> = ids.collect();
    let mut next = ids.iter().map(|id| id.get()).max().unwrap_or(0) + 1;
    for id in ids {
        if id.get() == 0 {
            *id = RuleId::new(next);
            next += 1;
        }
    }
}
