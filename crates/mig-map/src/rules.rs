//! Compiled mapping rules for the rule phase of field matching.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use mig_model::{Field, MappingRule, MappingRuleKind, MatchOrigin};
use regex::{Regex, RegexBuilder};

use crate::error::{MappingError, Result};
use crate::utils::fold_name;

/// Predicate deciding whether a source field corresponds to a target field.
pub type MatchFn = dyn Fn(&Field, &Field) -> bool + Send + Sync;

/// Registry of named predicates available to `custom` mapping rules.
#[derive(Clone, Default)]
pub struct MatchFunctions {
    functions: BTreeMap<String, Arc<MatchFn>>,
}

impl MatchFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        function: impl Fn(&Field, &Field) -> bool + Send + Sync + 'static,
    ) -> &mut Self {
        self.functions.insert(name.into(), Arc::new(function));
        self
    }

    fn get(&self, name: &str) -> Option<Arc<MatchFn>> {
        self.functions.get(name).cloned()
    }
}

impl fmt::Debug for MatchFunctions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.functions.keys()).finish()
    }
}

enum Predicate {
    ExactMatch,
    Synonym { source: String, target: String },
    Pattern { source: Regex, target: Regex },
    Custom(Arc<MatchFn>),
}

/// A rule with its regexes compiled and custom predicate resolved.
pub struct CompiledRule {
    rule: MappingRule,
    predicate: Predicate,
}

impl CompiledRule {
    fn compile(rule: MappingRule, functions: &MatchFunctions) -> Result<Self> {
        let id = rule.id.get();
        let predicate = match &rule.kind {
            MappingRuleKind::ExactMatch => Predicate::ExactMatch,
            MappingRuleKind::Synonym {
                source_pattern,
                target_pattern,
            } => Predicate::Synonym {
                source: fold_name(source_pattern),
                target: fold_name(target_pattern),
            },
            MappingRuleKind::Pattern {
                source_pattern,
                target_pattern,
            } => Predicate::Pattern {
                source: anchored_regex(id, source_pattern)?,
                target: anchored_regex(id, target_pattern)?,
            },
            MappingRuleKind::Custom {
                function,
                confidence,
            } => {
                if !(0.0..=1.0).contains(confidence) {
                    return Err(MappingError::InvalidConfidence {
                        rule: id,
                        confidence: *confidence,
                    });
                }
                let resolved =
                    functions
                        .get(function)
                        .ok_or_else(|| MappingError::UnknownFunction {
                            rule: id,
                            function: function.clone(),
                        })?;
                Predicate::Custom(resolved)
            }
        };
        Ok(Self { rule, predicate })
    }

    pub fn rule(&self) -> &MappingRule {
        &self.rule
    }

    pub fn confidence(&self) -> f64 {
        self.rule.kind.confidence()
    }

    pub fn origin(&self) -> MatchOrigin {
        match self.predicate {
            Predicate::ExactMatch => MatchOrigin::ExactMatch,
            Predicate::Synonym { .. } => MatchOrigin::Synonym,
            Predicate::Pattern { .. } => MatchOrigin::Pattern,
            Predicate::Custom(_) => MatchOrigin::Custom,
        }
    }

    /// First candidate target satisfying this rule for `source`, in candidate order.
    pub fn find_target<'a>(
        &self,
        source: &Field,
        mut candidates: impl Iterator<Item = &'a Field>,
    ) -> Option<&'a Field> {
        match &self.predicate {
            Predicate::ExactMatch => {
                let source_name = fold_name(&source.name);
                candidates.find(|target| fold_name(&target.name) == source_name)
            }
            Predicate::Synonym {
                source: source_name,
                target: target_name,
            } => {
                if fold_name(&source.name) != *source_name {
                    return None;
                }
                candidates.find(|target| fold_name(&target.name) == *target_name)
            }
            Predicate::Pattern {
                source: source_re,
                target: target_re,
            } => {
                if !source_re.is_match(&source.name) {
                    return None;
                }
                candidates.find(|target| target_re.is_match(&target.name))
            }
            Predicate::Custom(function) => candidates.find(|target| function(source, target)),
        }
    }
}

/// Case-insensitive regex that must match at the start of the input.
fn anchored_regex(rule: u64, pattern: &str) -> Result<Regex> {
    RegexBuilder::new(&format!("^(?:{pattern})"))
        .case_insensitive(true)
        .build()
        .map_err(|source| MappingError::InvalidPattern {
            rule,
            pattern: pattern.to_string(),
            source,
        })
}

/// Immutable rule list, sorted once by descending priority.
///
/// Equal priorities keep their declaration order.
#[derive(Default)]
pub struct MappingRuleSet {
    rules: Vec<CompiledRule>,
}

impl MappingRuleSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile rules without custom predicates.
    pub fn new(rules: Vec<MappingRule>) -> Result<Self> {
        Self::compile(rules, &MatchFunctions::default())
    }

    /// Compile rules, resolving `custom` rules against `functions`.
    pub fn compile(mut rules: Vec<MappingRule>, functions: &MatchFunctions) -> Result<Self> {
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        let rules = rules
            .into_iter()
            .map(|rule| CompiledRule::compile(rule, functions))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Debug for MappingRuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|compiled| &compiled.rule))
            .finish()
    }
}
