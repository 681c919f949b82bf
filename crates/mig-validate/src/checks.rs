//! Compiled validation checks.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use mig_model::{Record, RuleId, Severity, ValidationRule, ValidationRuleKind, Value};
use regex::Regex;

use crate::context::{PredicateFn, ValidationContext};
use crate::error::{Result, ValidateError};

enum Check {
    Required,
    Format {
        pattern: String,
        regex: Regex,
    },
    Range {
        min: Option<f64>,
        max: Option<f64>,
    },
    Unique {
        seen: HashSet<String>,
    },
    Referential {
        name: String,
        values: BTreeSet<String>,
    },
    Custom {
        name: String,
        predicate: Arc<PredicateFn>,
    },
}

/// A validation rule ready to evaluate, holding any per-job state it needs.
pub struct CompiledCheck {
    rule_id: RuleId,
    field: String,
    severity: Severity,
    check: Check,
}

impl CompiledCheck {
    pub fn compile(rule: &ValidationRule, context: &ValidationContext) -> Result<Self> {
        let rule_id = rule.id.get();
        let field = &rule.field_name;
        let check = match &rule.kind {
            ValidationRuleKind::Required => Check::Required,
            ValidationRuleKind::Format { pattern } => Check::Format {
                pattern: pattern.clone(),
                regex: Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
                    ValidateError::InvalidPattern {
                        field: field.clone(),
                        rule: rule_id,
                        pattern: pattern.clone(),
                        source,
                    }
                })?,
            },
            ValidationRuleKind::Range { min, max } => {
                if let (Some(min), Some(max)) = (min, max)
                    && min > max
                {
                    return Err(ValidateError::InvalidRange {
                        field: field.clone(),
                        rule: rule_id,
                        min: *min,
                        max: *max,
                    });
                }
                Check::Range {
                    min: *min,
                    max: *max,
                }
            }
            ValidationRuleKind::Unique => Check::Unique {
                seen: HashSet::new(),
            },
            ValidationRuleKind::Referential { reference } => Check::Referential {
                name: reference.clone(),
                values: context
                    .reference(reference)
                    .cloned()
                    .ok_or_else(|| ValidateError::MissingReference {
                        field: field.clone(),
                        rule: rule_id,
                        reference: reference.clone(),
                    })?,
            },
            ValidationRuleKind::Custom { function } => Check::Custom {
                name: function.clone(),
                predicate: context.predicate(function).ok_or_else(|| {
                    ValidateError::UnknownPredicate {
                        field: field.clone(),
                        rule: rule_id,
                        function: function.clone(),
                    }
                })?,
            },
        };
        Ok(Self {
            rule_id: rule.id,
            field: field.clone(),
            severity: if rule.is_critical {
                Severity::Critical
            } else {
                Severity::Error
            },
            check,
        })
    }

    pub fn rule_id(&self) -> RuleId {
        self.rule_id
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Evaluate against one record. `Err` carries the failure message.
    ///
    /// Null passes every check except `required`.
    pub fn evaluate(&mut self, record: &Record) -> std::result::Result<(), String> {
        let field = self.field.as_str();
        let value = record.get(field);
        if let Check::Required = self.check {
            return if value.is_blank() {
                Err(format!("{field} is required"))
            } else {
                Ok(())
            };
        }
        let Some(text) = value.to_text() else {
            return Ok(());
        };

        match &mut self.check {
            Check::Required => Ok(()),
            Check::Format { pattern, regex } => {
                if regex.is_match(&text) {
                    Ok(())
                } else {
                    Err(format!("{field} value {text:?} does not match {pattern:?}"))
                }
            }
            Check::Range { min, max } => {
                let number = value.as_number().map_err(|err| format!("{field}: {err}"))?;
                if let Some(min) = min
                    && number < *min
                {
                    return Err(format!("{field} value {number} is below minimum {min}"));
                }
                if let Some(max) = max
                    && number > *max
                {
                    return Err(format!("{field} value {number} is above maximum {max}"));
                }
                Ok(())
            }
            Check::Unique { seen } => {
                if seen.insert(text.clone()) {
                    Ok(())
                } else {
                    Err(format!("{field} value {text:?} is not unique"))
                }
            }
            Check::Referential { name, values } => {
                if values.contains(&text) {
                    Ok(())
                } else {
                    Err(format!("{field} value {text:?} not found in {name}"))
                }
            }
            Check::Custom { name, predicate } => match predicate(value, record) {
                Ok(true) => Ok(()),
                Ok(false) => Err(format!("{field} failed check {name}")),
                Err(message) => Err(format!("{field}: check {name} failed: {message}")),
            },
        }
    }
}
