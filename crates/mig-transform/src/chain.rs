//! Compiled transformation chains.
//!
//! Chains are compiled once per job: regexes are built, date formats and
//! number templates are checked and custom functions are resolved. Applying
//! a compiled step never fails except when a custom function returns `Err`.

use std::sync::Arc;

use mig_model::{FieldMapping, Record, TransformationKind, TransformationRule, Value};
use regex::Regex;

use crate::datetime;
use crate::error::{Result, TransformError};
use crate::functions::{FunctionRegistry, TransformFn};
use crate::number::NumberTemplate;

enum Step {
    StringReplace {
        pattern: Regex,
        replacement: String,
    },
    DateFormat {
        source_format: String,
        target_format: String,
    },
    NumberFormat(NumberTemplate),
    Concatenate {
        fields: Vec<String>,
        separator: String,
    },
    Split {
        separator: String,
        index: i64,
    },
    CustomFunction {
        name: String,
        function: Arc<TransformFn>,
    },
}

impl Step {
    fn compile(field: &str, rule: &TransformationRule, functions: &FunctionRegistry) -> Result<Self> {
        let rule_id = rule.id.get();
        let step = match &rule.kind {
            TransformationKind::StringReplace {
                pattern,
                replacement,
            } => Step::StringReplace {
                pattern: Regex::new(pattern).map_err(|source| TransformError::InvalidPattern {
                    field: field.to_string(),
                    rule: rule_id,
                    pattern: pattern.clone(),
                    source,
                })?,
                replacement: replacement.clone(),
            },
            TransformationKind::DateFormat {
                source_format,
                target_format,
            } => {
                for format in [source_format, target_format] {
                    if !datetime::is_valid_format(format) {
                        return Err(TransformError::InvalidDateFormat {
                            field: field.to_string(),
                            rule: rule_id,
                            format: format.clone(),
                        });
                    }
                }
                Step::DateFormat {
                    source_format: source_format.clone(),
                    target_format: target_format.clone(),
                }
            }
            TransformationKind::NumberFormat { template } => Step::NumberFormat(
                NumberTemplate::parse(template).map_err(|reason| {
                    TransformError::InvalidTemplate {
                        field: field.to_string(),
                        rule: rule_id,
                        template: template.clone(),
                        reason,
                    }
                })?,
            ),
            TransformationKind::Concatenate { fields, separator } => Step::Concatenate {
                fields: fields.clone(),
                separator: separator.clone(),
            },
            TransformationKind::Split { separator, index } => {
                if separator.is_empty() {
                    return Err(TransformError::EmptySeparator {
                        field: field.to_string(),
                        rule: rule_id,
                    });
                }
                Step::Split {
                    separator: separator.clone(),
                    index: *index,
                }
            }
            TransformationKind::CustomFunction { function } => Step::CustomFunction {
                name: function.clone(),
                function: functions.get(function).ok_or_else(|| {
                    TransformError::UnknownFunction {
                        field: field.to_string(),
                        rule: rule_id,
                        function: function.clone(),
                    }
                })?,
            },
        };
        Ok(step)
    }

    /// One step. Tolerant steps hand back `value` unchanged when they cannot apply.
    fn apply(&self, value: Value, record: &Record) -> std::result::Result<Value, String> {
        let Some(text) = value.to_text() else {
            return Ok(value);
        };
        let out = match self {
            Step::StringReplace {
                pattern,
                replacement,
            } => Value::Text(
                pattern
                    .replace_all(&text, replacement.as_str())
                    .into_owned(),
            ),
            Step::DateFormat {
                source_format,
                target_format,
            } => match datetime::reformat(&text, source_format, target_format) {
                Some(rendered) => Value::Text(rendered),
                None => value,
            },
            Step::NumberFormat(template) => {
                match value.as_number().ok().and_then(|n| template.render(n)) {
                    Some(rendered) => Value::Text(rendered),
                    None => value,
                }
            }
            Step::Concatenate { fields, separator } => {
                let mut parts = vec![text];
                parts.extend(fields.iter().filter_map(|field| record.get(field).to_text()));
                Value::Text(parts.join(separator))
            }
            Step::Split { separator, index } => {
                let tokens: Vec<&str> = text.split(separator.as_str()).collect();
                match resolve_index(*index, tokens.len()) {
                    Some(position) => Value::Text(tokens[position].to_string()),
                    None => value,
                }
            }
            Step::CustomFunction { name, function } => {
                function(&value, record).map_err(|message| format!("{name}: {message}"))?
            }
        };
        Ok(out)
    }
}

fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let position = if index < 0 { len + index } else { index };
    if (0..len).contains(&position) {
        usize::try_from(position).ok()
    } else {
        None
    }
}

/// The compiled chain of one field mapping.
pub struct FieldChain {
    source_field: String,
    target_field: String,
    steps: Vec<Step>,
}

impl FieldChain {
    pub fn compile(mapping: &FieldMapping, functions: &FunctionRegistry) -> Result<Self> {
        let mut rules: Vec<&TransformationRule> = mapping.transformations.iter().collect();
        rules.sort_by_key(|rule| rule.order);
        let steps = rules
            .into_iter()
            .map(|rule| Step::compile(&mapping.source_field, rule, functions))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            source_field: mapping.source_field.clone(),
            target_field: mapping.target_field.clone(),
            steps,
        })
    }

    pub fn source_field(&self) -> &str {
        &self.source_field
    }

    pub fn target_field(&self) -> &str {
        &self.target_field
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run the chain on the source value of `record`.
    ///
    /// A null or missing source value skips every step. A step producing
    /// null ends the chain early.
    pub fn apply(&self, record: &Record) -> std::result::Result<Value, String> {
        let mut value = record.get(&self.source_field).clone();
        for step in &self.steps {
            if value.is_null() {
                break;
            }
            value = step.apply(value, record)?;
        }
        Ok(value)
    }
}
