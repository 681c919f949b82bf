//! Named functions for `custom_function` transformation steps.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use mig_model::{Record, Value};

/// A deterministic value transformation.
///
/// Receives the current value and a read-only view of the source record.
/// An `Err` fails the whole record.
pub type TransformFn = dyn Fn(&Value, &Record) -> Result<Value, String> + Send + Sync;

#[derive(Clone)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, Arc<TransformFn>>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl FunctionRegistry {
    /// A registry with nothing in it.
    pub fn empty() -> Self {
        Self {
            functions: BTreeMap::new(),
        }
    }

    /// `trim`, `uppercase`, `lowercase` and `digits_only`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry
            .register("trim", |value: &Value, _: &Record| {
                Ok(map_text(value, |text| text.trim().to_string()))
            })
            .register("uppercase", |value: &Value, _: &Record| {
                Ok(map_text(value, str::to_uppercase))
            })
            .register("lowercase", |value: &Value, _: &Record| {
                Ok(map_text(value, str::to_lowercase))
            })
            .register("digits_only", |value: &Value, _: &Record| {
                Ok(match value.to_text() {
                    Some(text) => Value::Text(text.chars().filter(char::is_ascii_digit).collect()),
                    None => Value::Null,
                })
            });
        registry
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        function: impl Fn(&Value, &Record) -> Result<Value, String> + Send + Sync + 'static,
    ) -> &mut Self {
        self.functions.insert(name.into(), Arc::new(function));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<TransformFn>> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

fn map_text(value: &Value, f: impl FnOnce(&str) -> String) -> Value {
    match value {
        Value::Text(text) => Value::Text(f(text)),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mig_model::RecordId;

    fn call(registry: &FunctionRegistry, name: &str, value: Value) -> Result<Value, String> {
        let record = Record::new(RecordId::from_row(1));
        let function = registry.get(name).unwrap();
        function(&value, &record)
    }

    #[test]
    fn builtins_transform_text_only() {
        let registry = FunctionRegistry::with_builtins();
        assert_eq!(call(&registry, "trim", " a ".into()), Ok("a".into()));
        assert_eq!(call(&registry, "uppercase", "ab".into()), Ok("AB".into()));
        assert_eq!(call(&registry, "lowercase", Value::Integer(3)), Ok(Value::Integer(3)));
        assert_eq!(
            call(&registry, "digits_only", "+1 (555) 010-99".into()),
            Ok("155501099".into())
        );
    }

    #[test]
    fn registered_functions_see_the_record() {
        let mut registry = FunctionRegistry::empty();
        registry.register("with_country", |value: &Value, record: &Record| {
            Ok(Value::Text(format!("{}{}", record.get("country"), value)))
        });
        let record = Record::new(RecordId::from_row(1)).with("country", "+49");
        let function = registry.get("with_country").unwrap();
        assert_eq!(function(&"123".into(), &record), Ok("+49123".into()));
        assert!(!registry.contains("trim"));
    }
}
