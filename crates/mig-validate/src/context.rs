//! Cross-record context for validation: reference sets and custom predicates.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use mig_model::{Record, Value};

/// Predicate behind a `custom` validation rule.
///
/// `Ok(false)` fails the rule; `Err` fails it with the given message.
pub type PredicateFn = dyn Fn(&Value, &Record) -> Result<bool, String> + Send + Sync;

/// Named reference sets for `referential` rules and named predicates for
/// `custom` rules.
#[derive(Clone, Default)]
pub struct ValidationContext {
    references: BTreeMap<String, BTreeSet<String>>,
    predicates: BTreeMap<String, Arc<PredicateFn>>,
}

impl ValidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or extend) the reference set `name`.
    pub fn add_reference<I, S>(&mut self, name: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.references
            .entry(name.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn register_predicate(
        &mut self,
        name: impl Into<String>,
        predicate: impl Fn(&Value, &Record) -> Result<bool, String> + Send + Sync + 'static,
    ) -> &mut Self {
        self.predicates.insert(name.into(), Arc::new(predicate));
        self
    }

    pub fn reference(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.references.get(name)
    }

    pub fn predicate(&self, name: &str) -> Option<Arc<PredicateFn>> {
        self.predicates.get(name).cloned()
    }
}

impl fmt::Debug for ValidationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationContext")
            .field(
                "references",
                &self
                    .references
                    .iter()
                    .map(|(name, values)| (name, values.len()))
                    .collect::<BTreeMap<_, _>>(),
            )
            .field("predicates", &self.predicates.keys().collect::<Vec<_>>())
            .finish()
    }
}
