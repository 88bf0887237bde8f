//! Environment - The Variable Store of One Run
//!
//! The environment is created empty at the start of a run, mutated in place by
//! assignment blocks and discarded when the run ends. Continuations spawned by
//! a fan-out each receive their own clone.

use crate::error::TypeConflictError;
use crate::value::{Value, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Read-only name resolution used by the evaluator.
pub trait Bindings {
    /// Resolve `name`, returning `None` when it is not bound.
    fn lookup(&self, name: &str) -> Option<Value>;

    /// Check whether `name` is bound.
    fn is_bound(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

impl Bindings for BTreeMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).copied()
    }
}

impl Bindings for HashMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).copied()
    }
}

/// Mapping from variable name to value.
///
/// Ordered by name so snapshots and serialized output are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment {
    variables: BTreeMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// The type `name` is bound to, if it has been assigned.
    pub fn bound_type(&self, name: &str) -> Option<ValueType> {
        self.variables.get(name).map(Value::value_type)
    }

    /// Store `value` under `name`.
    ///
    /// A name keeps the type of its first assignment; assigning a value of a
    /// different type fails and leaves the stored value untouched. Returns the
    /// previous value on success.
    pub fn assign(
        &mut self,
        name: impl Into<String>,
        value: Value,
    ) -> Result<Option<Value>, TypeConflictError> {
        let name = name.into();
        if let Some(existing) = self.variables.get(&name) {
            let bound = existing.value_type();
            let attempted = value.value_type();
            if bound != attempted {
                return Err(TypeConflictError {
                    name,
                    bound,
                    attempted,
                });
            }
        }
        Ok(self.variables.insert(name, value))
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.variables
    }
}

impl Bindings for Environment {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.variables.get(name).copied()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            variables: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_and_overwrite_same_type() {
        let mut env = Environment::new();
        assert_eq!(env.assign("x", Value::from(1)).unwrap(), None);
        assert_eq!(env.assign("x", Value::from(2)).unwrap(), Some(Value::from(1)));
        assert_eq!(env.get("x"), Some(&Value::from(2)));
    }

    #[test]
    fn test_type_conflict_keeps_prior_value() {
        let mut env = Environment::new();
        env.assign("x", Value::from(0)).unwrap();

        let err = env.assign("x", Value::Bool(true)).unwrap_err();
        assert_eq!(err.bound, ValueType::Decimal);
        assert_eq!(err.attempted, ValueType::Bool);
        assert_eq!(env.get("x"), Some(&Value::from(0)));
    }

    #[test]
    fn test_falsy_values_still_count_as_bound() {
        let mut env = Environment::new();
        env.assign("flag", Value::Bool(false)).unwrap();
        assert!(env.assign("flag", Value::from(1)).is_err());
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let env: Environment = [("b", Value::Bool(true)), ("a", Value::from(2))]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&env).unwrap();
        assert_eq!(
            json,
            r#"{"a":{"type":"decimal","value":"2"},"b":{"type":"bool","value":true}}"#
        );
    }
}
