//! Value - Scalar Runtime Values
//!
//! Every variable in a run holds one of a closed set of scalar values.
//! A variable name is bound to the type of the first value assigned to it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The declared type of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Decimal,
    Bool,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Decimal => write!(f, "decimal"),
            ValueType::Bool => write!(f, "bool"),
        }
    }
}

/// A scalar runtime value.
///
/// Serialized as `{"type": "decimal", "value": "2.5"}` so decimals survive
/// a JSON round-trip without losing precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Decimal(Decimal),
    Bool(bool),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Decimal(_) => ValueType::Decimal,
            Value::Bool(_) => ValueType::Bool,
        }
    }

    /// Numeric view of the value. Booleans count as `1` and `0`.
    pub fn as_decimal(&self) -> Decimal {
        match self {
            Value::Decimal(d) => *d,
            Value::Bool(true) => Decimal::ONE,
            Value::Bool(false) => Decimal::ZERO,
        }
    }

    /// Truthiness of the value. Decimals are true when non-zero.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Decimal(d) => !d.is_zero(),
            Value::Bool(b) => *b,
        }
    }

    /// Convert into the given declared type.
    pub fn coerce(self, target: ValueType) -> Value {
        match target {
            ValueType::Decimal => Value::Decimal(self.as_decimal()),
            ValueType::Bool => Value::Bool(self.as_bool()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Decimal(d) => write!(f, "{}", d.normalize()),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Decimal(Decimal::from(value))
    }
}
