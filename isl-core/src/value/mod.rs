//! Runtime value representation

pub mod error;

pub use error::{ValueError, ValueResult};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dynamic value used by contracts
///
/// Entity fields, store criteria, violation context and captured old state
/// are all expressed as `Value`s so the contract engine never needs to know
/// the concrete types of generated models.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Nil/null value
    Nil,

    /// Boolean value
    Boolean(bool),

    /// Integer value
    Integer(i64),

    /// Floating point value
    Float(f64),

    /// String value
    String(String),

    /// List of values
    List(Vec<Value>),

    /// Ordered map of named values
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Type checking predicates
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Value::Boolean(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Value::Integer(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Type conversion helpers
    pub fn as_integer(&self) -> ValueResult<i64> {
        match self {
            Value::Integer(n) => Ok(*n),
            _ => Err(ValueError::TypeError {
                expected: "integer",
                actual: self.type_name(),
            }),
        }
    }

    pub fn as_float(&self) -> ValueResult<f64> {
        match self {
            Value::Float(f) => Ok(*f),
            _ => Err(ValueError::TypeError {
                expected: "float",
                actual: self.type_name(),
            }),
        }
    }

    /// Numeric view of integers and floats, for arithmetic in predicates
    pub fn as_number(&self) -> ValueResult<f64> {
        match self {
            Value::Integer(n) => Ok(*n as f64),
            Value::Float(f) => Ok(*f),
            _ => Err(ValueError::TypeError {
                expected: "number",
                actual: self.type_name(),
            }),
        }
    }

    pub fn as_string(&self) -> ValueResult<&str> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(ValueError::TypeError {
                expected: "string",
                actual: self.type_name(),
            }),
        }
    }

    pub fn as_boolean(&self) -> ValueResult<bool> {
        match self {
            Value::Boolean(b) => Ok(*b),
            _ => Err(ValueError::TypeError {
                expected: "boolean",
                actual: self.type_name(),
            }),
        }
    }

    pub fn as_list(&self) -> ValueResult<&[Value]> {
        match self {
            Value::List(items) => Ok(items),
            _ => Err(ValueError::TypeError {
                expected: "list",
                actual: self.type_name(),
            }),
        }
    }

    pub fn as_map(&self) -> ValueResult<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Ok(map),
            _ => Err(ValueError::TypeError {
                expected: "map",
                actual: self.type_name(),
            }),
        }
    }

    /// Look up a key in a map value
    ///
    /// Non-map values have no keys, so this returns `None` for them.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// Get type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Check if value is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Boolean(b) => *b,
            _ => true,
        }
    }

    /// Compare two numeric values
    ///
    /// Unlike `==`, ordering comparisons accept mixed integer/float operands.
    pub fn compare_numeric(&self, other: &Value) -> ValueResult<std::cmp::Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(a.cmp(b)),
            _ => {
                let a = self.as_number()?;
                let b = other.as_number()?;
                a.partial_cmp(&b).ok_or_else(|| ValueError::ConversionError {
                    from: "float",
                    to: "ordering",
                    reason: "NaN is not comparable".to_string(),
                })
            }
        }
    }
}

// Equality is strict: values of different variants are never equal, so
// `Integer(1) != Float(1.0)`.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, val)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, val)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(n as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Nil, Into::into)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

#[cfg(test)]
#[path = "../value_tests.rs"]
mod tests;
