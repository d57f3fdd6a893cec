//! Capabilities domain types implement so contracts can inspect them

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::value::Value;

/// Named fields of a value, captured by [`Snapshot`]
pub type Record = BTreeMap<String, Value>;

/// Trait for field lookup by name
///
/// Entity stores match criteria through this capability, so a store never
/// needs to know whether an entity is a generated struct or an untyped map.
pub trait FieldAccess {
    /// Get a field by name, `None` if the field does not exist
    fn get_field(&self, name: &str) -> Option<Value>;
}

/// Trait for producing an independent copy of a value's fields
///
/// The returned record owns all of its data. Later mutation of the source
/// must not be observable through a snapshot taken earlier.
pub trait Snapshot {
    /// Capture every field of this value
    fn snapshot(&self) -> Record;
}

impl FieldAccess for Value {
    fn get_field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl Snapshot for Value {
    fn snapshot(&self) -> Record {
        match self {
            Value::Map(map) => map.clone(),
            _ => Record::new(),
        }
    }
}

impl FieldAccess for Record {
    fn get_field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl Snapshot for Record {
    fn snapshot(&self) -> Record {
        self.clone()
    }
}

impl<T: FieldAccess + ?Sized> FieldAccess for &T {
    fn get_field(&self, name: &str) -> Option<Value> {
        (**self).get_field(name)
    }
}

impl<T: FieldAccess + ?Sized> FieldAccess for Box<T> {
    fn get_field(&self, name: &str) -> Option<Value> {
        (**self).get_field(name)
    }
}

impl<T: FieldAccess + ?Sized> FieldAccess for Arc<T> {
    fn get_field(&self, name: &str) -> Option<Value> {
        (**self).get_field(name)
    }
}

impl<T: Snapshot + ?Sized> Snapshot for &T {
    fn snapshot(&self) -> Record {
        (**self).snapshot()
    }
}

impl<T: Snapshot + ?Sized> Snapshot for Box<T> {
    fn snapshot(&self) -> Record {
        (**self).snapshot()
    }
}

impl<T: Snapshot + ?Sized> Snapshot for Arc<T> {
    fn snapshot(&self) -> Record {
        (**self).snapshot()
    }
}

#[cfg(test)]
#[path = "traits_tests.rs"]
mod tests;
