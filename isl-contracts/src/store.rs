//! Entity stores queried by contract predicates
//!
//! Contracts often need facts about managed state, e.g. "no other user has
//! this email". An [`EntityStore`] answers such questions over a named
//! collection. Stores are registered by name with a
//! [`ContractRuntime`](crate::runtime::ContractRuntime) and queried with
//! [`Criteria`]: a map from field name to expected value.
//!
//! An entity matches when every criterion field is present on the entity
//! (looked up through [`FieldAccess`]) and strictly equal to the expected
//! value. A missing field is a non-match, never an error.

use std::fmt;

use isl_core::{FieldAccess, Record, Snapshot, Value};
use parking_lot::RwLock;

/// Field-name to expected-value map used to query stores
pub type Criteria = Record;

/// Build criteria from `(field, value)` pairs
pub fn criteria<K, V, I>(pairs: I) -> Criteria
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Check if an entity matches all criteria
pub fn matches<E: FieldAccess + ?Sized>(entity: &E, criteria: &Criteria) -> bool {
    criteria.iter().all(|(field, expected)| {
        entity
            .get_field(field)
            .map_or(false, |actual| &actual == expected)
    })
}

/// Anything that can live in an in-memory store
pub trait Entity: FieldAccess + Snapshot + Clone + PartialEq + fmt::Debug + Send + Sync + 'static {}

impl<T> Entity for T where
    T: FieldAccess + Snapshot + Clone + PartialEq + fmt::Debug + Send + Sync + 'static
{
}

/// Uniform query surface over a collection of domain objects
///
/// Query results are returned as record-shaped [`Value::Map`]s so stores of
/// any entity type can sit side by side in one registry.
pub trait EntityStore: Send + Sync {
    /// Check if an entity matching criteria exists
    fn exists(&self, criteria: &Criteria) -> bool {
        self.lookup(criteria).is_some()
    }

    /// Look up the first entity matching criteria
    fn lookup(&self, criteria: &Criteria) -> Option<Value>;

    /// Count entities matching criteria, or all entities for `None`
    fn count(&self, criteria: Option<&Criteria>) -> usize;

    /// Get all entities
    fn all(&self) -> Vec<Value>;

    /// Copy the current contents into an independent store
    fn snapshot(&self) -> InMemoryEntityStore<Value> {
        InMemoryEntityStore::with_entities(self.all())
    }
}

/// In-memory entity store
///
/// The reference implementation, used by tests and by generated code that
/// has no database behind it. Contents sit behind a lock so a store can be
/// shared through `Arc` between business code and the contract runtime.
#[derive(Debug)]
pub struct InMemoryEntityStore<T> {
    entities: RwLock<Vec<T>>,
}

impl<T: Entity> InMemoryEntityStore<T> {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(Vec::new()),
        }
    }

    /// Create a store seeded with entities
    pub fn with_entities(entities: impl IntoIterator<Item = T>) -> Self {
        Self {
            entities: RwLock::new(entities.into_iter().collect()),
        }
    }

    /// Add an entity
    pub fn add(&self, entity: T) {
        self.entities.write().push(entity);
    }

    /// Remove the first entity equal to `entity`
    ///
    /// Returns `false` if no such entity was stored.
    pub fn remove(&self, entity: &T) -> bool {
        let mut entities = self.entities.write();
        match entities.iter().position(|e| e == entity) {
            Some(index) => {
                entities.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove all entities
    pub fn clear(&self) {
        self.entities.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }

    /// Typed lookup of the first matching entity
    pub fn find(&self, criteria: &Criteria) -> Option<T> {
        self.entities
            .read()
            .iter()
            .find(|e| matches(*e, criteria))
            .cloned()
    }

    /// Typed lookup of every matching entity
    pub fn find_all(&self, criteria: &Criteria) -> Vec<T> {
        self.entities
            .read()
            .iter()
            .filter(|e| matches(*e, criteria))
            .cloned()
            .collect()
    }

    /// Typed copy of all entities
    pub fn entities(&self) -> Vec<T> {
        self.entities.read().clone()
    }
}

impl<T: Entity> Default for InMemoryEntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Clone for InMemoryEntityStore<T> {
    fn clone(&self) -> Self {
        Self::with_entities(self.entities())
    }
}

impl<T: Entity> EntityStore for InMemoryEntityStore<T> {
    fn exists(&self, criteria: &Criteria) -> bool {
        self.entities.read().iter().any(|e| matches(e, criteria))
    }

    fn lookup(&self, criteria: &Criteria) -> Option<Value> {
        self.entities
            .read()
            .iter()
            .find(|e| matches(*e, criteria))
            .map(|e| Value::Map(e.snapshot()))
    }

    fn count(&self, criteria: Option<&Criteria>) -> usize {
        let entities = self.entities.read();
        match criteria {
            None => entities.len(),
            Some(criteria) => entities.iter().filter(|e| matches(*e, criteria)).count(),
        }
    }

    fn all(&self) -> Vec<Value> {
        self.entities
            .read()
            .iter()
            .map(|e| Value::Map(e.snapshot()))
            .collect()
    }
}
