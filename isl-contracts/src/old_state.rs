//! Pre-call state for postconditions
//!
//! Postconditions such as `balance == old(balance) - amount` compare the
//! result of an operation with values observed just before it ran. Those
//! values are captured into an [`OldState`] from the operation's input and
//! from registered entity stores. Every captured value is an owned copy, so
//! nothing the operation mutates afterwards shows through.

use isl_core::{Record, Snapshot, Value, ValueError, ValueResult};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::{
    config::MissingStorePolicy,
    errors::{ContractError, ContractResult},
    runtime::ContractRuntime,
    store::{EntityStore, InMemoryEntityStore},
};

/// Values and store contents captured before an operation
///
/// Input fields and entity stores live in separate namespaces, so a field
/// named `User` never collides with the `User` store.
#[derive(Debug, Clone, Default)]
pub struct OldState {
    values: Record,
    entities: FxHashMap<String, InMemoryEntityStore<Value>>,
}

impl OldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a captured field value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Get a captured field value, failing if it was not captured
    ///
    /// Meant for fallible predicates, where `?` turns the miss into a
    /// contract violation.
    pub fn require(&self, name: &str) -> ValueResult<&Value> {
        self.get(name)
            .ok_or_else(|| ValueError::KeyNotFound(name.to_string()))
    }

    /// Get the frozen copy of an entity store
    pub fn entity(&self, name: &str) -> Option<&InMemoryEntityStore<Value>> {
        self.entities.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn set_entity(&mut self, name: impl Into<String>, store: InMemoryEntityStore<Value>) {
        self.entities.insert(name.into(), store);
    }

    /// All captured field values
    pub fn values(&self) -> &Record {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.entities.is_empty()
    }
}

/// Capture old state before an operation runs
///
/// Every field of `input` is stored under its own name, and every named
/// entity store registered with `runtime` is frozen under the entity
/// namespace. Names without a registered store are handled according to
/// the runtime's [`MissingStorePolicy`].
pub fn capture_old_state<S: AsRef<str>>(
    runtime: &ContractRuntime,
    input: Option<&dyn Snapshot>,
    entity_names: &[S],
) -> ContractResult<OldState> {
    let mut old = OldState::new();

    if let Some(input) = input {
        old.values = input.snapshot();
    }

    for name in entity_names {
        let name = name.as_ref();
        match runtime.store(name) {
            Some(store) => old.set_entity(name, EntityStore::snapshot(&*store)),
            None => match runtime.config().missing_store {
                MissingStorePolicy::Skip => {}
                MissingStorePolicy::Warn => {
                    warn!("Entity store {} is not registered, skipping capture", name);
                }
                MissingStorePolicy::Error => {
                    return Err(ContractError::StoreNotFound(name.to_string()));
                }
            },
        }
    }

    debug!(
        "Captured old state: {} fields, {} entity stores",
        old.values.len(),
        old.entities.len()
    );
    Ok(old)
}
