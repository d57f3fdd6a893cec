//! Invariant-checked objects
//!
//! [`Invariants`] is the ordered list of conditions a stateful object must
//! always satisfy. [`Guarded`] owns such an object and checks the list after
//! construction and after every mutation made through [`Guarded::apply`] or
//! [`Guarded::try_apply`]. Reads through [`Guarded::get`] or `Deref` are not
//! checked.
//!
//! Generated code exposes an entity's public operations as a trait
//! implemented for `Guarded<Entity>`, each method going through `apply`.
//! Private helpers on the entity itself never trigger a check.
//!
//! ```
//! use std::sync::Arc;
//! use isl_contracts::{ContractRuntime, Guarded, Invariants};
//!
//! #[derive(Debug)]
//! struct Account {
//!     balance: i64,
//! }
//!
//! let runtime = Arc::new(ContractRuntime::new());
//! let invariants = Invariants::new().holds(|a: &Account| a.balance >= 0);
//!
//! let mut account = Guarded::new(Account { balance: 10 }, invariants, runtime).unwrap();
//! assert!(account.apply(|a| a.balance -= 5).is_ok());
//! assert!(account.apply(|a| a.balance -= 50).is_err());
//! ```

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use tracing::trace;

use crate::{
    contract::{invariant, InvariantCondition},
    errors::{CallError, ContractResult},
    evaluator::{CheckOutcome, ContractVerifier, PredicateResult},
    runtime::ContractRuntime,
};

/// Ordered invariant conditions of one object type
pub struct Invariants<T> {
    conditions: Vec<InvariantCondition<T>>,
}

impl<T: 'static> Invariants<T> {
    pub fn new() -> Self {
        Self {
            conditions: Vec::new(),
        }
    }

    /// Add an invariant
    pub fn holds<P>(self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.with_condition(invariant(move |object: &T| CheckOutcome::from(predicate(object))))
    }

    /// Add an invariant whose evaluation can fail
    pub fn holds_fallible<P>(self, predicate: P) -> Self
    where
        P: Fn(&T) -> PredicateResult + Send + Sync + 'static,
    {
        self.with_condition(invariant(move |object: &T| CheckOutcome::from(predicate(object))))
    }

    /// Add an invariant with a custom message and its source expression
    pub fn holds_described<P>(
        self,
        message: impl Into<String>,
        expression: impl Into<String>,
        predicate: P,
    ) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let condition = invariant(move |object: &T| CheckOutcome::from(predicate(object)))
            .with_message(message)
            .with_expression(expression);
        self.with_condition(condition)
    }

    /// Add a prebuilt invariant
    pub fn with_condition(mut self, condition: InvariantCondition<T>) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn conditions(&self) -> &[InvariantCondition<T>] {
        &self.conditions
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Verify every invariant against `object`
    pub fn check(&self, runtime: &ContractRuntime, object: &T) -> ContractResult<()>
    where
        T: fmt::Debug,
    {
        ContractVerifier::new(runtime).verify_invariants(&self.conditions, object)
    }
}

impl<T: 'static> Default for Invariants<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Invariants<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invariants")
            .field("conditions", &self.conditions)
            .finish()
    }
}

/// An object whose invariants are checked after every mutation
pub struct Guarded<T> {
    value: T,
    invariants: Arc<Invariants<T>>,
    runtime: Arc<ContractRuntime>,
}

impl<T: fmt::Debug + 'static> Guarded<T> {
    /// Take ownership of `value` and check its invariants
    ///
    /// In strict mode a value that does not satisfy its invariants is
    /// rejected.
    pub fn new(
        value: T,
        invariants: impl Into<Arc<Invariants<T>>>,
        runtime: Arc<ContractRuntime>,
    ) -> ContractResult<Self> {
        let guarded = Self {
            value,
            invariants: invariants.into(),
            runtime,
        };
        guarded.check()?;
        Ok(guarded)
    }

    /// Read access, never checked
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Run an operation on the object, then check invariants
    ///
    /// A strict-mode violation is reported after the mutation happened; the
    /// object is left as the operation left it.
    pub fn apply<R>(&mut self, op: impl FnOnce(&mut T) -> R) -> ContractResult<R> {
        let result = op(&mut self.value);
        self.check()?;
        Ok(result)
    }

    /// Run a fallible operation on the object, then check invariants
    ///
    /// Invariants are not checked when the operation fails.
    pub fn try_apply<R, E>(
        &mut self,
        op: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Result<R, CallError<E>> {
        let result = op(&mut self.value).map_err(CallError::Operation)?;
        self.check()?;
        Ok(result)
    }

    /// Check invariants against the current value
    pub fn check(&self) -> ContractResult<()> {
        trace!("Checking {} invariants", self.invariants.len());
        self.invariants.check(&self.runtime, &self.value)
    }

    pub fn invariants(&self) -> &Invariants<T> {
        &self.invariants
    }

    pub fn runtime(&self) -> &Arc<ContractRuntime> {
        &self.runtime
    }

    /// Give up the guard and return the object
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for Guarded<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Guarded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guarded")
            .field("value", &self.value)
            .field("invariants", &self.invariants.conditions.len())
            .finish()
    }
}

#[cfg(test)]
mod guard_tests;
