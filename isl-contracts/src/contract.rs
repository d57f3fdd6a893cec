//! Contract representation and operation wrapping
//!
//! A [`Contract`] attaches ordered preconditions and postconditions to an
//! operation taking an input `I` and producing an output `O`.
//!
//! # Contract Semantics
//!
//! ## Preconditions (`requires`)
//! - Evaluated before the operation runs, against the input only
//! - A strict-mode failure means the operation is never invoked
//!
//! ## Postconditions (`ensures`)
//! - Evaluated after the operation returns, against the input, the result
//!   and the [`OldState`] captured just before the call
//! - NOT checked when the operation itself fails
//! - A strict-mode failure is reported after the operation's side effects
//!   happened; nothing is rolled back
//!
//! ## Invariants
//! - Checked on a stateful object after construction and after every call
//!   through its public surface, see [`Guarded`](crate::guard::Guarded)
//!
//! # Example
//!
//! ```
//! use isl_contracts::{Contract, ContractRuntime};
//!
//! #[derive(Debug)]
//! struct Deposit {
//!     amount: i64,
//! }
//!
//! let runtime = ContractRuntime::new();
//! let contract = Contract::<Deposit, i64>::new("Deposit")
//!     .requires_described("amount must be positive", "amount > 0", |d| d.amount > 0)
//!     .ensures(|d, balance| *balance >= d.amount);
//!
//! let balance = contract.call(&runtime, &Deposit { amount: 10 }, |d| 100 + d.amount);
//! assert_eq!(balance.unwrap(), 110);
//!
//! let err = contract.call(&runtime, &Deposit { amount: -10 }, |d| 100 + d.amount);
//! assert!(err.is_err());
//! ```

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use isl_core::{Record, Snapshot};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    errors::{CallError, ContractError, ContractResult},
    evaluator::{CheckOutcome, ContractVerifier, PredicateResult},
    old_state::{capture_old_state, OldState},
    runtime::ContractRuntime,
};

/// Types of contract conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractKind {
    /// Checked before the operation. Failure blames the caller.
    Precondition,

    /// Checked after the operation. Failure blames the implementation.
    Postcondition,

    /// Checked on an object after each public operation
    Invariant,
}

impl ContractKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Precondition => "Precondition",
            Self::Postcondition => "Postcondition",
            Self::Invariant => "Invariant",
        }
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single contract condition
///
/// Holds the predicate together with an optional custom message, used
/// instead of the index-based default when the predicate fails, and the
/// source text of the expression it was generated from.
pub struct Condition<F: ?Sized> {
    message: Option<String>,
    expression: Option<String>,
    predicate: Box<F>,
}

impl<F: ?Sized> Condition<F> {
    pub fn new(predicate: Box<F>) -> Self {
        Self {
            message: None,
            expression: None,
            predicate,
        }
    }

    /// Set the message reported when the predicate fails
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set the source expression text
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    pub fn predicate(&self) -> &F {
        &self.predicate
    }
}

impl<F: ?Sized> fmt::Debug for Condition<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("message", &self.message)
            .field("expression", &self.expression)
            .finish_non_exhaustive()
    }
}

pub type PreconditionFn<I> = dyn Fn(&I) -> CheckOutcome + Send + Sync;
pub type PostconditionFn<I, O> = dyn Fn(&I, &O, &OldState) -> CheckOutcome + Send + Sync;
pub type InvariantFn<T> = dyn Fn(&T) -> CheckOutcome + Send + Sync;

pub type Precondition<I> = Condition<PreconditionFn<I>>;
pub type Postcondition<I, O> = Condition<PostconditionFn<I, O>>;
pub type InvariantCondition<T> = Condition<InvariantFn<T>>;

/// Box a precondition predicate
pub fn precondition<I, P>(predicate: P) -> Precondition<I>
where
    P: Fn(&I) -> CheckOutcome + Send + Sync + 'static,
{
    let predicate: Box<PreconditionFn<I>> = Box::new(predicate);
    Condition::new(predicate)
}

/// Box a postcondition predicate
pub fn postcondition<I, O, P>(predicate: P) -> Postcondition<I, O>
where
    P: Fn(&I, &O, &OldState) -> CheckOutcome + Send + Sync + 'static,
{
    let predicate: Box<PostconditionFn<I, O>> = Box::new(predicate);
    Condition::new(predicate)
}

/// Box an invariant predicate
pub fn invariant<T, P>(predicate: P) -> InvariantCondition<T>
where
    P: Fn(&T) -> CheckOutcome + Send + Sync + 'static,
{
    let predicate: Box<InvariantFn<T>> = Box::new(predicate);
    Condition::new(predicate)
}

type InputCapture<I> = dyn Fn(&I) -> Record + Send + Sync;

/// Preconditions, postconditions and old-state requirements of one operation
pub struct Contract<I, O> {
    /// Name of the contracted operation, used in logs and traces
    name: String,
    preconditions: Vec<Precondition<I>>,
    postconditions: Vec<Postcondition<I, O>>,
    /// Entity stores frozen before the operation runs
    captures: Vec<String>,
    capture_input: Option<Box<InputCapture<I>>>,
}

impl<I: 'static, O: 'static> Contract<I, O> {
    /// Create an empty contract
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            preconditions: Vec::new(),
            postconditions: Vec::new(),
            captures: Vec::new(),
            capture_input: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn preconditions(&self) -> &[Precondition<I>] {
        &self.preconditions
    }

    pub fn postconditions(&self) -> &[Postcondition<I, O>] {
        &self.postconditions
    }

    /// Check if this contract has any conditions
    pub fn has_conditions(&self) -> bool {
        !self.preconditions.is_empty() || !self.postconditions.is_empty()
    }

    /// Add a precondition
    pub fn requires<P>(self, predicate: P) -> Self
    where
        P: Fn(&I) -> bool + Send + Sync + 'static,
    {
        self.with_precondition(precondition(move |input: &I| {
            CheckOutcome::from(predicate(input))
        }))
    }

    /// Add a precondition whose evaluation can fail
    ///
    /// An `Err` is reported as a violation, never propagated.
    pub fn requires_fallible<P>(self, predicate: P) -> Self
    where
        P: Fn(&I) -> PredicateResult + Send + Sync + 'static,
    {
        self.with_precondition(precondition(move |input: &I| {
            CheckOutcome::from(predicate(input))
        }))
    }

    /// Add a precondition with a custom message and its source expression
    pub fn requires_described<P>(
        self,
        message: impl Into<String>,
        expression: impl Into<String>,
        predicate: P,
    ) -> Self
    where
        P: Fn(&I) -> bool + Send + Sync + 'static,
    {
        let condition = precondition(move |input: &I| CheckOutcome::from(predicate(input)))
            .with_message(message)
            .with_expression(expression);
        self.with_precondition(condition)
    }

    /// Add a prebuilt precondition
    pub fn with_precondition(mut self, condition: Precondition<I>) -> Self {
        self.preconditions.push(condition);
        self
    }

    /// Add a postcondition over the input and the result
    pub fn ensures<P>(self, predicate: P) -> Self
    where
        P: Fn(&I, &O) -> bool + Send + Sync + 'static,
    {
        self.with_postcondition(postcondition(move |input: &I, output: &O, _: &OldState| {
            CheckOutcome::from(predicate(input, output))
        }))
    }

    /// Add a postcondition that also sees the state captured before the call
    pub fn ensures_with_old<P>(self, predicate: P) -> Self
    where
        P: Fn(&I, &O, &OldState) -> bool + Send + Sync + 'static,
    {
        self.with_postcondition(postcondition(move |input: &I, output: &O, old: &OldState| {
            CheckOutcome::from(predicate(input, output, old))
        }))
    }

    /// Add a postcondition whose evaluation can fail
    pub fn ensures_fallible<P>(self, predicate: P) -> Self
    where
        P: Fn(&I, &O, &OldState) -> PredicateResult + Send + Sync + 'static,
    {
        self.with_postcondition(postcondition(move |input: &I, output: &O, old: &OldState| {
            CheckOutcome::from(predicate(input, output, old))
        }))
    }

    /// Add a postcondition with a custom message and its source expression
    pub fn ensures_described<P>(
        self,
        message: impl Into<String>,
        expression: impl Into<String>,
        predicate: P,
    ) -> Self
    where
        P: Fn(&I, &O) -> bool + Send + Sync + 'static,
    {
        let condition = postcondition(move |input: &I, output: &O, _: &OldState| {
            CheckOutcome::from(predicate(input, output))
        })
        .with_message(message)
        .with_expression(expression);
        self.with_postcondition(condition)
    }

    /// Add a prebuilt postcondition
    pub fn with_postcondition(mut self, condition: Postcondition<I, O>) -> Self {
        self.postconditions.push(condition);
        self
    }

    /// Freeze the named entity store before each call
    pub fn captures(mut self, entity: impl Into<String>) -> Self {
        self.captures.push(entity.into());
        self
    }

    /// Capture the input's fields before each call
    pub fn captures_input(mut self) -> Self
    where
        I: Snapshot,
    {
        self.capture_input = Some(Box::new(|input: &I| input.snapshot()));
        self
    }

    /// Evaluate the preconditions against `input`
    pub fn check_preconditions(&self, runtime: &ContractRuntime, input: &I) -> ContractResult<()>
    where
        I: fmt::Debug,
    {
        ContractVerifier::new(runtime).verify_preconditions(&self.preconditions, input)
    }

    /// Capture the old state the postconditions need
    ///
    /// Returns an empty state when postconditions would not be evaluated.
    pub fn capture(&self, runtime: &ContractRuntime, input: &I) -> ContractResult<OldState> {
        if self.postconditions.is_empty() || !runtime.is_enabled(ContractKind::Postcondition) {
            return Ok(OldState::new());
        }
        let fields = self.capture_input.as_ref().map(|capture| capture(input));
        capture_old_state(
            runtime,
            fields.as_ref().map(|record| record as &dyn Snapshot),
            &self.captures,
        )
    }

    /// Evaluate the postconditions against `input` and `output`
    pub fn check_postconditions(
        &self,
        runtime: &ContractRuntime,
        input: &I,
        output: &O,
        old: &OldState,
    ) -> ContractResult<()>
    where
        I: fmt::Debug,
        O: fmt::Debug,
    {
        ContractVerifier::new(runtime).verify_postconditions(&self.postconditions, input, output, old)
    }

    /// Run an infallible operation under this contract
    pub fn call<F>(&self, runtime: &ContractRuntime, input: &I, op: F) -> ContractResult<O>
    where
        I: fmt::Debug,
        O: fmt::Debug,
        F: FnOnce(&I) -> O,
    {
        match self.try_call(runtime, input, |input| Ok::<O, Infallible>(op(input))) {
            Ok(output) => Ok(output),
            Err(CallError::Contract(err)) => Err(err),
            Err(CallError::Operation(never)) => match never {},
        }
    }

    /// Run a fallible operation under this contract
    ///
    /// Business errors are returned as [`CallError::Operation`] without
    /// evaluating postconditions.
    pub fn try_call<E, F>(&self, runtime: &ContractRuntime, input: &I, op: F) -> Result<O, CallError<E>>
    where
        I: fmt::Debug,
        O: fmt::Debug,
        F: FnOnce(&I) -> Result<O, E>,
    {
        let started = self.enter(runtime, input)?;
        let old = self.capture(runtime, input).map_err(|e| self.fail(runtime, e))?;
        let output = op(input).map_err(|e| self.operation_failed(runtime, e))?;
        self.leave(runtime, input, output, &old, started)
    }

    /// Run an async operation under this contract
    ///
    /// The operation receives a clone of the input; checks run synchronously
    /// before and after it, never across an await point.
    pub async fn call_async<E, F, Fut>(
        &self,
        runtime: &ContractRuntime,
        input: I,
        op: F,
    ) -> Result<O, CallError<E>>
    where
        I: Clone + fmt::Debug,
        O: fmt::Debug,
        F: FnOnce(I) -> Fut,
        Fut: Future<Output = Result<O, E>>,
    {
        let started = self.enter(runtime, &input)?;
        let old = self.capture(runtime, &input).map_err(|e| self.fail(runtime, e))?;
        let output = op(input.clone())
            .await
            .map_err(|e| self.operation_failed(runtime, e))?;
        self.leave(runtime, &input, output, &old, started)
    }

    /// Bind this contract to a runtime and an operation
    pub fn wrap<F>(self, runtime: Arc<ContractRuntime>, op: F) -> Contracted<I, O, F>
    where
        F: Fn(&I) -> O,
    {
        Contracted {
            contract: self,
            runtime,
            op,
        }
    }

    fn enter(&self, runtime: &ContractRuntime, input: &I) -> ContractResult<Instant>
    where
        I: fmt::Debug,
    {
        debug!("Entering contracted operation {}", self.name);
        runtime.with_trace(|trace| trace.call(&self.name, input));
        self.check_preconditions(runtime, input)
            .map_err(|e| self.fail(runtime, e))?;
        Ok(Instant::now())
    }

    fn leave<E>(
        &self,
        runtime: &ContractRuntime,
        input: &I,
        output: O,
        old: &OldState,
        started: Instant,
    ) -> Result<O, CallError<E>>
    where
        I: fmt::Debug,
        O: fmt::Debug,
    {
        self.check_postconditions(runtime, input, &output, old)
            .map_err(|e| self.fail(runtime, e))?;
        let elapsed = started.elapsed().as_millis() as u64;
        runtime.with_trace(|trace| trace.ret(&self.name, &output, elapsed));
        Ok(output)
    }

    fn fail(&self, runtime: &ContractRuntime, err: ContractError) -> ContractError {
        runtime.with_trace(|trace| trace.error(&self.name, err.to_string()));
        err
    }

    fn operation_failed<E>(&self, runtime: &ContractRuntime, err: E) -> CallError<E> {
        debug!("Contracted operation {} failed, skipping postconditions", self.name);
        runtime.with_trace(|trace| trace.error(&self.name, "operation returned an error"));
        CallError::Operation(err)
    }
}

impl<I, O> fmt::Debug for Contract<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contract")
            .field("name", &self.name)
            .field("preconditions", &self.preconditions)
            .field("postconditions", &self.postconditions)
            .field("captures", &self.captures)
            .field("captures_input", &self.capture_input.is_some())
            .finish()
    }
}

/// An operation bound to its contract and runtime
pub struct Contracted<I, O, F> {
    contract: Contract<I, O>,
    runtime: Arc<ContractRuntime>,
    op: F,
}

impl<I, O, F> Contracted<I, O, F>
where
    I: fmt::Debug + 'static,
    O: fmt::Debug + 'static,
    F: Fn(&I) -> O,
{
    /// Invoke the operation with contract checking
    pub fn call(&self, input: &I) -> ContractResult<O> {
        self.contract.call(&self.runtime, input, &self.op)
    }

    pub fn contract(&self) -> &Contract<I, O> {
        &self.contract
    }

    pub fn runtime(&self) -> &Arc<ContractRuntime> {
        &self.runtime
    }
}

impl<I, O, F> fmt::Debug for Contracted<I, O, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contracted")
            .field("contract", &self.contract)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod contract_tests;
