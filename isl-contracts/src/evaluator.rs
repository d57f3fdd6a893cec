//! Condition evaluation for contract verification

use std::any::Any;
use std::fmt::Debug;
use std::panic::{catch_unwind, AssertUnwindSafe};

use isl_core::Value;
use tracing::trace;

use crate::{
    contract::{Condition, ContractKind, InvariantCondition, Postcondition, Precondition},
    errors::ContractResult,
    old_state::OldState,
    runtime::ContractRuntime,
    violation::{Violation, ViolationContext},
};

/// Result type of fallible predicates
pub type PredicateResult = anyhow::Result<bool>;

/// Outcome of evaluating one predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The predicate held
    Passed,

    /// The predicate evaluated to false
    Failed,

    /// The predicate could not be evaluated
    Error(String),
}

impl CheckOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl From<bool> for CheckOutcome {
    fn from(passed: bool) -> Self {
        if passed {
            Self::Passed
        } else {
            Self::Failed
        }
    }
}

impl From<PredicateResult> for CheckOutcome {
    fn from(result: PredicateResult) -> Self {
        match result {
            Ok(passed) => passed.into(),
            Err(e) => Self::Error(format!("{:#}", e)),
        }
    }
}

/// Evaluates condition lists against a runtime's enforcement policy
///
/// Conditions run in declaration order. A predicate that panics is treated
/// like one that returned an error. Every failure becomes a
/// [`Violation`] handed to [`ContractRuntime::handle_violation`], so strict
/// mode stops at the first failure while warn mode evaluates the whole list.
pub struct ContractVerifier<'a> {
    runtime: &'a ContractRuntime,
}

impl<'a> ContractVerifier<'a> {
    pub fn new(runtime: &'a ContractRuntime) -> Self {
        Self { runtime }
    }

    /// Verify preconditions against an operation's input
    pub fn verify_preconditions<I: Debug>(
        &self,
        conditions: &[Precondition<I>],
        input: &I,
    ) -> ContractResult<()> {
        self.verify(
            ContractKind::Precondition,
            conditions,
            |predicate| predicate(input),
            || debug_context([("input", input as &dyn Debug)]),
        )
    }

    /// Verify postconditions against an operation's input and result
    pub fn verify_postconditions<I: Debug, O: Debug>(
        &self,
        conditions: &[Postcondition<I, O>],
        input: &I,
        output: &O,
        old: &OldState,
    ) -> ContractResult<()> {
        self.verify(
            ContractKind::Postcondition,
            conditions,
            |predicate| predicate(input, output, old),
            || debug_context([("input", input as &dyn Debug), ("result", output as &dyn Debug)]),
        )
    }

    /// Verify invariants against an object
    pub fn verify_invariants<T: Debug>(
        &self,
        conditions: &[InvariantCondition<T>],
        object: &T,
    ) -> ContractResult<()> {
        self.verify(
            ContractKind::Invariant,
            conditions,
            |predicate| predicate(object),
            || debug_context([("object", object as &dyn Debug)]),
        )
    }

    /// Verify a list of conditions of one kind
    ///
    /// `evaluate` applies a predicate to the operation's arguments and
    /// `context` builds the violation context, only when something failed.
    pub fn verify<F, E, C>(
        &self,
        kind: ContractKind,
        conditions: &[Condition<F>],
        evaluate: E,
        context: C,
    ) -> ContractResult<()>
    where
        F: ?Sized,
        E: Fn(&F) -> CheckOutcome,
        C: Fn() -> ViolationContext,
    {
        if conditions.is_empty() || !self.runtime.is_enabled(kind) {
            return Ok(());
        }

        for (i, condition) in conditions.iter().enumerate() {
            let index = i + 1;
            let outcome = catch_unwind(AssertUnwindSafe(|| evaluate(condition.predicate())))
                .unwrap_or_else(|payload| CheckOutcome::Error(panic_message(payload)));
            trace!("{} {} evaluated: {:?}", kind, index, outcome);

            let message = match outcome {
                CheckOutcome::Passed => {
                    self.runtime
                        .with_trace(|t| t.check(kind, index, true, None));
                    continue;
                }
                CheckOutcome::Failed => match condition.message() {
                    Some(message) => message.to_string(),
                    None => format!("{} {} failed", kind, index),
                },
                CheckOutcome::Error(cause) => format!("{} {} raised error: {}", kind, index, cause),
            };

            self.runtime
                .with_trace(|t| t.check(kind, index, false, Some(message.clone())));

            let mut violation = Violation::new(kind, message).with_context(context());
            if let Some(expression) = condition.expression() {
                violation = violation.with_expression(expression);
            }
            self.runtime.handle_violation(violation)?;
        }

        Ok(())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => format!("panicked: {}", message),
        Err(payload) => match payload.downcast_ref::<&str>() {
            Some(message) => format!("panicked: {}", message),
            None => "predicate panicked".to_string(),
        },
    }
}

fn debug_context<'v, const N: usize>(entries: [(&str, &'v dyn Debug); N]) -> ViolationContext {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), Value::String(format!("{:?}", value))))
        .collect()
}

/// Check a precondition computed by generated code
pub fn check_precondition(
    runtime: &ContractRuntime,
    condition: bool,
    message: &str,
    expression: Option<&str>,
    context: Option<ViolationContext>,
) -> ContractResult<()> {
    check(runtime, ContractKind::Precondition, condition, || {
        describe(ContractKind::Precondition, message, expression, context)
    })
}

/// Check a precondition and attach the offending value on failure
pub fn check_precondition_actual(
    runtime: &ContractRuntime,
    condition: bool,
    actual: impl Into<Value>,
    message: &str,
    expression: Option<&str>,
) -> ContractResult<()> {
    check(runtime, ContractKind::Precondition, condition, || {
        describe(ContractKind::Precondition, message, expression, None).with_actual(actual)
    })
}

/// Check a postcondition computed by generated code
pub fn check_postcondition(
    runtime: &ContractRuntime,
    condition: bool,
    message: &str,
    expression: Option<&str>,
    context: Option<ViolationContext>,
) -> ContractResult<()> {
    check(runtime, ContractKind::Postcondition, condition, || {
        describe(ContractKind::Postcondition, message, expression, context)
    })
}

/// Check that a postcondition's observed value equals the expected one
///
/// Both values are attached to the violation.
pub fn check_postcondition_eq(
    runtime: &ContractRuntime,
    expected: impl Into<Value>,
    actual: impl Into<Value>,
    message: &str,
    expression: Option<&str>,
) -> ContractResult<()> {
    let expected = expected.into();
    let actual = actual.into();
    check(runtime, ContractKind::Postcondition, expected == actual, || {
        describe(ContractKind::Postcondition, message, expression, None)
            .with_expected(expected)
            .with_actual(actual)
    })
}

/// Check an invariant computed by generated code
pub fn check_invariant(
    runtime: &ContractRuntime,
    condition: bool,
    message: &str,
    expression: Option<&str>,
    context: Option<ViolationContext>,
) -> ContractResult<()> {
    check(runtime, ContractKind::Invariant, condition, || {
        describe(ContractKind::Invariant, message, expression, context)
    })
}

fn check(
    runtime: &ContractRuntime,
    kind: ContractKind,
    condition: bool,
    violation: impl FnOnce() -> Violation,
) -> ContractResult<()> {
    if condition || !runtime.is_enabled(kind) {
        return Ok(());
    }
    runtime.handle_violation(violation())
}

fn describe(
    kind: ContractKind,
    message: &str,
    expression: Option<&str>,
    context: Option<ViolationContext>,
) -> Violation {
    let mut violation = Violation::new(kind, message);
    if let Some(expression) = expression {
        violation = violation.with_expression(expression);
    }
    if let Some(context) = context {
        violation = violation.with_context(context);
    }
    violation
}
