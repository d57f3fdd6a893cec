//! ISL Runtime Contracts
//!
//! This crate enforces the preconditions, postconditions and invariants
//! that code generated from ISL interface specifications declares. Every
//! check goes through a [`ContractRuntime`], whose enforcement mode decides
//! whether a failed check aborts the call (`strict`), is only logged and
//! collected (`warn`), or is not evaluated at all (`skip`).

pub mod config;
pub mod contract;
pub mod errors;
pub mod evaluator;
pub mod guard;
pub mod old_state;
pub mod runtime;
pub mod store;
pub mod trace;
pub mod violation;

pub use config::{ContractConfig, EnforcementMode, MissingStorePolicy, DEFAULT_MAX_VIOLATIONS};
pub use contract::{
    Condition, Contract, ContractKind, Contracted, InvariantCondition, Postcondition, Precondition,
};
pub use errors::{CallError, ContractError, ContractResult};
pub use evaluator::{
    check_invariant, check_postcondition, check_postcondition_eq, check_precondition,
    check_precondition_actual, CheckOutcome, ContractVerifier, PredicateResult,
};
pub use guard::{Guarded, Invariants};
pub use old_state::{capture_old_state, OldState};
pub use runtime::ContractRuntime;
pub use store::{criteria, Criteria, Entity, EntityStore, InMemoryEntityStore};
pub use trace::{ExecutionTrace, TraceEvent, TraceEventKind, TraceRecorder};
pub use violation::{Violation, ViolationContext};

pub use isl_core::{FieldAccess, Record, Snapshot, Value};
