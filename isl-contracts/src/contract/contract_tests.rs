use super::*;
use crate::config::EnforcementMode;
use crate::store::{criteria, EntityStore, InMemoryEntityStore};
use isl_core::{Record, Value};
use std::cell::Cell;

#[derive(Debug, Clone)]
struct Transfer {
    amount: i64,
}

impl Snapshot for Transfer {
    fn snapshot(&self) -> Record {
        criteria([("amount", self.amount)])
    }
}

fn runtime(mode: EnforcementMode) -> ContractRuntime {
    let runtime = ContractRuntime::new();
    runtime.set_enforcement_mode(mode);
    runtime.enable_violation_collection(true);
    runtime
}

#[test]
fn test_contract_kind_display() {
    assert_eq!(ContractKind::Precondition.to_string(), "Precondition");
    assert_eq!(ContractKind::Postcondition.to_string(), "Postcondition");
    assert_eq!(ContractKind::Invariant.to_string(), "Invariant");
    assert_eq!(
        serde_json::to_string(&ContractKind::Invariant).unwrap(),
        "\"invariant\""
    );
}

#[test]
fn test_builders_keep_declaration_order() {
    let contract = Contract::<Transfer, i64>::new("Transfer")
        .requires(|t| t.amount > 0)
        .requires_described("small amounts only", "amount < 1000", |t| t.amount < 1000)
        .ensures(|_, r| *r >= 0)
        .captures("Account");

    assert_eq!(contract.name(), "Transfer");
    assert_eq!(contract.preconditions().len(), 2);
    assert_eq!(contract.preconditions()[1].message(), Some("small amounts only"));
    assert_eq!(contract.postconditions().len(), 1);
    assert!(contract.has_conditions());
}

#[test]
fn test_strict_precondition_blocks_operation() {
    let runtime = runtime(EnforcementMode::Strict);
    let ran = Cell::new(false);
    let contract = Contract::<Transfer, i64>::new("Transfer").requires(|t| t.amount > 0);

    let err = contract
        .call(&runtime, &Transfer { amount: -10 }, |t| {
            ran.set(true);
            t.amount
        })
        .unwrap_err();

    assert!(matches!(err, ContractError::Precondition(_)));
    assert!(!ran.get());
}

#[test]
fn test_postcondition_after_side_effect() {
    let runtime = runtime(EnforcementMode::Strict);
    let ran = Cell::new(false);
    let contract = Contract::<Transfer, i64>::new("Transfer").ensures(|_, balance| *balance >= 0);

    let err = contract
        .call(&runtime, &Transfer { amount: 5 }, |_| {
            ran.set(true);
            -5
        })
        .unwrap_err();

    assert!(ran.get());
    assert_eq!(err.kind(), Some(ContractKind::Postcondition));
}

#[test]
fn test_warn_returns_result() {
    let runtime = runtime(EnforcementMode::Warn);
    let contract = Contract::<Transfer, i64>::new("Transfer")
        .requires(|t| t.amount > 0)
        .ensures(|_, r| *r > 100);

    let result = contract.call(&runtime, &Transfer { amount: -1 }, |t| t.amount * 2);
    assert_eq!(result.unwrap(), -2);
    assert_eq!(runtime.violation_count(), 2);
}

#[test]
fn test_try_call_operation_error_skips_postconditions() {
    let runtime = runtime(EnforcementMode::Strict);
    let contract = Contract::<Transfer, i64>::new("Transfer").ensures(|_, _| false);

    let result = contract.try_call(&runtime, &Transfer { amount: 1 }, |_| {
        Err::<i64, _>("account locked")
    });

    match result {
        Err(CallError::Operation(message)) => assert_eq!(message, "account locked"),
        other => panic!("expected operation error, got {:?}", other),
    }
    assert!(!runtime.has_violations());
}

#[test]
fn test_old_state_from_input_and_store() {
    let runtime = runtime(EnforcementMode::Strict);
    let accounts = std::sync::Arc::new(InMemoryEntityStore::with_entities(vec![Value::Map(
        criteria([("id", "a1")]),
    )]));
    runtime.register_store("Account", accounts.clone());

    let contract = Contract::<Transfer, usize>::new("OpenAccount")
        .captures_input()
        .captures("Account")
        .ensures_with_old(|_, count, old| {
            old.get("amount") == Some(&Value::Integer(25))
                && old.entity("Account").map(|s| s.count(None) + 1) == Some(*count)
        });

    let count = contract
        .call(&runtime, &Transfer { amount: 25 }, |_| {
            accounts.add(Value::Map(criteria([("id", "a2")])));
            accounts.count(None)
        })
        .unwrap();
    assert_eq!(count, 2);
}

#[test]
fn test_fallible_postcondition_with_missing_old_value() {
    let runtime = runtime(EnforcementMode::Strict);
    let contract = Contract::<Transfer, i64>::new("Transfer").ensures_fallible(|_, r, old| {
        let before = old.require("balance")?.as_integer()?;
        Ok(before >= *r)
    });

    let err = contract
        .call(&runtime, &Transfer { amount: 1 }, |_| 0)
        .unwrap_err();
    assert_eq!(
        err.violation().unwrap().message(),
        "Postcondition 1 raised error: Key not found: balance"
    );
}

#[test]
fn test_capture_skipped_without_postconditions() {
    let runtime = runtime(EnforcementMode::Strict);
    runtime.update_config(|config| config.missing_store = crate::config::MissingStorePolicy::Error);

    let contract = Contract::<Transfer, i64>::new("Transfer").captures("Ghost");
    assert!(contract.call(&runtime, &Transfer { amount: 1 }, |t| t.amount).is_ok());
}

#[test]
fn test_wrap_is_reusable() {
    let runtime = std::sync::Arc::new(runtime(EnforcementMode::Strict));
    let double = Contract::<Transfer, i64>::new("Double")
        .requires(|t| t.amount >= 0)
        .wrap(runtime.clone(), |t: &Transfer| t.amount * 2);

    assert_eq!(double.call(&Transfer { amount: 4 }).unwrap(), 8);
    assert!(double.call(&Transfer { amount: -4 }).is_err());
    assert_eq!(double.call(&Transfer { amount: 1 }).unwrap(), 2);
    assert_eq!(double.contract().name(), "Double");
    assert_eq!(runtime.violation_count(), 1);
}

#[test]
fn test_call_records_trace_events() {
    let runtime = runtime(EnforcementMode::Strict);
    runtime.start_trace("payments", "Transfer");
    let contract = Contract::<Transfer, i64>::new("Transfer")
        .requires(|t| t.amount > 0)
        .ensures(|_, r| *r > 0);

    contract.call(&runtime, &Transfer { amount: 3 }, |t| t.amount).unwrap();
    let _ = contract.call(&runtime, &Transfer { amount: -3 }, |t| t.amount);

    let trace = runtime.finish_trace(false).unwrap();
    let kinds: Vec<&str> = trace
        .events
        .iter()
        .map(|e| match &e.kind {
            crate::trace::TraceEventKind::Call { .. } => "call",
            crate::trace::TraceEventKind::Return { .. } => "return",
            crate::trace::TraceEventKind::Check { .. } => "check",
            crate::trace::TraceEventKind::Error { .. } => "error",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["call", "check", "check", "return", "call", "check", "error"]
    );
}
