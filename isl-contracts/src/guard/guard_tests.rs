use super::*;
use crate::config::EnforcementMode;
use crate::errors::ContractError;
use anyhow::bail;

#[derive(Debug, Clone, PartialEq)]
struct Account {
    balance: i64,
    limit: i64,
}

fn account_invariants() -> Arc<Invariants<Account>> {
    Arc::new(
        Invariants::new()
            .holds(|a: &Account| a.balance >= 0)
            .holds_described("balance within limit", "balance <= limit", |a: &Account| {
                a.balance <= a.limit
            }),
    )
}

fn runtime(mode: EnforcementMode) -> Arc<ContractRuntime> {
    let runtime = ContractRuntime::new();
    runtime.set_enforcement_mode(mode);
    runtime.enable_violation_collection(true);
    Arc::new(runtime)
}

#[test]
fn test_new_checks_invariants() {
    let ok = Guarded::new(
        Account { balance: 10, limit: 100 },
        account_invariants(),
        runtime(EnforcementMode::Strict),
    );
    assert!(ok.is_ok());

    let err = Guarded::new(
        Account { balance: -1, limit: 100 },
        account_invariants(),
        runtime(EnforcementMode::Strict),
    )
    .unwrap_err();
    assert_eq!(err.violation().unwrap().message(), "Invariant 1 failed");
}

#[test]
fn test_apply_checks_after_mutation() {
    let mut account = Guarded::new(
        Account { balance: 10, limit: 100 },
        account_invariants(),
        runtime(EnforcementMode::Strict),
    )
    .unwrap();

    let err = account.apply(|a| a.balance = 500).unwrap_err();
    assert!(matches!(err, ContractError::Invariant(_)));
    assert_eq!(err.violation().unwrap().message(), "balance within limit");
    assert_eq!(err.violation().unwrap().expression(), Some("balance <= limit"));

    // detection, not rollback
    assert_eq!(account.balance, 500);
}

#[test]
fn test_apply_returns_result() {
    let mut account = Guarded::new(
        Account { balance: 10, limit: 100 },
        account_invariants(),
        runtime(EnforcementMode::Strict),
    )
    .unwrap();

    let previous = account
        .apply(|a| std::mem::replace(&mut a.balance, 20))
        .unwrap();
    assert_eq!(previous, 10);
    assert_eq!(account.get().balance, 20);
}

#[test]
fn test_reads_are_not_checked() {
    let runtime = runtime(EnforcementMode::Warn);
    let account = Guarded::new(
        Account { balance: -5, limit: 100 },
        account_invariants(),
        runtime.clone(),
    )
    .unwrap();
    assert_eq!(runtime.violation_count(), 1);

    let _ = account.get().balance;
    let _ = account.limit;
    assert_eq!(runtime.violation_count(), 1);
}

#[test]
fn test_warn_mode_collects_each_failure() {
    let runtime = runtime(EnforcementMode::Warn);
    let mut account = Guarded::new(
        Account { balance: 0, limit: 10 },
        account_invariants(),
        runtime.clone(),
    )
    .unwrap();

    account.apply(|a| a.balance = -1).unwrap();
    account.apply(|a| a.balance = 11).unwrap();
    assert_eq!(runtime.violation_count(), 2);
    assert_eq!(account.into_inner().balance, 11);
}

#[test]
fn test_try_apply_skips_invariants_on_error() {
    let runtime = runtime(EnforcementMode::Strict);
    let mut account = Guarded::new(
        Account { balance: 10, limit: 100 },
        account_invariants(),
        runtime.clone(),
    )
    .unwrap();

    let result: Result<(), CallError<String>> = account.try_apply(|a| {
        a.balance = -100;
        Err("insufficient funds".to_string())
    });

    assert_eq!(
        result.unwrap_err().operation_error().map(String::as_str),
        Some("insufficient funds")
    );
    assert!(!runtime.has_violations());
}

#[test]
fn test_try_apply_reports_contract_failure() {
    let mut account = Guarded::new(
        Account { balance: 10, limit: 100 },
        account_invariants(),
        runtime(EnforcementMode::Strict),
    )
    .unwrap();

    let result = account.try_apply(|a| {
        a.balance = -1;
        Ok::<_, String>(())
    });
    assert!(result.unwrap_err().is_contract());
}

#[test]
fn test_fallible_invariant() {
    let invariants = Invariants::new().holds_fallible(|a: &Account| {
        if a.limit == 0 {
            bail!("limit not configured");
        }
        Ok(a.balance <= a.limit)
    });

    let err = Guarded::new(
        Account { balance: 0, limit: 0 },
        invariants,
        runtime(EnforcementMode::Strict),
    )
    .unwrap_err();
    assert_eq!(
        err.violation().unwrap().message(),
        "Invariant 1 raised error: limit not configured"
    );
}

#[test]
fn test_skip_mode_never_checks() {
    let mut account = Guarded::new(
        Account { balance: -1, limit: 0 },
        account_invariants(),
        runtime(EnforcementMode::Skip),
    )
    .unwrap();
    assert!(account.apply(|a| a.balance = -100).is_ok());
    assert_eq!(account.invariants().len(), 2);
}
