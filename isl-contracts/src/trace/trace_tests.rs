use super::*;

#[test]
fn test_recorder_numbers_events() {
    let mut recorder = TraceRecorder::new("auth", "Login");
    recorder.call("Login", &"alice");
    recorder.check(ContractKind::Precondition, 1, true, None);
    recorder.ret("Login", &42, 3);

    let ids: Vec<&str> = recorder.events().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["evt_1", "evt_2", "evt_3"]);
    assert!(recorder.trace_id().starts_with("trace_"));
}

#[test]
fn test_call_and_return_use_debug() {
    let mut recorder = TraceRecorder::new("auth", "Login");
    recorder.call("Login", &Some(5));
    recorder.ret("Login", &vec![1, 2], 0);

    assert_eq!(
        recorder.events()[0].kind,
        TraceEventKind::Call {
            operation: "Login".to_string(),
            input: "Some(5)".to_string()
        }
    );
    assert_eq!(
        recorder.events()[1].kind,
        TraceEventKind::Return {
            operation: "Login".to_string(),
            result: "[1, 2]".to_string(),
            duration_ms: 0
        }
    );
}

#[test]
fn test_finish_counts_failed_checks() {
    let mut recorder = TraceRecorder::new("payments", "Transfer");
    recorder.check(ContractKind::Precondition, 1, true, None);
    recorder.check(ContractKind::Precondition, 2, false, Some("amount".to_string()));
    recorder.error("Transfer", "Precondition 2 failed");

    let trace = recorder.finish(false);
    assert_eq!(trace.checks().count(), 2);
    assert_eq!(trace.failed_checks(), 1);
    assert!(!trace.passed);
    assert!(trace.finished_at >= trace.started_at);
}

#[test]
fn test_trace_json_shape() {
    let mut recorder = TraceRecorder::new("payments", "Transfer");
    recorder.check(ContractKind::Postcondition, 1, false, None);
    let trace = recorder.finish(false);

    let json = trace.to_json().unwrap();
    assert!(json.contains(r#""type": "check""#));
    assert!(json.contains(r#""category": "postcondition""#));

    let restored = ExecutionTrace::from_json(&json).unwrap();
    assert_eq!(restored, trace);
}
