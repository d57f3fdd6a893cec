//! Execution traces of contracted operations
//!
//! A trace records what happened during one or more contracted calls: the
//! call itself, every evaluated check and its outcome, and the return or
//! failure. Finished traces serialize to JSON so offline verification
//! tooling can replay them.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contract::ContractKind;

/// What a trace event describes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEventKind {
    /// A contracted operation was entered
    Call { operation: String, input: String },

    /// A contracted operation returned normally
    Return {
        operation: String,
        result: String,
        duration_ms: u64,
    },

    /// A contract condition was evaluated
    Check {
        category: ContractKind,
        index: usize,
        passed: bool,
        message: Option<String>,
    },

    /// A contracted operation failed, either in business logic or in a check
    Error { operation: String, message: String },
}

/// A single recorded event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: TraceEventKind,
}

/// Collects events until the trace is finished
#[derive(Debug)]
pub struct TraceRecorder {
    trace_id: String,
    domain: String,
    behavior: String,
    started_at: DateTime<Utc>,
    events: Vec<TraceEvent>,
}

impl TraceRecorder {
    pub fn new(domain: impl Into<String>, behavior: impl Into<String>) -> Self {
        Self {
            trace_id: format!("trace_{}", Uuid::new_v4()),
            domain: domain.into(),
            behavior: behavior.into(),
            started_at: Utc::now(),
            events: Vec::new(),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Append an event
    pub fn record(&mut self, kind: TraceEventKind) {
        let id = format!("evt_{}", self.events.len() + 1);
        self.events.push(TraceEvent {
            id,
            timestamp: Utc::now(),
            kind,
        });
    }

    pub fn call(&mut self, operation: &str, input: &dyn Debug) {
        self.record(TraceEventKind::Call {
            operation: operation.to_string(),
            input: format!("{:?}", input),
        });
    }

    pub fn ret(&mut self, operation: &str, result: &dyn Debug, duration_ms: u64) {
        self.record(TraceEventKind::Return {
            operation: operation.to_string(),
            result: format!("{:?}", result),
            duration_ms,
        });
    }

    pub fn check(&mut self, category: ContractKind, index: usize, passed: bool, message: Option<String>) {
        self.record(TraceEventKind::Check {
            category,
            index,
            passed,
            message,
        });
    }

    pub fn error(&mut self, operation: &str, message: impl Into<String>) {
        self.record(TraceEventKind::Error {
            operation: operation.to_string(),
            message: message.into(),
        });
    }

    /// Close the trace
    pub fn finish(self, passed: bool) -> ExecutionTrace {
        ExecutionTrace {
            id: self.trace_id,
            domain: self.domain,
            behavior: self.behavior,
            started_at: self.started_at,
            finished_at: Utc::now(),
            passed,
            events: self.events,
        }
    }
}

/// A finished trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub id: String,
    pub domain: String,
    pub behavior: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub passed: bool,
    pub events: Vec<TraceEvent>,
}

impl ExecutionTrace {
    /// Iterate over check events
    pub fn checks(&self) -> impl Iterator<Item = &TraceEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, TraceEventKind::Check { .. }))
    }

    /// Number of checks that did not pass
    pub fn failed_checks(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, TraceEventKind::Check { passed: false, .. }))
            .count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod trace_tests;
