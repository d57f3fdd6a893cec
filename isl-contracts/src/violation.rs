//! Contract violation records

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use isl_core::Value;
use serde::{Deserialize, Serialize};

use crate::contract::ContractKind;

/// Contextual data attached to a violation
pub type ViolationContext = BTreeMap<String, Value>;

/// A record describing one failed contract check
///
/// Violations are built once by the verification engine and never change
/// afterwards: the builder methods consume `self`, and no field is public.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    kind: ContractKind,
    message: String,
    expression: Option<String>,
    expected: Option<Value>,
    actual: Option<Value>,
    context: ViolationContext,
    timestamp: DateTime<Utc>,
}

impl Violation {
    /// Create a new violation, stamped with the current time
    pub fn new(kind: ContractKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            expression: None,
            expected: None,
            actual: None,
            context: ViolationContext::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attach the source text of the failed expression
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    /// Attach the value the contract expected
    pub fn with_expected(mut self, expected: impl Into<Value>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    /// Attach the value that was actually observed
    pub fn with_actual(mut self, actual: impl Into<Value>) -> Self {
        self.actual = Some(actual.into());
        self
    }

    /// Replace the context map
    pub fn with_context(mut self, context: ViolationContext) -> Self {
        self.context = context;
        self
    }

    /// Add a single context entry
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> ContractKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    pub fn expected(&self) -> Option<&Value> {
        self.expected.as_ref()
    }

    pub fn actual(&self) -> Option<&Value> {
        self.actual.as_ref()
    }

    pub fn context(&self) -> &ViolationContext {
        &self.context
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(expression) = &self.expression {
            write!(f, " | Expression: {}", expression)?;
        }
        if !self.context.is_empty() {
            let context = serde_json::to_string(&self.context).map_err(|_| fmt::Error)?;
            write!(f, " | Context: {}", context)?;
        }
        Ok(())
    }
}
