//! Runtime enforcement state
//!
//! A [`ContractRuntime`] is the enforcement policy shared by every contracted
//! operation that composes it: the current [`ContractConfig`], the registry
//! of named entity stores, the bounded violation log and an optional
//! execution trace. It is constructed explicitly and passed (usually as an
//! `Arc`) to whatever needs it; tests build a fresh one instead of resetting
//! shared state.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::{
    config::{ContractConfig, EnforcementMode},
    contract::ContractKind,
    errors::{ContractError, ContractResult},
    store::EntityStore,
    trace::{ExecutionTrace, TraceRecorder},
    violation::Violation,
};

/// Enforcement policy and shared contract state
pub struct ContractRuntime {
    config: RwLock<ContractConfig>,
    stores: RwLock<FxHashMap<String, Arc<dyn EntityStore>>>,
    violations: Mutex<Vec<Violation>>,
    trace: Mutex<Option<TraceRecorder>>,
}

impl ContractRuntime {
    /// Create a runtime with the default configuration
    pub fn new() -> Self {
        Self::with_config(ContractConfig::default())
    }

    /// Create a runtime with a specific configuration
    pub fn with_config(config: ContractConfig) -> Self {
        Self {
            config: RwLock::new(config),
            stores: RwLock::new(FxHashMap::default()),
            violations: Mutex::new(Vec::new()),
            trace: Mutex::new(None),
        }
    }

    /// Get a copy of the current configuration
    pub fn config(&self) -> ContractConfig {
        self.config.read().clone()
    }

    /// Modify the configuration in place
    pub fn update_config(&self, update: impl FnOnce(&mut ContractConfig)) {
        update(&mut self.config.write());
    }

    /// Set the enforcement mode from its string form
    ///
    /// Fails with `ContractError::Configuration` for anything other than
    /// `"strict"`, `"warn"` or `"skip"`, leaving the current mode unchanged.
    pub fn set_mode(&self, mode: &str) -> ContractResult<()> {
        let mode = mode.parse()?;
        self.set_enforcement_mode(mode);
        Ok(())
    }

    /// Set the enforcement mode
    pub fn set_enforcement_mode(&self, mode: EnforcementMode) {
        debug!("Contract enforcement mode set to {}", mode);
        self.config.write().mode = mode;
    }

    /// Get the current enforcement mode
    pub fn mode(&self) -> EnforcementMode {
        self.config.read().mode
    }

    /// Check whether conditions of this kind are currently evaluated
    pub fn is_enabled(&self, kind: ContractKind) -> bool {
        self.config.read().is_enabled(kind)
    }

    /// Register an entity store, replacing any store with the same name
    pub fn register_store(&self, name: impl Into<String>, store: Arc<dyn EntityStore>) {
        let name = name.into();
        debug!("Registering entity store: {}", name);
        self.stores.write().insert(name, store);
    }

    /// Remove a store registration
    pub fn unregister_store(&self, name: &str) -> Option<Arc<dyn EntityStore>> {
        self.stores.write().remove(name)
    }

    /// Get a registered store by name
    pub fn store(&self, name: &str) -> Option<Arc<dyn EntityStore>> {
        self.stores.read().get(name).cloned()
    }

    /// Get the names of all registered stores, sorted
    pub fn store_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Enable or disable violation collection
    pub fn enable_violation_collection(&self, enabled: bool) {
        self.config.write().collect_violations = enabled;
    }

    /// Append a violation to the log
    ///
    /// Returns `true` if the violation was stored. Nothing is stored when
    /// collection is disabled or the log is full.
    pub fn record_violation(&self, violation: Violation) -> bool {
        let (collect, max) = {
            let config = self.config.read();
            (config.collect_violations, config.max_violations)
        };
        if !collect {
            return false;
        }

        let mut violations = self.violations.lock();
        if violations.len() >= max {
            trace!("Violation log full ({} entries), dropping violation", max);
            return false;
        }
        violations.push(violation);
        true
    }

    /// Route a violation through the enforcement policy
    ///
    /// - `skip`: nothing happens
    /// - `warn`: logged and collected (if enabled), then `Ok`
    /// - `strict`: logged and collected (if enabled), then returned as the
    ///   matching `ContractError`
    pub fn handle_violation(&self, violation: Violation) -> ContractResult<()> {
        let (mode, log) = {
            let config = self.config.read();
            (config.mode, config.log_violations)
        };

        if mode == EnforcementMode::Skip {
            return Ok(());
        }

        if log {
            warn!(
                kind = %violation.kind(),
                expression = violation.expression().unwrap_or(""),
                "Contract violation: {}",
                violation
            );
        }

        match mode {
            EnforcementMode::Strict => {
                self.record_violation(violation.clone());
                Err(ContractError::from_violation(violation))
            }
            _ => {
                warn!(
                    target: "isl_contracts::diagnostic",
                    "{} violated, continuing in warn mode: {}",
                    violation.kind(),
                    violation.message()
                );
                self.record_violation(violation);
                Ok(())
            }
        }
    }

    /// Get all collected violations
    pub fn violations(&self) -> Vec<Violation> {
        self.violations.lock().clone()
    }

    /// Number of collected violations
    pub fn violation_count(&self) -> usize {
        self.violations.lock().len()
    }

    /// Check if any violations were collected
    pub fn has_violations(&self) -> bool {
        !self.violations.lock().is_empty()
    }

    /// Discard collected violations
    pub fn clear_violations(&self) {
        self.violations.lock().clear();
    }

    /// Restore the default state
    ///
    /// Resets the configuration and discards registered stores, collected
    /// violations and any running trace.
    pub fn reset(&self) {
        debug!("Resetting contract runtime");
        *self.config.write() = ContractConfig::default();
        self.stores.write().clear();
        self.violations.lock().clear();
        *self.trace.lock() = None;
    }

    /// Start recording an execution trace, replacing any running one
    ///
    /// Returns the id of the new trace.
    pub fn start_trace(&self, domain: impl Into<String>, behavior: impl Into<String>) -> String {
        let recorder = TraceRecorder::new(domain, behavior);
        let id = recorder.trace_id().to_string();
        *self.trace.lock() = Some(recorder);
        id
    }

    /// Check if a trace is being recorded
    pub fn is_tracing(&self) -> bool {
        self.trace.lock().is_some()
    }

    /// Stop recording and return the finished trace
    pub fn finish_trace(&self, passed: bool) -> Option<ExecutionTrace> {
        self.trace.lock().take().map(|recorder| recorder.finish(passed))
    }

    /// Run `f` against the running trace, if any
    pub(crate) fn with_trace(&self, f: impl FnOnce(&mut TraceRecorder)) {
        if let Some(recorder) = self.trace.lock().as_mut() {
            f(recorder);
        }
    }
}

impl Default for ContractRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ContractRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractRuntime")
            .field("config", &*self.config.read())
            .field("stores", &self.store_names())
            .field("violations", &self.violation_count())
            .field("tracing", &self.is_tracing())
            .finish()
    }
}
