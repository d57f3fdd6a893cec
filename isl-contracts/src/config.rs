//! Enforcement configuration
//!
//! A [`ContractConfig`] decides what happens when a contract check fails.
//! It can be built in code, deserialized from JSON, or read from the
//! environment:
//!
//! | Variable                 | Field                |
//! |--------------------------|----------------------|
//! | `ISL_CONTRACT_MODE`      | `mode`               |
//! | `ISL_COLLECT_VIOLATIONS` | `collect_violations` |
//! | `ISL_MAX_VIOLATIONS`     | `max_violations`     |
//! | `ISL_LOG_VIOLATIONS`     | `log_violations`     |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::contract::ContractKind;
use crate::errors::{ContractError, ContractResult};

/// Default bound of the violation log
pub const DEFAULT_MAX_VIOLATIONS: usize = 100;

/// How contract violations are enforced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementMode {
    /// Log, collect and fail the call
    #[default]
    Strict,

    /// Log and collect, but let the call continue
    Warn,

    /// Do not evaluate contracts at all
    Skip,
}

impl EnforcementMode {
    /// All recognized modes
    pub const ALL: [EnforcementMode; 3] = [Self::Strict, Self::Warn, Self::Skip];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Warn => "warn",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for EnforcementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnforcementMode {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "warn" => Ok(Self::Warn),
            "skip" => Ok(Self::Skip),
            other => Err(ContractError::Configuration(format!(
                "invalid contract mode: '{}'",
                other
            ))),
        }
    }
}

/// What old-state capture does when a requested entity store is not registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingStorePolicy {
    /// Skip the store silently
    #[default]
    Skip,

    /// Skip the store and log a warning
    Warn,

    /// Fail the capture with `ContractError::StoreNotFound`
    Error,
}

/// Configuration for contract enforcement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Enforcement mode
    pub mode: EnforcementMode,

    /// Whether violations are kept for later inspection
    pub collect_violations: bool,

    /// Maximum number of violations kept; further ones are dropped
    pub max_violations: usize,

    /// Whether each violation is emitted as a log record
    pub log_violations: bool,

    /// Check preconditions
    pub enable_preconditions: bool,

    /// Check postconditions
    pub enable_postconditions: bool,

    /// Check invariants
    pub enable_invariants: bool,

    /// Behavior when capture names an unregistered store
    pub missing_store: MissingStorePolicy,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            mode: EnforcementMode::Strict,
            collect_violations: false,
            max_violations: DEFAULT_MAX_VIOLATIONS,
            log_violations: true,
            enable_preconditions: true,
            enable_postconditions: true,
            enable_invariants: true,
            missing_store: MissingStorePolicy::Skip,
        }
    }
}

impl ContractConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> ContractResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            ContractError::Configuration(format!("invalid contract configuration: {}", e))
        })
    }

    /// Build a configuration from the process environment
    pub fn from_env() -> ContractResult<Self> {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an environment-like lookup
    pub fn with_env<F>(mut self, lookup: F) -> ContractResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup("ISL_CONTRACT_MODE") {
            self.mode = mode.trim().parse()?;
        }
        if let Some(collect) = lookup("ISL_COLLECT_VIOLATIONS") {
            self.collect_violations = parse_flag("ISL_COLLECT_VIOLATIONS", &collect)?;
        }
        if let Some(max) = lookup("ISL_MAX_VIOLATIONS") {
            self.max_violations = max.trim().parse().map_err(|_| {
                ContractError::Configuration(format!(
                    "ISL_MAX_VIOLATIONS must be a non-negative integer, got '{}'",
                    max
                ))
            })?;
        }
        if let Some(log) = lookup("ISL_LOG_VIOLATIONS") {
            self.log_violations = parse_flag("ISL_LOG_VIOLATIONS", &log)?;
        }
        Ok(self)
    }

    /// Check whether conditions of this kind are evaluated at all
    pub fn is_enabled(&self, kind: ContractKind) -> bool {
        if self.mode == EnforcementMode::Skip {
            return false;
        }
        match kind {
            ContractKind::Precondition => self.enable_preconditions,
            ContractKind::Postcondition => self.enable_postconditions,
            ContractKind::Invariant => self.enable_invariants,
        }
    }
}

fn parse_flag(name: &str, raw: &str) -> ContractResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ContractError::Configuration(format!(
            "{} must be a boolean, got '{}'",
            name, raw
        ))),
    }
}
