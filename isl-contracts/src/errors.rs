//! Contract-related error types

use thiserror::Error;

use crate::contract::ContractKind;
use crate::violation::Violation;

/// Main contract error type
#[derive(Error, Debug, Clone)]
pub enum ContractError {
    /// Invalid enforcement mode or unreadable configuration
    ///
    /// Raised regardless of the current mode: this is a programming error,
    /// not a contract violation.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Precondition violation (strict mode only)
    #[error("Precondition violated: {0}")]
    Precondition(Violation),

    /// Postcondition violation (strict mode only)
    #[error("Postcondition violated: {0}")]
    Postcondition(Violation),

    /// Invariant violation (strict mode only)
    #[error("Invariant violated: {0}")]
    Invariant(Violation),

    /// A required entity store is not registered
    #[error("Entity store not found: {0}")]
    StoreNotFound(String),
}

impl ContractError {
    /// Wrap a violation in the error variant matching its kind
    pub fn from_violation(violation: Violation) -> Self {
        match violation.kind() {
            ContractKind::Precondition => Self::Precondition(violation),
            ContractKind::Postcondition => Self::Postcondition(violation),
            ContractKind::Invariant => Self::Invariant(violation),
        }
    }

    /// Get the violation carried by this error, if any
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Self::Precondition(v) | Self::Postcondition(v) | Self::Invariant(v) => Some(v),
            Self::Configuration(_) | Self::StoreNotFound(_) => None,
        }
    }

    /// Get the contract kind if this error is a violation
    pub fn kind(&self) -> Option<ContractKind> {
        self.violation().map(Violation::kind)
    }

    /// Check if this error is a contract violation
    pub fn is_violation(&self) -> bool {
        self.violation().is_some()
    }
}

/// Failure of a contracted operation
///
/// Contract failures and failures of the wrapped business operation are
/// kept apart so callers can tell them apart.
#[derive(Error, Debug)]
pub enum CallError<E> {
    /// A contract check failed
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// The wrapped operation itself failed
    #[error("Operation failed: {0}")]
    Operation(E),
}

impl<E> CallError<E> {
    /// Check if this is a contract failure
    pub fn is_contract(&self) -> bool {
        matches!(self, Self::Contract(_))
    }

    /// Get the contract error, if this is one
    pub fn contract_error(&self) -> Option<&ContractError> {
        match self {
            Self::Contract(err) => Some(err),
            Self::Operation(_) => None,
        }
    }

    /// Get the business error, if this is one
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            Self::Operation(err) => Some(err),
            Self::Contract(_) => None,
        }
    }
}

/// Result type for contract operations
pub type ContractResult<T> = Result<T, ContractError>;
