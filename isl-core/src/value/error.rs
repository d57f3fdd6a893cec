//! Error types for value operations

use std::fmt;

/// Error type for value operations
#[derive(Debug, Clone, PartialEq)]
pub enum ValueError {
    /// Type mismatch error
    TypeError {
        expected: &'static str,
        actual: &'static str,
    },

    /// Key not found in map or record
    KeyNotFound(String),

    /// Conversion error
    ConversionError {
        from: &'static str,
        to: &'static str,
        reason: String,
    },
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueError::TypeError { expected, actual } => {
                write!(f, "Type error: expected {}, got {}", expected, actual)
            }
            ValueError::KeyNotFound(key) => {
                write!(f, "Key not found: {}", key)
            }
            ValueError::ConversionError { from, to, reason } => {
                write!(f, "Cannot convert {} to {}: {}", from, to, reason)
            }
        }
    }
}

impl std::error::Error for ValueError {}

/// Result type for value operations
pub type ValueResult<T> = Result<T, ValueError>;
