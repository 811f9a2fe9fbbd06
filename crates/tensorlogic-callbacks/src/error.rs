//! Error types for callback operations.

use crate::Hook;
use thiserror::Error;

/// Errors that can occur while dispatching or sequencing callbacks.
#[derive(Error, Debug)]
pub enum CallbackError {
    /// A registered callback failed inside a hook.
    #[error("Callback '{callback}' failed in {hook}: {source}")]
    Hook {
        /// Hook that was being dispatched.
        hook: Hook,
        /// Name reported by the failing callback.
        callback: String,
        /// Error returned by the callback.
        #[source]
        source: Box<CallbackError>,
    },

    /// Error raised by user hook code.
    #[error("Callback error: {0}")]
    Failed(String),

    /// The driver invoked a hook out of order.
    #[error("Contract violation in {hook}: {reason}")]
    ContractViolation {
        /// Hook whose invocation broke the call sequence.
        hook: Hook,
        /// What was expected instead.
        reason: String,
    },

    /// Invalid training parameters.
    #[error("Invalid training parameters: {0}")]
    InvalidParams(String),

    /// Error with an invalid model parameter.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The model does not support the requested operation.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Error in configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// I/O error while reading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CallbackError {
    /// Create an error from user hook code.
    pub fn failed(message: impl Into<String>) -> Self {
        CallbackError::Failed(message.into())
    }

    /// Innermost error, looking through `Hook` wrappers.
    pub fn root(&self) -> &CallbackError {
        match self {
            CallbackError::Hook { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error (or its root) is a contract violation.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self.root(), CallbackError::ContractViolation { .. })
    }
}

/// Result type for callback operations.
pub type CallbackResult<T> = Result<T, CallbackError>;
