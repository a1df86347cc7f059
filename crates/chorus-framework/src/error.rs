//! Pipeline error types.
//!
//! Denials are not errors: the authorizer returns them as values. Errors
//! here are the conditions that should reach an operator — malformed
//! configuration, store failures, executor failures — plus the closed set
//! of prompt outcomes delivered through `on_error` callbacks.

use thiserror::Error;

use chorus_core::{ClientError, GestaltError};

/// Errors that can occur in the message-to-command pipeline.
#[derive(Debug, Error)]
pub enum FrameworkError {
    /// An invocation used an argument key the command never declared.
    /// This is a configuration defect, surfaced loudly rather than
    /// silently ignored.
    #[error("command '{command}' has no declared option '{key}'")]
    UnknownOption {
        /// The command that was invoked.
        command: String,
        /// The undeclared argument key.
        key: String,
    },

    /// Configuration store failure.
    #[error(transparent)]
    Gestalt(#[from] GestaltError),

    /// Client adapter failure.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A command executor failed.
    #[error("command execution failed: {0}")]
    Execution(String),
}

/// Result type for pipeline operations.
pub type FrameworkResult<T> = Result<T, FrameworkError>;

/// The closed set of prompt outcomes delivered through `on_error`.
///
/// These never escape a `prompt()` call as anything else: the pending
/// result rejects with exactly one of these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PromptError {
    /// No matching response arrived within the time limit.
    #[error("no response arrived within the time limit")]
    NoResponse,

    /// The bounded reset count was exhausted.
    #[error("maximum prompt resets exceeded")]
    MaxResetExceeded,

    /// A response arrived but was rejected by the caller.
    #[error("invalid response")]
    InvalidResponse,
}
