//! Unified error types for the Chorus core crate.
//!
//! This module provides standardized error types used across core components.
//! Pipeline-level errors (authorization, prompts) are defined in
//! chorus-framework.

use thiserror::Error;

use crate::client::ClientType;

// =============================================================================
// Client Errors
// =============================================================================

/// Errors that can occur in client adapter operations.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Authentication against the chat platform failed.
    #[error("authentication failed for {client_type}: {reason}")]
    AuthenticationFailed {
        /// The client that failed to authenticate.
        client_type: ClientType,
        /// Reason for failure.
        reason: String,
    },

    /// The client is not connected.
    #[error("client {client_type} is not connected")]
    NotConnected {
        /// The disconnected client.
        client_type: ClientType,
    },

    /// Message send failed.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// User lookup failed.
    #[error("user '{id}' not found on {client_type}")]
    UserNotFound {
        /// The missing user id.
        id: String,
        /// The client that was queried.
        client_type: ClientType,
    },

    /// No client of this type is registered with the bot. This is a
    /// framework misconfiguration, not a recoverable condition.
    #[error("no client registered for type '{0}'")]
    UnsupportedClientType(String),

    /// Internal adapter error.
    #[error("client error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Creates an internal client error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

// =============================================================================
// Gestalt Errors
// =============================================================================

/// Errors that can occur in the persisted configuration store.
#[derive(Debug, Error)]
pub enum GestaltError {
    /// The path is empty or malformed.
    #[error("invalid gestalt path: '{0}'")]
    InvalidPath(String),

    /// A stored value could not be converted to the requested type.
    #[error("value at '{path}' does not match the expected shape: {reason}")]
    Shape {
        /// The path that was read.
        path: String,
        /// What went wrong during conversion.
        reason: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backing storage I/O failed.
    #[error("storage I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for GestaltError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for client adapter operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type for gestalt operations.
pub type GestaltResult<T> = Result<T, GestaltError>;
