//! Runtime error types.

use std::path::PathBuf;

use thiserror::Error;

use chorus_core::{ClientError, ClientType, GestaltError};
use chorus_framework::FrameworkError;

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The requested configuration file does not exist.
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// The configuration could not be parsed or extracted.
    #[error("configuration parse error: {0}")]
    ParseError(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur during bot lifecycle operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A client's secret environment variable is missing. The bot is
    /// not deployed; other bots continue.
    #[error("bot '{bot_id}' is missing secret '{variable}' for client {client_type}")]
    MissingSecret {
        /// The affected bot.
        bot_id: String,
        /// The client needing the secret.
        client_type: ClientType,
        /// The environment variable that was expected.
        variable: String,
    },

    /// A message arrived for a client type the bot never registered.
    /// This is a framework misconfiguration.
    #[error("bot '{bot_id}' has no client of type {client_type}")]
    UnregisteredClient {
        /// The affected bot.
        bot_id: String,
        /// The unknown client type.
        client_type: ClientType,
    },

    /// A bot with this id is already registered.
    #[error("bot already registered: {0}")]
    BotExists(String),

    /// Bot not found.
    #[error("bot not found: {0}")]
    BotNotFound(String),

    /// Client adapter failure.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Pipeline failure.
    #[error(transparent)]
    Framework(#[from] FrameworkError),

    /// Configuration store failure.
    #[error(transparent)]
    Gestalt(#[from] GestaltError),

    /// Configuration loading failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
