//! Configuration schema definitions.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChorusConfig {
    /// Logging setup.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Individual bot configurations.
    #[serde(default)]
    pub bots: Vec<BotConfig>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human-oriented output.
    #[default]
    Pretty,
    /// Single-line output for log collectors.
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Optional log file. When set, output goes to this file instead of
    /// stderr.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration for one bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Unique identifier for this bot.
    pub id: String,

    /// Human-readable name.
    #[serde(default)]
    pub name: Option<String>,

    /// The bot-wide default command prefix, used when no channel or
    /// client override is persisted.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// The bot-wide default locale.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Whether this bot should be deployed at all.
    #[serde(default = "default_true")]
    pub active: bool,

    /// Per-client sections, keyed by client-type tag ("discord",
    /// "twitch", "slack").
    #[serde(default)]
    pub clients: HashMap<String, BotClientConfig>,
}

impl BotConfig {
    /// A minimal configuration for the given id, useful in tests and
    /// programmatic setups.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            command_prefix: default_command_prefix(),
            locale: default_locale(),
            active: true,
            clients: HashMap::new(),
        }
    }
}

/// Per-client section of a bot's configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BotClientConfig {
    /// The privileged end-user ("Joker"/architect) for this bot on this
    /// client, resolved to a full identity during deploy.
    #[serde(default)]
    pub joker: Option<String>,

    /// The environment variable holding this client's platform secret.
    /// Deploy fails fast for this bot when the variable is unset.
    #[serde(default)]
    pub secret_env: Option<String>,
}

fn default_command_prefix() -> String {
    ".".to_string()
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_true() -> bool {
    true
}
