//! The instruction interpreter.
//!
//! Scans a built Resonance for a command invocation: resolves the
//! effective prefix for the message's context, matches the command token
//! against the registry, checks client permission, parses arguments, and
//! assembles the [`Instruction`] with its merged configuration.
//!
//! "Not a command" is absence, never an error — the interpreter returns
//! `Ok(None)` for ordinary chatter.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use chorus_core::{BoxedGestalt, ConfigResolver, Gestalt, Resonance};

use crate::command::{CommandClientConfig, CommandRegistry, parse_args, shell_split};
use crate::error::FrameworkResult;
use crate::instruction::{Instruction, InstructionConfig};

/// Per-bot command interpreter.
#[derive(Clone)]
pub struct Interpreter {
    registry: Arc<CommandRegistry>,
    gestalt: BoxedGestalt,
    resolver: ConfigResolver,
    default_prefix: String,
}

impl Interpreter {
    /// Creates an interpreter over a bot's registry and store.
    pub fn new(
        registry: Arc<CommandRegistry>,
        gestalt: BoxedGestalt,
        default_prefix: impl Into<String>,
    ) -> Self {
        let resolver = ConfigResolver::new(Arc::clone(&gestalt));
        Self {
            registry,
            gestalt,
            resolver,
            default_prefix: default_prefix.into(),
        }
    }

    /// Resolves the effective command prefix for a message's context.
    ///
    /// Priority: channel-scope persisted override, then the client-level
    /// persisted prefix, then the bot default. First non-empty wins.
    pub async fn resolve_prefix(&self, resonance: &Resonance) -> FrameworkResult<String> {
        let bot = resonance.bot_id();
        let client = resonance.client_type().as_str();
        let channel = &resonance.origin().channel_id;

        let candidates = [
            format!("/bots/{bot}/clients/{client}/channels/{channel}/command_prefix"),
            format!("/bots/{bot}/clients/{client}/command_prefix"),
        ];

        for path in candidates {
            if let Some(Value::String(prefix)) = self.gestalt.get(&path).await?
                && !prefix.is_empty()
            {
                return Ok(prefix);
            }
        }
        Ok(self.default_prefix.clone())
    }

    /// Interprets a Resonance, returning the parsed instruction when the
    /// message is a well-formed, permitted command invocation.
    pub async fn interpret(
        &self,
        resonance: &Arc<Resonance>,
    ) -> FrameworkResult<Option<Instruction>> {
        let prefix = self.resolve_prefix(resonance).await?;
        let trimmed = resonance.content().trim();

        // Not prefixed, or nothing after the prefix: ordinary chatter.
        if !trimmed.starts_with(&prefix) || trimmed == prefix {
            return Ok(None);
        }

        // The command token may be glued to the prefix ("!ping") or
        // separated from it ("! ping"); both read the same.
        let after_prefix = trimmed
            .strip_prefix(&prefix)
            .unwrap_or(trimmed)
            .trim_start();
        let mut parts = after_prefix.splitn(2, char::is_whitespace);
        let token = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or_default().trim();
        if token.is_empty() {
            return Ok(None);
        }

        let Some(command) = self.registry.resolve(token) else {
            debug!(token = %token, "No command matches token");
            return Ok(None);
        };

        if !self
            .registry
            .permits_client(&command, resonance.client_type())
        {
            debug!(
                command = command.key(),
                client = %resonance.client_type(),
                "Command not permitted on this client"
            );
            return Ok(None);
        }

        let args = parse_args(&shell_split(rest));

        let bot = resonance.bot_id();
        let client = resonance.client_type().as_str();
        let key = command.key();
        let base = self
            .resolver
            .resolve(
                &format!("/bots/{bot}/commands/{key}/config"),
                command.base_config(),
            )
            .await?;
        let client_config: CommandClientConfig = self
            .resolver
            .resolve(
                &format!("/bots/{bot}/clients/{client}/commands/{key}/config"),
                &CommandClientConfig::default(),
            )
            .await?;

        Ok(Some(Instruction::new(
            Arc::clone(&command),
            Arc::clone(resonance),
            prefix,
            args,
            InstructionConfig {
                base,
                client: client_config,
            },
            rest.to_string(),
        )))
    }
}
