//! Instruction: a parsed command invocation.
//!
//! Produced by the [`Interpreter`](crate::Interpreter) when a Resonance's
//! text carries a recognized command, consumed immediately by the
//! authorizer and the command's executor. Never persisted.

use std::sync::Arc;

use chorus_core::{Eminence, Resonance};

use crate::command::{Command, CommandClientConfig, CommandConfig, CooldownConfig, ParsedArgs};

/// The merged configuration view for one invocation: the effective base
/// command config plus the client-specific overrides, both already
/// resolved against the gestalt.
#[derive(Debug, Clone)]
pub struct InstructionConfig {
    /// Effective base configuration.
    pub base: CommandConfig,
    /// Effective client-specific overrides.
    pub client: CommandClientConfig,
}

impl InstructionConfig {
    /// Whether the command is active on this client.
    pub fn is_enabled(&self) -> bool {
        self.base.enabled && self.client.enabled
    }

    /// The cooldown in effect: the client override when present,
    /// otherwise the base.
    pub fn effective_cooldown(&self) -> CooldownConfig {
        self.client.cooldown.unwrap_or(self.base.cooldown)
    }

    /// The eminence required to invoke on this client.
    pub fn required_eminence(&self) -> Eminence {
        self.client
            .required_eminence
            .unwrap_or(self.base.required_eminence)
    }

    /// Whether direct-message invocation is permitted on this client.
    pub fn allow_direct(&self) -> bool {
        self.client.allow_direct.unwrap_or(self.base.allow_direct)
    }
}

/// A parsed command invocation, owned by the Resonance it came from.
pub struct Instruction {
    command: Arc<Command>,
    resonance: Arc<Resonance>,
    prefix: String,
    args: ParsedArgs,
    config: InstructionConfig,
    content: String,
}

impl Instruction {
    /// Assembles an instruction. Only the interpreter constructs these.
    pub(crate) fn new(
        command: Arc<Command>,
        resonance: Arc<Resonance>,
        prefix: String,
        args: ParsedArgs,
        config: InstructionConfig,
        content: String,
    ) -> Self {
        Self {
            command,
            resonance,
            prefix,
            args,
            config,
            content,
        }
    }

    /// The resolved command.
    pub fn command(&self) -> &Arc<Command> {
        &self.command
    }

    /// The message this invocation came from.
    pub fn resonance(&self) -> &Arc<Resonance> {
        &self.resonance
    }

    /// The prefix that introduced the invocation.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The parsed arguments.
    pub fn args(&self) -> &ParsedArgs {
        &self.args
    }

    /// The merged configuration for this invocation.
    pub fn config(&self) -> &InstructionConfig {
        &self.config
    }

    /// The raw text after the prefix and command token.
    pub fn content(&self) -> &str {
        &self.content
    }
}

impl std::fmt::Debug for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instruction")
            .field("command", &self.command.key())
            .field("prefix", &self.prefix)
            .field("args", &self.args)
            .finish()
    }
}
