//! Command definitions, configuration, and the per-bot registry.
//!
//! A [`Command`] is a singleton definition shared by every invocation: key,
//! aliases, allow-lists, base configuration, and executors. All
//! per-invocation state lives on the [`Instruction`](crate::Instruction) —
//! a Command carries nothing mutable, so concurrent invocations can never
//! corrupt one another.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use chorus_core::{BoxedGestalt, BoxedTalent, ClientAllowList, ClientType, Eminence, Talent};

use crate::cooldown::CooldownManager;
use crate::error::FrameworkResult;
use crate::instruction::Instruction;
use crate::prompt::PromptHub;

pub mod args;

pub use args::{ArgValue, ParsedArgs, parse_args, shell_split};

// =============================================================================
// Configuration
// =============================================================================

/// Cooldown durations for one command, in seconds. Zero disables the
/// corresponding scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownConfig {
    /// Per-user cooldown.
    #[serde(default)]
    pub user_secs: u64,
    /// Command-wide cooldown shared by everyone.
    #[serde(default)]
    pub global_secs: u64,
}

/// Base configuration of a command, set once at registration and
/// overridable per bot through the gestalt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Whether the command is administratively active.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum eminence required to invoke.
    #[serde(default)]
    pub required_eminence: Eminence,

    /// Whether at least one positional argument must be supplied.
    #[serde(default)]
    pub requires_input: bool,

    /// Whether the command may be invoked from a direct message.
    #[serde(default = "default_true")]
    pub allow_direct: bool,

    /// Cooldown durations.
    #[serde(default)]
    pub cooldown: CooldownConfig,

    /// The option keys this command declares. An invocation using any
    /// other key is a hard configuration error.
    #[serde(default)]
    pub options: Vec<String>,

    /// When set, users at or above this eminence skip cooldown checks.
    #[serde(default)]
    pub cooldown_exempt_eminence: Option<Eminence>,
}

fn default_true() -> bool {
    true
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            required_eminence: Eminence::None,
            requires_input: false,
            allow_direct: true,
            cooldown: CooldownConfig::default(),
            options: Vec::new(),
            cooldown_exempt_eminence: None,
        }
    }
}

/// Per-scope access lists used by blacklists and whitelists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessList {
    /// User ids.
    #[serde(default)]
    pub users: Vec<String>,
    /// Channel ids.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Community (guild/workspace) ids.
    #[serde(default)]
    pub communities: Vec<String>,
}

/// Client-specific overrides for one command, persisted per bot and
/// client under the gestalt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandClientConfig {
    /// Deactivates the command on this client when false.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Who may never invoke, and where the command may never run.
    #[serde(default)]
    pub blacklist: AccessList,

    /// Who may still invoke a deactivated command, and where.
    #[serde(default)]
    pub whitelist: AccessList,

    /// Overrides the base cooldown when present.
    #[serde(default)]
    pub cooldown: Option<CooldownConfig>,

    /// Overrides the base required eminence when present.
    #[serde(default)]
    pub required_eminence: Option<Eminence>,

    /// Overrides the base direct-message policy when present.
    #[serde(default)]
    pub allow_direct: Option<bool>,
}

impl Default for CommandClientConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            blacklist: AccessList::default(),
            whitelist: AccessList::default(),
            cooldown: None,
            required_eminence: None,
            allow_direct: None,
        }
    }
}

// =============================================================================
// Executors
// =============================================================================

/// Everything a command executor may reach beyond its instruction:
/// the configuration store, the prompt hub for multi-turn interactions,
/// and the cooldown manager.
///
/// Passed explicitly — there are no global registries to import.
#[derive(Clone)]
pub struct CommandContext {
    /// The persisted configuration store.
    pub gestalt: BoxedGestalt,
    /// Outstanding conversational prompts for the owning bot.
    pub prompts: Arc<PromptHub>,
    /// Active cooldown records for the owning bot.
    pub cooldowns: Arc<CooldownManager>,
}

/// The pluggable unit of command behavior.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Runs the command for one authorized instruction.
    async fn execute(&self, instruction: &Instruction, ctx: &CommandContext)
    -> FrameworkResult<()>;
}

/// Client-specific command behavior, registered per [`ClientType`] and
/// fired on demand via [`Command::fire_client_handlers`].
#[async_trait]
pub trait ClientHandler: Send + Sync {
    /// Runs the client-specific part of a command with caller-supplied
    /// data.
    async fn execute(
        &self,
        instruction: &Instruction,
        data: &Value,
        ctx: &CommandContext,
    ) -> FrameworkResult<()>;
}

// =============================================================================
// Command
// =============================================================================

/// A command definition: one instance per key, shared across invocations.
pub struct Command {
    key: String,
    aliases: Vec<String>,
    description: String,
    clients: ClientAllowList,
    talent: Option<String>,
    config: CommandConfig,
    executor: Arc<dyn CommandExecutor>,
    client_handlers: HashMap<ClientType, Arc<dyn ClientHandler>>,
}

impl Command {
    /// Starts building a command with the given key and executor.
    pub fn builder(key: impl Into<String>, executor: Arc<dyn CommandExecutor>) -> CommandBuilder {
        CommandBuilder {
            key: key.into(),
            aliases: Vec::new(),
            description: String::new(),
            clients: ClientAllowList::Any,
            talent: None,
            config: CommandConfig::default(),
            executor,
            client_handlers: HashMap::new(),
        }
    }

    /// The primary key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Alternate invocation tokens.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Which clients this command is permitted on.
    pub fn clients(&self) -> &ClientAllowList {
        &self.clients
    }

    /// The owning talent's machine name, if any.
    pub fn talent(&self) -> Option<&str> {
        self.talent.as_deref()
    }

    /// The in-code base configuration.
    pub fn base_config(&self) -> &CommandConfig {
        &self.config
    }

    /// Whether `token` matches the key or an alias, case-insensitively.
    pub fn matches(&self, token: &str) -> bool {
        let token = token.to_lowercase();
        self.key.to_lowercase() == token
            || self.aliases.iter().any(|alias| alias.to_lowercase() == token)
    }

    /// Runs the primary executor.
    pub async fn execute(
        &self,
        instruction: &Instruction,
        ctx: &CommandContext,
    ) -> FrameworkResult<()> {
        self.executor.execute(instruction, ctx).await
    }

    /// Fires the handler registered for the instruction's client type,
    /// if any. Returns whether a handler ran.
    pub async fn fire_client_handlers(
        &self,
        instruction: &Instruction,
        data: &Value,
        ctx: &CommandContext,
    ) -> FrameworkResult<bool> {
        match self
            .client_handlers
            .get(&instruction.resonance().client_type())
        {
            Some(handler) => {
                handler.execute(instruction, data, ctx).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("key", &self.key)
            .field("aliases", &self.aliases)
            .field("talent", &self.talent)
            .finish()
    }
}

/// Builder for [`Command`].
pub struct CommandBuilder {
    key: String,
    aliases: Vec<String>,
    description: String,
    clients: ClientAllowList,
    talent: Option<String>,
    config: CommandConfig,
    executor: Arc<dyn CommandExecutor>,
    client_handlers: HashMap<ClientType, Arc<dyn ClientHandler>>,
}

impl CommandBuilder {
    /// Adds an alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Restricts the command to specific clients.
    pub fn clients(mut self, clients: ClientAllowList) -> Self {
        self.clients = clients;
        self
    }

    /// Declares the owning talent.
    pub fn talent(mut self, talent: impl Into<String>) -> Self {
        self.talent = Some(talent.into());
        self
    }

    /// Sets the base configuration.
    pub fn config(mut self, config: CommandConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a client-specific handler.
    pub fn client_handler(
        mut self,
        client_type: ClientType,
        handler: Arc<dyn ClientHandler>,
    ) -> Self {
        self.client_handlers.insert(client_type, handler);
        self
    }

    /// Finishes the command.
    pub fn build(self) -> Arc<Command> {
        Arc::new(Command {
            key: self.key,
            aliases: self.aliases,
            description: self.description,
            clients: self.clients,
            talent: self.talent,
            config: self.config,
            executor: self.executor,
            client_handlers: self.client_handlers,
        })
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Maps command keys and aliases to definitions for one bot, together
/// with the talents those commands belong to.
///
/// Built during startup, then shared immutably.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<Command>>,
    aliases: HashMap<String, String>,
    talents: HashMap<String, BoxedTalent>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command under its key and aliases.
    ///
    /// Duplicate keys or aliases are logged and the later registration
    /// loses — the earlier command stays reachable.
    pub fn register(&mut self, command: Arc<Command>) {
        let key = command.key().to_lowercase();
        if self.commands.contains_key(&key) {
            warn!(command = %key, "Duplicate command key, keeping the first registration");
            return;
        }
        for alias in command.aliases() {
            let alias = alias.to_lowercase();
            if self.aliases.contains_key(&alias) || self.commands.contains_key(&alias) {
                warn!(command = %key, alias = %alias, "Duplicate alias, skipping");
                continue;
            }
            self.aliases.insert(alias, key.clone());
        }
        self.commands.insert(key, command);
    }

    /// Registers a talent.
    pub fn register_talent(&mut self, talent: BoxedTalent) {
        self.talents
            .insert(talent.machine_name().to_string(), talent);
    }

    /// Resolves a token to a command, case-insensitively, by key or alias.
    pub fn resolve(&self, token: &str) -> Option<Arc<Command>> {
        let token = token.to_lowercase();
        if let Some(command) = self.commands.get(&token) {
            return Some(Arc::clone(command));
        }
        self.aliases
            .get(&token)
            .and_then(|key| self.commands.get(key))
            .map(Arc::clone)
    }

    /// Looks up a talent by machine name.
    pub fn talent(&self, name: &str) -> Option<&BoxedTalent> {
        self.talents.get(name)
    }

    /// Iterates over all registered talents.
    pub fn talents(&self) -> impl Iterator<Item = &BoxedTalent> {
        self.talents.values()
    }

    /// Whether both the command's and its owning talent's allow-lists
    /// permit `client_type`. A command without a talent needs only its
    /// own list to permit.
    pub fn permits_client(&self, command: &Command, client_type: ClientType) -> bool {
        if !command.clients().permits(client_type) {
            return false;
        }
        match command.talent() {
            Some(name) => match self.talents.get(name) {
                Some(talent) => talent.clients().permits(client_type),
                // The owning talent was never granted; play it safe.
                None => false,
            },
            None => true,
        }
    }

    /// The number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True when no commands are registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Iterates over all registered commands.
    pub fn commands(&self) -> impl Iterator<Item = &Arc<Command>> {
        self.commands.values()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.commands.len())
            .field("aliases", &self.aliases.len())
            .field("talents", &self.talents.len())
            .finish()
    }
}
