//! # Chorus
//!
//! A multi-client chat-bot framework for Rust.
//!
//! Chorus connects one or more bot identities to several chat platforms
//! at once, normalizes everything they hear into a common representation
//! (the *Resonance*), detects and authorizes command invocations, and
//! supports stateful multi-turn interactions (*Prompts*) backed by a
//! persisted configuration store (the *Gestalt*).
//!
//! ## Crate layout
//!
//! - [`chorus_core`] — foundation: the client adapter trait, Resonance,
//!   Gestalt, Eminence, Talents
//! - [`chorus_framework`] — the pipeline: interpreter, authorizer,
//!   cooldowns, prompts, listener dispatch
//! - [`chorus_runtime`] — orchestration: the Bot aggregate, the bot
//!   manager, configuration loading, logging
//!
//! ## Example
//!
//! ```rust,ignore
//! use chorus::prelude::*;
//!
//! struct Ping;
//!
//! #[async_trait::async_trait]
//! impl CommandExecutor for Ping {
//!     async fn execute(&self, instruction: &Instruction, _ctx: &CommandContext)
//!         -> FrameworkResult<()>
//!     {
//!         instruction.resonance().reply("pong").await?;
//!         Ok(())
//!     }
//! }
//!
//! # async fn run(gestalt: BoxedGestalt, discord: BoxedClient) {
//! let mut registry = CommandRegistry::new();
//! registry.register(Command::builder("ping", std::sync::Arc::new(Ping)).build());
//!
//! let bot = Bot::builder(BotConfig::new("sigma"), gestalt)
//!     .registry(std::sync::Arc::new(registry))
//!     .client(discord)
//!     .build();
//! bot.deploy().await.unwrap();
//! # }
//! ```

pub use chorus_core::{
    BoxedClient, BoxedGestalt, BoxedTalent, Client, ClientAllowList, ClientError, ClientResult,
    ClientType, ClientUser, ConfigResolver, Destination, Eminence, FileGestalt, Gestalt,
    GestaltError, GestaltResult, MemoryGestalt, Origin, Privacy, RawMessage, Resonance,
    ResonanceFactory, Talent,
};
pub use chorus_framework::{
    AccessList, ArgValue, ClientHandler, Command, CommandAuthorizer, CommandClientConfig,
    CommandConfig, CommandContext, CommandExecutor, CommandRegistry, CooldownConfig,
    CooldownManager, CooldownScope, DenialReason, FrameworkError, FrameworkResult, Instruction,
    Interpreter, Listener, ListenerDispatcher, ParsedArgs, PromptError, PromptHub, PromptInfo,
    PromptResolution, Warrant,
};
pub use chorus_runtime::{
    Bot, BotConfig, BotManager, ChorusConfig, ConfigError, ConfigLoader, LoggingConfig,
    RuntimeError, RuntimeResult,
};

/// Prelude for common imports.
pub mod prelude {
    pub use chorus_core::{
        BoxedClient, BoxedGestalt, Client, ClientAllowList, ClientType, ClientUser, Destination,
        Eminence, Gestalt, MemoryGestalt, Origin, Privacy, RawMessage, Resonance,
    };
    pub use chorus_framework::{
        Command, CommandConfig, CommandContext, CommandExecutor, CommandRegistry, FrameworkResult,
        Instruction, Listener, PromptError, PromptInfo, PromptResolution, Warrant,
    };
    pub use chorus_runtime::{Bot, BotConfig, BotManager, ConfigLoader};
}
