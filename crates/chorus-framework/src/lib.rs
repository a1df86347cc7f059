//! # Chorus Framework
//!
//! The message-to-command pipeline of the Chorus chat-bot framework.
//!
//! Everything between a built Resonance and an executed command lives
//! here:
//!
//! - **Commands**: singleton definitions, the per-bot registry, and the
//!   pluggable executor traits ([`Command`], [`CommandRegistry`],
//!   [`CommandExecutor`], [`ClientHandler`])
//! - **Interpreter**: prefix resolution and invocation parsing into an
//!   [`Instruction`]
//! - **Authorizer**: the single-use permission, blacklist, and cooldown
//!   gate ([`CommandAuthorizer`], [`Warrant`])
//! - **Cooldowns**: keyed expiry records with passive expiry
//!   ([`CooldownManager`])
//! - **Prompts**: time-boxed, resumable conversational waits
//!   ([`PromptHub`], [`PromptInfo`])
//! - **Listeners**: the concurrent, failure-isolated fan-out from one
//!   Resonance to everything that reacts to it ([`ListenerDispatcher`],
//!   [`CommandListener`])
//!
//! ## Pipeline
//!
//! ```text
//! Resonance ──▶ Interpreter ──▶ Instruction ──▶ Authorizer ──▶ execute
//!     │                                            │              │
//!     └──▶ active Prompts (racing, in parallel)    └─ denial      └─▶ arm
//!                                                     notices        cooldowns
//! ```

pub mod authorizer;
pub mod command;
pub mod cooldown;
pub mod error;
pub mod instruction;
pub mod interpreter;
pub mod listener;
pub mod prompt;

#[cfg(test)]
pub(crate) mod testkit;

pub use authorizer::{CommandAuthorizer, DenialReason, Warrant};
pub use command::{
    AccessList, ArgValue, ClientHandler, Command, CommandBuilder, CommandClientConfig,
    CommandConfig, CommandContext, CommandExecutor, CommandRegistry, CooldownConfig, ParsedArgs,
    parse_args, shell_split,
};
pub use cooldown::{CATEGORY_COMMAND, CooldownManager, CooldownScope};
pub use error::{FrameworkError, FrameworkResult, PromptError};
pub use instruction::{Instruction, InstructionConfig};
pub use interpreter::Interpreter;
pub use listener::{BoxedListener, CommandListener, Listener, ListenerDispatcher};
pub use prompt::{
    DEFAULT_TIME_LIMIT, ErrorCallback, Prompt, PromptCondition, PromptHub, PromptInfo,
    PromptResolution, ResponseCallback,
};
