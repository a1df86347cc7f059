//! # Chorus Core
//!
//! Foundation layer of the Chorus chat-bot framework.
//!
//! This crate provides the building blocks shared by every other Chorus
//! crate:
//!
//! - **Client abstraction**: the per-platform adapter trait and the small
//!   identity/context types that flow with every message ([`Client`],
//!   [`ClientUser`], [`Origin`], [`Privacy`])
//! - **Resonance**: the normalized inbound message plus its resolved
//!   context, built once per message by the [`ResonanceFactory`]
//! - **Gestalt**: the persisted hierarchical configuration interface with
//!   in-memory and file-backed implementations ([`Gestalt`],
//!   [`MemoryGestalt`], [`FileGestalt`], [`ConfigResolver`])
//! - **Eminence**: the totally-ordered permission ladder
//! - **Talent**: the pluggable feature-bundle trait and client allow-lists
//!
//! ## Message flow
//!
//! ```text
//! ┌──────────────┐    ┌───────────────────┐    ┌────────────────────┐
//! │ ClientAdapter│───▶│ ResonanceFactory  │───▶│ Listeners + Prompts│
//! │ (external)   │    │ origin→locale→    │    │ (chorus-framework) │
//! └──────────────┘    │ privacy, once     │    └────────────────────┘
//!                     └───────────────────┘
//! ```
//!
//! The pipeline on top of these types — command interpretation,
//! authorization, cooldowns, prompts — lives in `chorus-framework`; bot
//! lifecycle and configuration loading live in `chorus-runtime`.

pub mod client;
pub mod eminence;
pub mod error;
pub mod gestalt;
pub mod resonance;
pub mod talent;

pub use client::{
    BoxedClient, Client, ClientType, ClientUser, Destination, Origin, Privacy, RawMessage,
};
pub use eminence::Eminence;
pub use error::{ClientError, ClientResult, GestaltError, GestaltResult};
pub use gestalt::{
    BoxedGestalt, ConfigResolver, FileGestalt, Gestalt, MemoryGestalt, deep_merge,
};
pub use resonance::{Resonance, ResonanceFactory};
pub use talent::{BoxedTalent, ClientAllowList, Talent};
