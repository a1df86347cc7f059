//! # Chorus Runtime
//!
//! The orchestration layer of the Chorus chat-bot framework: bot
//! lifecycle, multi-bot management, configuration loading, and logging
//! setup.
//!
//! ```rust,ignore
//! use chorus_runtime::{Bot, BotManager, ConfigLoader, logging};
//!
//! let config = ConfigLoader::new().load()?;
//! logging::init_from_config(&config.logging);
//!
//! let manager = BotManager::new();
//! for bot_config in config.bots {
//!     let bot = Bot::builder(bot_config, Arc::clone(&gestalt))
//!         .registry(registry())
//!         .client(discord_client())
//!         .build();
//!     manager.register(bot).await?;
//! }
//! manager.deploy_all().await;
//! ```
//!
//! Platform adapters stay outside this crate: they implement the
//! `chorus_core::Client` trait and feed raw messages into
//! [`Bot::hear`].

pub mod bot;
pub mod config;
pub mod error;
pub mod logging;
pub mod manager;

#[cfg(test)]
pub(crate) mod testkit;

pub use bot::{Bot, BotActiveConfig, BotBuilder, ClientActiveConfig};
pub use config::{BotClientConfig, BotConfig, ChorusConfig, ConfigLoader, LogFormat, LoggingConfig};
pub use error::{ConfigError, ConfigResult, RuntimeError, RuntimeResult};
pub use manager::{BotManager, ManagerStats};
