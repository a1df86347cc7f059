//! Configuration loading and schema.

pub mod loader;
pub mod schema;

pub use loader::{ConfigLoader, Profile};
pub use schema::{BotClientConfig, BotConfig, ChorusConfig, LogFormat, LoggingConfig};
