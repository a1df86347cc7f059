//! Bot manager: the dependency-injected container for every configured
//! bot.
//!
//! There are no global registries; applications construct one manager,
//! register their bots, and pass references where needed.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::bot::Bot;
use crate::error::{RuntimeError, RuntimeResult};

/// Holds every configured bot and drives their lifecycles together.
#[derive(Default)]
pub struct BotManager {
    bots: RwLock<HashMap<String, Arc<Bot>>>,
}

impl BotManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a bot. Exactly one instance may exist per bot id.
    pub async fn register(&self, bot: Arc<Bot>) -> RuntimeResult<()> {
        let mut bots = self.bots.write().await;
        if bots.contains_key(bot.id()) {
            return Err(RuntimeError::BotExists(bot.id().to_string()));
        }
        debug!(bot_id = %bot.id(), "Registered bot");
        bots.insert(bot.id().to_string(), bot);
        Ok(())
    }

    /// Looks up a bot by id.
    pub async fn get(&self, id: &str) -> Option<Arc<Bot>> {
        self.bots.read().await.get(id).cloned()
    }

    /// All registered bot ids.
    pub async fn ids(&self) -> Vec<String> {
        self.bots.read().await.keys().cloned().collect()
    }

    /// The number of registered bots.
    pub async fn count(&self) -> usize {
        self.bots.read().await.len()
    }

    /// Deploys every active bot. A bot that fails to deploy is logged
    /// and skipped; the rest continue.
    pub async fn deploy_all(&self) {
        let bots: Vec<Arc<Bot>> = self.bots.read().await.values().cloned().collect();
        info!(count = bots.len(), "Deploying bots");

        for bot in bots {
            if !bot.config().active {
                debug!(bot_id = %bot.id(), "Bot is marked inactive, skipping deploy");
                continue;
            }
            if let Err(err) = bot.deploy().await {
                error!(bot_id = %bot.id(), error = %err, "Bot failed to deploy");
            }
        }
    }

    /// Shuts every bot down. Safe to call regardless of deployment
    /// state.
    pub async fn shutdown_all(&self) {
        let bots: Vec<Arc<Bot>> = self.bots.read().await.values().cloned().collect();
        info!(count = bots.len(), "Shutting bots down");

        for bot in bots {
            if let Err(err) = bot.shutdown().await {
                error!(bot_id = %bot.id(), error = %err, "Error during bot shutdown");
            }
        }
    }

    /// A snapshot of manager state.
    pub async fn stats(&self) -> ManagerStats {
        let bots = self.bots.read().await;
        let mut summoned = 0;
        for bot in bots.values() {
            if bot.is_summoned().await {
                summoned += 1;
            }
        }
        ManagerStats {
            total: bots.len(),
            summoned,
        }
    }
}

/// Statistics about the bot manager.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManagerStats {
    /// Registered bots.
    pub total: usize,
    /// Currently summoned bots.
    pub summoned: usize,
}

impl std::fmt::Display for ManagerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bots: {} total, {} summoned", self.total, self.summoned)
    }
}
