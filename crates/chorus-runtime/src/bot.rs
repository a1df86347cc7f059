//! The Bot aggregate.
//!
//! A [`Bot`] owns everything one configured bot identity needs: its
//! clients, its command registry and listeners, its outstanding prompts,
//! its cooldowns, and its resolved Joker (architect) identities. Exactly
//! one instance exists per configured bot id.
//!
//! Lifecycle: `Built → {Deployed ↔ Shutdown}`. Both transitions are
//! idempotent — repeating one is a warning, never an error — and a bot
//! can be re-deployed after shutdown.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use chorus_core::{
    BoxedClient, BoxedGestalt, Client, ClientType, ClientUser, ConfigResolver, RawMessage,
    Resonance, ResonanceFactory, Talent,
};
use chorus_framework::{
    BoxedListener, CommandContext, CommandListener, CommandRegistry, CooldownManager,
    FrameworkResult, Interpreter, ListenerDispatcher, PromptHub,
};

use crate::config::BotConfig;
use crate::error::{RuntimeError, RuntimeResult};

/// The persisted bot-wide configuration surface, resolved on demand
/// against the in-code defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotActiveConfig {
    /// The bot-wide default command prefix.
    pub command_prefix: String,
    /// The bot-wide default locale.
    pub locale: String,
    /// Whether the bot should be deployed.
    pub active: bool,
}

/// The persisted per-client configuration surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientActiveConfig {
    /// Client-level command prefix override.
    pub command_prefix: Option<String>,
    /// The configured Joker/architect user id.
    pub joker: Option<String>,
}

/// One bot: the root aggregate of the framework.
pub struct Bot {
    id: String,
    config: BotConfig,
    gestalt: BoxedGestalt,
    resolver: ConfigResolver,
    factory: ResonanceFactory,
    interpreter: Interpreter,
    registry: Arc<CommandRegistry>,
    clients: HashMap<ClientType, BoxedClient>,
    dispatcher: ListenerDispatcher,
    context: Arc<CommandContext>,
    jokers: RwLock<HashMap<ClientType, ClientUser>>,
    summoned: RwLock<bool>,
}

impl Bot {
    /// Starts building a bot from its configuration and store.
    pub fn builder(config: BotConfig, gestalt: BoxedGestalt) -> BotBuilder {
        BotBuilder {
            config,
            gestalt,
            registry: None,
            clients: HashMap::new(),
            listeners: Vec::new(),
        }
    }

    /// The bot's unique identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The bot's static configuration.
    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Whether the bot is currently deployed.
    pub async fn is_summoned(&self) -> bool {
        *self.summoned.read().await
    }

    /// The execution context handed to command executors.
    pub fn context(&self) -> &Arc<CommandContext> {
        &self.context
    }

    /// The prompt hub for this bot.
    pub fn prompts(&self) -> &Arc<PromptHub> {
        &self.context.prompts
    }

    /// The cooldown manager for this bot.
    pub fn cooldowns(&self) -> &Arc<CooldownManager> {
        &self.context.cooldowns
    }

    /// The command registry for this bot.
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Looks up a connected client by type.
    pub fn client(&self, client_type: ClientType) -> Option<&BoxedClient> {
        self.clients.get(&client_type)
    }

    /// The resolved Joker/architect identity for a client, available
    /// after deploy.
    pub async fn joker(&self, client_type: ClientType) -> Option<ClientUser> {
        self.jokers.read().await.get(&client_type).cloned()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Deploys the bot: verifies secrets, authenticates every client,
    /// resolves Joker identities, and runs talent initialization.
    ///
    /// Deploying an already-summoned bot is a no-op with a warning. A
    /// failure leaves the bot not summoned and is reported to the
    /// caller; other bots are unaffected.
    pub async fn deploy(&self) -> RuntimeResult<()> {
        {
            let mut summoned = self.summoned.write().await;
            if *summoned {
                warn!(bot_id = %self.id, "Bot is already summoned");
                return Ok(());
            }
            *summoned = true;
        }

        let result = self.deploy_inner().await;
        if result.is_err() {
            *self.summoned.write().await = false;
        }
        result
    }

    async fn deploy_inner(&self) -> RuntimeResult<()> {
        // Fail fast before touching the network when a secret is absent.
        for (tag, client_config) in &self.config.clients {
            let Some(variable) = &client_config.secret_env else {
                continue;
            };
            if std::env::var(variable).is_err() {
                let Ok(client_type) = ClientType::from_str(tag) else {
                    warn!(bot_id = %self.id, tag = %tag, "Unknown client tag in configuration");
                    continue;
                };
                error!(
                    bot_id = %self.id,
                    client = %client_type,
                    variable = %variable,
                    "Missing client secret, bot will not deploy"
                );
                return Err(RuntimeError::MissingSecret {
                    bot_id: self.id.clone(),
                    client_type,
                    variable: variable.clone(),
                });
            }
        }

        for (client_type, client) in &self.clients {
            client.authenticate().await?;
            info!(bot_id = %self.id, client = %client_type, "Client authenticated");
        }

        for (client_type, client) in &self.clients {
            let Some(client_config) = self.config.clients.get(client_type.as_str()) else {
                continue;
            };
            let Some(joker_id) = &client_config.joker else {
                continue;
            };
            match client.get_user(joker_id).await {
                Ok(user) => {
                    self.jokers.write().await.insert(*client_type, user);
                }
                Err(err) => {
                    warn!(
                        bot_id = %self.id,
                        client = %client_type,
                        error = %err,
                        "Failed to resolve Joker identity"
                    );
                }
            }
        }

        for talent in self.registry.talents() {
            if let Err(err) = talent.initialize(&self.id, &self.gestalt).await {
                warn!(
                    bot_id = %self.id,
                    talent = talent.machine_name(),
                    error = %err,
                    "Talent initialization failed, skipping it for this bot"
                );
            }
        }

        info!(bot_id = %self.id, clients = self.clients.len(), "Bot summoned");
        Ok(())
    }

    /// Shuts the bot down: disables outstanding prompts and disconnects
    /// every client. A no-op with a warning when the bot was never
    /// deployed; re-deploying afterwards is fully supported.
    pub async fn shutdown(&self) -> RuntimeResult<()> {
        {
            let mut summoned = self.summoned.write().await;
            if !*summoned {
                warn!(bot_id = %self.id, "Bot is not summoned, nothing to shut down");
                return Ok(());
            }
            *summoned = false;
        }

        self.context.prompts.disable_all();

        for (client_type, client) in &self.clients {
            if let Err(err) = client.disconnect().await {
                warn!(
                    bot_id = %self.id,
                    client = %client_type,
                    error = %err,
                    "Error while disconnecting client"
                );
            }
        }

        info!(bot_id = %self.id, "Bot shut down");
        Ok(())
    }

    // =========================================================================
    // Message intake
    // =========================================================================

    /// Hears one raw message from an adapter: builds the Resonance and
    /// fans it out to every listener and active prompt.
    ///
    /// A message from a client type the bot never registered is a
    /// framework misconfiguration and is an error.
    pub async fn hear(&self, client_type: ClientType, raw: RawMessage) -> RuntimeResult<()> {
        let Some(client) = self.clients.get(&client_type) else {
            return Err(RuntimeError::UnregisteredClient {
                bot_id: self.id.clone(),
                client_type,
            });
        };

        let resonance = self
            .factory
            .build(raw, &self.id, &self.config.locale, Arc::clone(client))
            .await?;
        self.dispatcher.dispatch(&resonance, &self.context).await;
        Ok(())
    }

    // =========================================================================
    // Configuration surface
    // =========================================================================

    /// The effective command prefix for a message's context.
    pub async fn get_command_prefix(&self, resonance: &Resonance) -> FrameworkResult<String> {
        self.interpreter.resolve_prefix(resonance).await
    }

    /// The effective bot-wide configuration: persisted values merged
    /// over the in-code defaults.
    pub async fn get_active_config(&self) -> RuntimeResult<BotActiveConfig> {
        let default = BotActiveConfig {
            command_prefix: self.config.command_prefix.clone(),
            locale: self.config.locale.clone(),
            active: self.config.active,
        };
        let path = format!("/bots/{}/config", self.id);
        Ok(self.resolver.resolve(&path, &default).await?)
    }

    /// The effective per-client configuration.
    pub async fn get_active_client_config(
        &self,
        client_type: ClientType,
    ) -> RuntimeResult<ClientActiveConfig> {
        let default = ClientActiveConfig {
            command_prefix: None,
            joker: self
                .config
                .clients
                .get(client_type.as_str())
                .and_then(|c| c.joker.clone()),
        };
        let path = format!("/bots/{}/clients/{}", self.id, client_type.as_str());
        Ok(self.resolver.resolve(&path, &default).await?)
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("id", &self.id)
            .field("clients", &self.clients.len())
            .field("commands", &self.registry.len())
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`Bot`].
pub struct BotBuilder {
    config: BotConfig,
    gestalt: BoxedGestalt,
    registry: Option<Arc<CommandRegistry>>,
    clients: HashMap<ClientType, BoxedClient>,
    listeners: Vec<BoxedListener>,
}

impl BotBuilder {
    /// Sets the command registry (commands and talents).
    pub fn registry(mut self, registry: Arc<CommandRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Registers a client connection.
    pub fn client(mut self, client: BoxedClient) -> Self {
        self.clients.insert(client.client_type(), client);
        self
    }

    /// Registers an additional listener beside the built-in command
    /// listener.
    pub fn listener(mut self, listener: BoxedListener) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Assembles the bot.
    pub fn build(self) -> Arc<Bot> {
        let registry = self.registry.unwrap_or_else(|| Arc::new(CommandRegistry::new()));
        let interpreter = Interpreter::new(
            Arc::clone(&registry),
            Arc::clone(&self.gestalt),
            self.config.command_prefix.clone(),
        );

        let mut dispatcher = ListenerDispatcher::new();
        dispatcher.register(Arc::new(CommandListener::new(interpreter.clone())));
        for listener in self.listeners {
            dispatcher.register(listener);
        }

        let context = Arc::new(CommandContext {
            gestalt: Arc::clone(&self.gestalt),
            prompts: Arc::new(PromptHub::new()),
            cooldowns: Arc::new(CooldownManager::new()),
        });

        Arc::new(Bot {
            id: self.config.id.clone(),
            resolver: ConfigResolver::new(Arc::clone(&self.gestalt)),
            factory: ResonanceFactory::new(Arc::clone(&self.gestalt)),
            interpreter,
            registry,
            clients: self.clients,
            dispatcher,
            context,
            jokers: RwLock::new(HashMap::new()),
            summoned: RwLock::new(false),
            gestalt: self.gestalt,
            config: self.config,
        })
    }
}
