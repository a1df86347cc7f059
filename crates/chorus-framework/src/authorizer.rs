//! The command authorizer.
//!
//! One authorizer is built per instruction and never reused. Construction
//! is the state machine: [`CommandAuthorizer::build`] performs every async
//! configuration fetch up front, and [`warrant`](CommandAuthorizer::warrant)
//! consumes the built value to produce a terminal decision — there is no
//! way to re-enter or re-run an authorizer.
//!
//! Ordinary denials are values ([`Warrant::Denied`]), communicated to the
//! chat context where needed, never raised as errors. Errors are reserved
//! for malformed configuration, which must reach the operator.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use chorus_core::{BoxedGestalt, Client, Destination, Eminence, Gestalt};

use crate::cooldown::{CATEGORY_COMMAND, CooldownManager, CooldownScope};
use crate::error::{FrameworkError, FrameworkResult};
use crate::instruction::Instruction;

/// Why an invocation was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    /// A global or per-user cooldown is active.
    Cooldown,
    /// The command requires positional input and none was given.
    MissingInput,
    /// The command is administratively deactivated here.
    Deactivated,
    /// The author is blacklisted for this command.
    UserBlacklisted,
    /// The author's eminence does not satisfy the requirement.
    InsufficientEminence {
        /// What the author holds.
        held: Eminence,
        /// What the command requires.
        required: Eminence,
    },
    /// Invoked privately, but the command disallows direct messages.
    PrivateNotAllowed,
    /// The invoking channel or community is blacklisted.
    OriginBlacklisted,
}

/// The terminal authorization decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warrant {
    /// Execution may proceed. Cooldowns are armed by the caller after
    /// execution, not here.
    Granted,
    /// Execution is refused.
    Denied(DenialReason),
}

/// A single-use authorization gate for one instruction.
pub struct CommandAuthorizer<'a> {
    instruction: &'a Instruction,
    cooldowns: Arc<CooldownManager>,
    /// Bot-wide per-client user→eminence map.
    bot_eminences: HashMap<String, Eminence>,
    /// Community-scoped user→eminence map for the invoking origin.
    scoped_eminences: HashMap<String, Eminence>,
}

impl<'a> CommandAuthorizer<'a> {
    /// Builds the authorizer, fetching every persisted map it will
    /// consult. After this, the decision itself touches no storage.
    pub async fn build(
        instruction: &'a Instruction,
        gestalt: BoxedGestalt,
        cooldowns: Arc<CooldownManager>,
    ) -> FrameworkResult<CommandAuthorizer<'a>> {
        let resonance = instruction.resonance();
        let bot = resonance.bot_id();
        let client = resonance.client_type().as_str();
        let scope = resonance.origin().scope_id();

        let bot_eminences =
            read_eminence_map(&gestalt, &format!("/bots/{bot}/clients/{client}/eminences")).await?;
        let scoped_eminences = read_eminence_map(
            &gestalt,
            &format!("/bots/{bot}/clients/{client}/communities/{scope}/eminences"),
        )
        .await?;

        Ok(Self {
            instruction,
            cooldowns,
            bot_eminences,
            scoped_eminences,
        })
    }

    /// Resolves the author's eminence: the bot-wide map first, then the
    /// community-scoped map, defaulting to the lowest level.
    fn author_eminence(&self) -> Eminence {
        let author = &self.instruction.resonance().author().id;
        self.bot_eminences
            .get(author)
            .or_else(|| self.scoped_eminences.get(author))
            .copied()
            .unwrap_or(Eminence::None)
    }

    /// Evaluates every gate in order, short-circuiting on the first
    /// failure, and consumes the authorizer either way.
    pub async fn warrant(self) -> FrameworkResult<Warrant> {
        let instruction = self.instruction;
        let resonance = instruction.resonance();
        let config = instruction.config();
        let command = instruction.command();
        let author = resonance.author();
        let bot = resonance.bot_id();
        let key = command.key();

        // Cooldowns, unless the author's eminence is exempt by policy.
        let exempt = config
            .base
            .cooldown_exempt_eminence
            .is_some_and(|level| self.author_eminence().satisfies(level));
        if !exempt {
            let global_active =
                self.cooldowns
                    .check(bot, CATEGORY_COMMAND, key, &CooldownScope::Global);
            let user_active = self.cooldowns.check(
                bot,
                CATEGORY_COMMAND,
                key,
                &CooldownScope::User(author.id.clone()),
            );
            if global_active || user_active {
                self.send_cooldown_notice().await;
                return Ok(Warrant::Denied(DenialReason::Cooldown));
            }
        }

        // Argument shape: undeclared option keys are a configuration
        // defect, not a denial.
        for used in instruction.args().named_keys() {
            if !config.base.options.iter().any(|declared| declared == used) {
                return Err(FrameworkError::UnknownOption {
                    command: key.to_string(),
                    key: used.to_string(),
                });
            }
        }
        if config.base.requires_input && instruction.args().positional().is_empty() {
            return Ok(Warrant::Denied(DenialReason::MissingInput));
        }

        // Activation: a deactivated command still runs for whitelisted
        // channels and users.
        if !config.is_enabled() {
            let whitelist = &config.client.whitelist;
            let whitelisted = whitelist.users.contains(&author.id)
                || whitelist.channels.contains(&resonance.origin().channel_id);
            if !whitelisted {
                return Ok(Warrant::Denied(DenialReason::Deactivated));
            }
        }

        // Author blacklist.
        if config.client.blacklist.users.contains(&author.id) {
            return Ok(Warrant::Denied(DenialReason::UserBlacklisted));
        }

        // Eminence.
        let held = self.author_eminence();
        let required = config.required_eminence();
        if !held.satisfies(required) {
            return Ok(Warrant::Denied(DenialReason::InsufficientEminence {
                held,
                required,
            }));
        }

        // Private-message policy.
        if resonance.is_private() && !config.allow_direct() {
            return Ok(Warrant::Denied(DenialReason::PrivateNotAllowed));
        }

        // Origin blacklist.
        let origin = resonance.origin();
        let blacklist = &config.client.blacklist;
        let origin_blocked = blacklist.channels.contains(&origin.channel_id)
            || origin
                .community_id
                .as_ref()
                .is_some_and(|community| blacklist.communities.contains(community));
        if origin_blocked {
            return Ok(Warrant::Denied(DenialReason::OriginBlacklisted));
        }

        debug!(command = %key, author = %author.id, "Authorization granted");
        Ok(Warrant::Granted)
    }

    /// Convenience wrapper: true iff the warrant is granted.
    pub async fn authorize(self) -> FrameworkResult<bool> {
        Ok(matches!(self.warrant().await?, Warrant::Granted))
    }

    /// Tells the author the command is cooling down, through the channel
    /// or — on clients where chat-room noise matters — a direct line.
    async fn send_cooldown_notice(&self) {
        let instruction = self.instruction;
        let resonance = instruction.resonance();
        let key = instruction.command().key();
        let author = resonance.author();
        let bot = resonance.bot_id();

        let remaining = [
            self.cooldowns
                .remaining(bot, CATEGORY_COMMAND, key, &CooldownScope::Global),
            self.cooldowns.remaining(
                bot,
                CATEGORY_COMMAND,
                key,
                &CooldownScope::User(author.id.clone()),
            ),
        ]
        .into_iter()
        .flatten()
        .max();

        let text = match remaining {
            Some(left) => format!(
                "`{key}` is cooling down. Try again in {}s.",
                left.as_secs().max(1)
            ),
            None => format!("`{key}` is cooling down."),
        };

        let result = if resonance.client().prefers_quiet_notices() {
            resonance
                .send(&Destination::User(author.id.clone()), &text)
                .await
        } else {
            resonance.reply(&text).await
        };
        if let Err(err) = result {
            warn!(command = %key, error = %err, "Failed to deliver cooldown notice");
        }
    }
}

async fn read_eminence_map(
    gestalt: &BoxedGestalt,
    path: &str,
) -> FrameworkResult<HashMap<String, Eminence>> {
    match gestalt.get(path).await? {
        Some(value) => {
            serde_json::from_value(value).map_err(|err| {
                FrameworkError::Gestalt(chorus_core::GestaltError::Shape {
                    path: path.to_string(),
                    reason: err.to_string(),
                })
            })
        }
        None => Ok(HashMap::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, CommandConfig, CommandRegistry, CooldownConfig};
    use crate::interpreter::Interpreter;
    use crate::testkit::{CountingExecutor, CountingGestalt, MockClient, make_resonance,
        make_resonance_in};
    use chorus_core::{BoxedClient, BoxedGestalt, ClientType, MemoryGestalt};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn registry_with(config: CommandConfig) -> Arc<CommandRegistry> {
        let mut registry = CommandRegistry::new();
        registry.register(
            Command::builder("roll", Arc::new(CountingExecutor::default()))
                .config(config)
                .build(),
        );
        Arc::new(registry)
    }

    async fn build_instruction(
        gestalt: &BoxedGestalt,
        registry: Arc<CommandRegistry>,
        client: BoxedClient,
        user: &str,
        content: &str,
    ) -> Instruction {
        let interpreter = Interpreter::new(registry, Arc::clone(gestalt), "!");
        let resonance = make_resonance(gestalt, client, user, content).await;
        interpreter
            .interpret(&resonance)
            .await
            .expect("interpret")
            .expect("instruction")
    }

    #[tokio::test]
    async fn test_granted_for_plain_invocation() {
        let gestalt: BoxedGestalt = Arc::new(MemoryGestalt::new());
        let registry = registry_with(CommandConfig::default());
        let client = MockClient::new(ClientType::Discord);
        let cooldowns = Arc::new(CooldownManager::new());

        let instruction =
            build_instruction(&gestalt, registry, client, "u1", "!roll").await;
        let authorizer =
            CommandAuthorizer::build(&instruction, Arc::clone(&gestalt), cooldowns)
                .await
                .unwrap();
        assert!(authorizer.authorize().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_denies_before_any_other_gate() {
        // The author is on cooldown AND blacklisted AND lacks eminence;
        // the denial must still be Cooldown, and deciding must not read
        // the store at all once built.
        let counting = Arc::new(CountingGestalt::new());
        let gestalt: BoxedGestalt = Arc::clone(&counting) as BoxedGestalt;
        gestalt
            .post(
                "/bots/sigma/clients/discord/commands/roll/config",
                json!({"blacklist": {"users": ["u1"]}}),
            )
            .await
            .unwrap();

        let registry = registry_with(CommandConfig {
            required_eminence: Eminence::Master,
            cooldown: CooldownConfig {
                user_secs: 30,
                global_secs: 0,
            },
            ..CommandConfig::default()
        });
        let client = MockClient::new(ClientType::Discord);
        let cooldowns = Arc::new(CooldownManager::new());
        cooldowns.set(
            "sigma",
            CATEGORY_COMMAND,
            "roll",
            CooldownScope::User("u1".into()),
            Duration::from_secs(30),
        );

        let instruction =
            build_instruction(&gestalt, registry, client, "u1", "!roll").await;
        let authorizer =
            CommandAuthorizer::build(&instruction, Arc::clone(&gestalt), cooldowns)
                .await
                .unwrap();

        let reads_before = counting.reads.lock().len();
        let warrant = authorizer.warrant().await.unwrap();
        assert_eq!(warrant, Warrant::Denied(DenialReason::Cooldown));
        assert_eq!(counting.reads.lock().len(), reads_before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_notice_routes_per_client() {
        let gestalt: BoxedGestalt = Arc::new(MemoryGestalt::new());
        let registry = registry_with(CommandConfig::default());
        let cooldowns = Arc::new(CooldownManager::new());
        cooldowns.set(
            "sigma",
            CATEGORY_COMMAND,
            "roll",
            CooldownScope::Global,
            Duration::from_secs(10),
        );

        // A chatty client hears the notice in the channel.
        let discord = MockClient::new(ClientType::Discord);
        let instruction = build_instruction(
            &gestalt,
            Arc::clone(&registry),
            Arc::clone(&discord) as BoxedClient,
            "u1",
            "!roll",
        )
        .await;
        CommandAuthorizer::build(&instruction, Arc::clone(&gestalt), Arc::clone(&cooldowns))
            .await
            .unwrap()
            .warrant()
            .await
            .unwrap();
        let sent = discord.sent_messages();
        assert!(matches!(sent[0].0, Destination::Channel(_)));
        assert!(sent[0].1.contains("cooling down"));

        // A noise-sensitive client hears it privately.
        let twitch = MockClient::quiet(ClientType::Twitch);
        let instruction = build_instruction(
            &gestalt,
            registry,
            Arc::clone(&twitch) as BoxedClient,
            "u1",
            "!roll",
        )
        .await;
        CommandAuthorizer::build(&instruction, Arc::clone(&gestalt), cooldowns)
            .await
            .unwrap()
            .warrant()
            .await
            .unwrap();
        let sent = twitch.sent_messages();
        assert_eq!(sent[0].0, Destination::User("u1".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_eminence_exemption_skips_cooldowns() {
        let gestalt: BoxedGestalt = Arc::new(MemoryGestalt::new());
        gestalt
            .post(
                "/bots/sigma/clients/discord/eminences",
                json!({"u1": "operator"}),
            )
            .await
            .unwrap();

        let registry = registry_with(CommandConfig {
            cooldown_exempt_eminence: Some(Eminence::Operator),
            ..CommandConfig::default()
        });
        let client = MockClient::new(ClientType::Discord);
        let cooldowns = Arc::new(CooldownManager::new());
        cooldowns.set(
            "sigma",
            CATEGORY_COMMAND,
            "roll",
            CooldownScope::User("u1".into()),
            Duration::from_secs(30),
        );

        let instruction =
            build_instruction(&gestalt, registry, client, "u1", "!roll").await;
        let warrant = CommandAuthorizer::build(&instruction, Arc::clone(&gestalt), cooldowns)
            .await
            .unwrap()
            .warrant()
            .await
            .unwrap();
        assert_eq!(warrant, Warrant::Granted);
    }

    #[tokio::test]
    async fn test_eminence_is_monotonic() {
        let gestalt: BoxedGestalt = Arc::new(MemoryGestalt::new());
        gestalt
            .post(
                "/bots/sigma/clients/discord/eminences",
                json!({"godlike": "deity", "helper": "operator"}),
            )
            .await
            .unwrap();

        for required in [Eminence::Operator, Eminence::Master, Eminence::Deity] {
            let registry = registry_with(CommandConfig {
                required_eminence: required,
                ..CommandConfig::default()
            });
            let client = MockClient::new(ClientType::Discord);
            let instruction = build_instruction(
                &gestalt,
                registry,
                Arc::clone(&client) as BoxedClient,
                "godlike",
                "!roll",
            )
            .await;
            let warrant = CommandAuthorizer::build(
                &instruction,
                Arc::clone(&gestalt),
                Arc::new(CooldownManager::new()),
            )
            .await
            .unwrap()
            .warrant()
            .await
            .unwrap();
            assert_eq!(warrant, Warrant::Granted, "deity must satisfy {required}");
        }

        let registry = registry_with(CommandConfig {
            required_eminence: Eminence::Master,
            ..CommandConfig::default()
        });
        let client = MockClient::new(ClientType::Discord);
        let instruction =
            build_instruction(&gestalt, registry, client, "helper", "!roll").await;
        let warrant = CommandAuthorizer::build(
            &instruction,
            Arc::clone(&gestalt),
            Arc::new(CooldownManager::new()),
        )
        .await
        .unwrap()
        .warrant()
        .await
        .unwrap();
        assert_eq!(
            warrant,
            Warrant::Denied(DenialReason::InsufficientEminence {
                held: Eminence::Operator,
                required: Eminence::Master,
            })
        );
    }

    #[tokio::test]
    async fn test_community_scoped_eminence_is_consulted() {
        let gestalt: BoxedGestalt = Arc::new(MemoryGestalt::new());
        gestalt
            .post(
                "/bots/sigma/clients/discord/communities/g1/eminences",
                json!({"local-mod": "master"}),
            )
            .await
            .unwrap();

        let registry = registry_with(CommandConfig {
            required_eminence: Eminence::Master,
            ..CommandConfig::default()
        });
        let client = MockClient::new(ClientType::Discord);
        let instruction =
            build_instruction(&gestalt, registry, client, "local-mod", "!roll").await;
        let warrant = CommandAuthorizer::build(
            &instruction,
            Arc::clone(&gestalt),
            Arc::new(CooldownManager::new()),
        )
        .await
        .unwrap()
        .warrant()
        .await
        .unwrap();
        assert_eq!(warrant, Warrant::Granted);
    }

    #[tokio::test]
    async fn test_missing_required_input_denies() {
        let gestalt: BoxedGestalt = Arc::new(MemoryGestalt::new());
        let registry = registry_with(CommandConfig {
            requires_input: true,
            ..CommandConfig::default()
        });
        let client = MockClient::new(ClientType::Discord);

        let bare = build_instruction(
            &gestalt,
            Arc::clone(&registry),
            Arc::clone(&client) as BoxedClient,
            "u1",
            "!roll",
        )
        .await;
        let warrant = CommandAuthorizer::build(
            &bare,
            Arc::clone(&gestalt),
            Arc::new(CooldownManager::new()),
        )
        .await
        .unwrap()
        .warrant()
        .await
        .unwrap();
        assert_eq!(warrant, Warrant::Denied(DenialReason::MissingInput));

        let with_input =
            build_instruction(&gestalt, registry, client, "u1", "!roll 2d6").await;
        let warrant = CommandAuthorizer::build(
            &with_input,
            Arc::clone(&gestalt),
            Arc::new(CooldownManager::new()),
        )
        .await
        .unwrap()
        .warrant()
        .await
        .unwrap();
        assert_eq!(warrant, Warrant::Granted);
    }

    #[tokio::test]
    async fn test_undeclared_option_is_a_hard_error() {
        let gestalt: BoxedGestalt = Arc::new(MemoryGestalt::new());
        let registry = registry_with(CommandConfig {
            options: vec!["sides".into()],
            ..CommandConfig::default()
        });
        let client = MockClient::new(ClientType::Discord);

        let ok = build_instruction(
            &gestalt,
            Arc::clone(&registry),
            Arc::clone(&client) as BoxedClient,
            "u1",
            "!roll -sides 20",
        )
        .await;
        assert!(
            CommandAuthorizer::build(&ok, Arc::clone(&gestalt), Arc::new(CooldownManager::new()))
                .await
                .unwrap()
                .authorize()
                .await
                .unwrap()
        );

        let bad =
            build_instruction(&gestalt, registry, client, "u1", "!roll -loaded").await;
        let result = CommandAuthorizer::build(
            &bad,
            Arc::clone(&gestalt),
            Arc::new(CooldownManager::new()),
        )
        .await
        .unwrap()
        .warrant()
        .await;
        assert!(matches!(
            result,
            Err(FrameworkError::UnknownOption { ref key, .. }) if key == "loaded"
        ));
    }

    #[tokio::test]
    async fn test_deactivated_command_honors_whitelist() {
        let gestalt: BoxedGestalt = Arc::new(MemoryGestalt::new());
        gestalt
            .post(
                "/bots/sigma/clients/discord/commands/roll/config",
                json!({"enabled": false, "whitelist": {"users": ["keeper"]}}),
            )
            .await
            .unwrap();

        let registry = registry_with(CommandConfig::default());
        let client = MockClient::new(ClientType::Discord);

        let denied = build_instruction(
            &gestalt,
            Arc::clone(&registry),
            Arc::clone(&client) as BoxedClient,
            "u1",
            "!roll",
        )
        .await;
        let warrant = CommandAuthorizer::build(
            &denied,
            Arc::clone(&gestalt),
            Arc::new(CooldownManager::new()),
        )
        .await
        .unwrap()
        .warrant()
        .await
        .unwrap();
        assert_eq!(warrant, Warrant::Denied(DenialReason::Deactivated));

        let allowed =
            build_instruction(&gestalt, registry, client, "keeper", "!roll").await;
        let warrant = CommandAuthorizer::build(
            &allowed,
            Arc::clone(&gestalt),
            Arc::new(CooldownManager::new()),
        )
        .await
        .unwrap()
        .warrant()
        .await
        .unwrap();
        assert_eq!(warrant, Warrant::Granted);
    }

    #[tokio::test]
    async fn test_blacklisted_user_is_denied() {
        let gestalt: BoxedGestalt = Arc::new(MemoryGestalt::new());
        gestalt
            .post(
                "/bots/sigma/clients/discord/commands/roll/config",
                json!({"blacklist": {"users": ["u1"]}}),
            )
            .await
            .unwrap();

        let registry = registry_with(CommandConfig::default());
        let client = MockClient::new(ClientType::Discord);
        let instruction =
            build_instruction(&gestalt, registry, client, "u1", "!roll").await;
        let warrant = CommandAuthorizer::build(
            &instruction,
            Arc::clone(&gestalt),
            Arc::new(CooldownManager::new()),
        )
        .await
        .unwrap()
        .warrant()
        .await
        .unwrap();
        assert_eq!(warrant, Warrant::Denied(DenialReason::UserBlacklisted));
    }

    #[tokio::test]
    async fn test_private_invocation_policy() {
        let gestalt: BoxedGestalt = Arc::new(MemoryGestalt::new());
        let registry = registry_with(CommandConfig {
            allow_direct: false,
            ..CommandConfig::default()
        });
        let client = MockClient::new(ClientType::Discord);
        let interpreter = Interpreter::new(registry, Arc::clone(&gestalt), "!");

        let resonance = make_resonance_in(
            &gestalt,
            client,
            "u1",
            "dm-line",
            "!roll",
            true,
        )
        .await;
        let instruction = interpreter.interpret(&resonance).await.unwrap().unwrap();
        let warrant = CommandAuthorizer::build(
            &instruction,
            Arc::clone(&gestalt),
            Arc::new(CooldownManager::new()),
        )
        .await
        .unwrap()
        .warrant()
        .await
        .unwrap();
        assert_eq!(warrant, Warrant::Denied(DenialReason::PrivateNotAllowed));
    }

    #[tokio::test]
    async fn test_blacklisted_origin_is_denied() {
        let gestalt: BoxedGestalt = Arc::new(MemoryGestalt::new());
        gestalt
            .post(
                "/bots/sigma/clients/discord/commands/roll/config",
                json!({"blacklist": {"communities": ["g1"]}}),
            )
            .await
            .unwrap();

        let registry = registry_with(CommandConfig::default());
        let client = MockClient::new(ClientType::Discord);
        let instruction =
            build_instruction(&gestalt, registry, client, "u1", "!roll").await;
        let warrant = CommandAuthorizer::build(
            &instruction,
            Arc::clone(&gestalt),
            Arc::new(CooldownManager::new()),
        )
        .await
        .unwrap()
        .warrant()
        .await
        .unwrap();
        assert_eq!(warrant, Warrant::Denied(DenialReason::OriginBlacklisted));
    }
}
