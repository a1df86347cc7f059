//! Listener dispatch: the fan-out from one Resonance to everything that
//! reacts to it.
//!
//! For each inbound Resonance, every registered listener and every active
//! prompt is started together; nothing about their completion order is
//! guaranteed, and one listener failing never prevents the rest from
//! finishing. The overall dispatch completes when all of them have.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{Level, debug, error, span};

use chorus_core::Resonance;

use crate::authorizer::{CommandAuthorizer, Warrant};
use crate::command::CommandContext;
use crate::cooldown::{CATEGORY_COMMAND, CooldownScope};
use crate::error::FrameworkResult;
use crate::instruction::Instruction;
use crate::interpreter::Interpreter;

/// Something that reacts to inbound messages.
#[async_trait]
pub trait Listener: Send + Sync {
    /// Reacts to one Resonance. Errors are logged by the dispatcher and
    /// isolated from other listeners.
    async fn listen(
        &self,
        resonance: Arc<Resonance>,
        ctx: Arc<CommandContext>,
    ) -> FrameworkResult<()>;
}

/// A shared listener trait object.
pub type BoxedListener = Arc<dyn Listener>;

// =============================================================================
// Dispatcher
// =============================================================================

/// Fans each Resonance out to every listener and the prompt hub.
#[derive(Default)]
pub struct ListenerDispatcher {
    listeners: Vec<BoxedListener>,
}

impl ListenerDispatcher {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener.
    pub fn register(&mut self, listener: BoxedListener) {
        self.listeners.push(listener);
    }

    /// The number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Dispatches one Resonance to every listener and every active
    /// prompt, concurrently, waiting for all of them to finish.
    pub async fn dispatch(&self, resonance: &Arc<Resonance>, ctx: &Arc<CommandContext>) {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            bot_id = %resonance.bot_id(),
            client = %resonance.client_type(),
        );
        let _enter = span.enter();

        let listener_tasks = self.listeners.iter().map(|listener| {
            let listener = Arc::clone(listener);
            let resonance = Arc::clone(resonance);
            let ctx = Arc::clone(ctx);
            async move {
                if let Err(err) = listener.listen(resonance, ctx).await {
                    error!(error = %err, "Listener failed while reacting");
                }
            }
        });

        futures::join!(join_all(listener_tasks), ctx.prompts.listen(resonance));
    }
}

impl std::fmt::Debug for ListenerDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerDispatcher")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

// =============================================================================
// Command Listener
// =============================================================================

/// The built-in listener that turns messages into command executions:
/// interpret, authorize, execute, then arm cooldowns.
pub struct CommandListener {
    interpreter: Interpreter,
}

impl CommandListener {
    /// Creates the listener over a bot's interpreter.
    pub fn new(interpreter: Interpreter) -> Self {
        Self { interpreter }
    }
}

#[async_trait]
impl Listener for CommandListener {
    async fn listen(
        &self,
        resonance: Arc<Resonance>,
        ctx: Arc<CommandContext>,
    ) -> FrameworkResult<()> {
        let Some(instruction) = self.interpreter.interpret(&resonance).await? else {
            return Ok(());
        };

        let authorizer = CommandAuthorizer::build(
            &instruction,
            Arc::clone(&ctx.gestalt),
            Arc::clone(&ctx.cooldowns),
        )
        .await?;

        match authorizer.warrant().await? {
            Warrant::Granted => {
                instruction.command().execute(&instruction, &ctx).await?;
                arm_cooldowns(&instruction, &ctx);
                Ok(())
            }
            Warrant::Denied(reason) => {
                debug!(
                    command = instruction.command().key(),
                    author = %resonance.author().id,
                    reason = ?reason,
                    "Command denied"
                );
                Ok(())
            }
        }
    }
}

/// Arms the configured cooldowns after a successful execution. The
/// authorizer never does this itself.
fn arm_cooldowns(instruction: &Instruction, ctx: &CommandContext) {
    let cooldown = instruction.config().effective_cooldown();
    let resonance = instruction.resonance();
    let bot = resonance.bot_id();
    let key = instruction.command().key();

    ctx.cooldowns.set(
        bot,
        CATEGORY_COMMAND,
        key,
        CooldownScope::Global,
        std::time::Duration::from_secs(cooldown.global_secs),
    );
    ctx.cooldowns.set(
        bot,
        CATEGORY_COMMAND,
        key,
        CooldownScope::User(resonance.author().id.clone()),
        std::time::Duration::from_secs(cooldown.user_secs),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, CommandConfig, CommandRegistry, CooldownConfig};
    use crate::error::FrameworkError;
    use crate::prompt::PromptInfo;
    use crate::testkit::{CountingExecutor, MockClient, make_context, make_resonance};
    use chorus_core::{BoxedClient, BoxedGestalt, ClientType, MemoryGestalt};
    use parking_lot::Mutex;

    struct FailingListener;

    #[async_trait]
    impl Listener for FailingListener {
        async fn listen(
            &self,
            _resonance: Arc<Resonance>,
            _ctx: Arc<CommandContext>,
        ) -> FrameworkResult<()> {
            Err(FrameworkError::Execution("deliberate".into()))
        }
    }

    struct TallyListener {
        heard: Mutex<u32>,
    }

    #[async_trait]
    impl Listener for TallyListener {
        async fn listen(
            &self,
            _resonance: Arc<Resonance>,
            _ctx: Arc<CommandContext>,
        ) -> FrameworkResult<()> {
            *self.heard.lock() += 1;
            Ok(())
        }
    }

    fn ping_registry(executor: Arc<CountingExecutor>, config: CommandConfig) -> Arc<CommandRegistry> {
        let mut registry = CommandRegistry::new();
        registry.register(Command::builder("ping", executor).config(config).build());
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_one_failing_listener_does_not_starve_others() {
        let gestalt: BoxedGestalt = Arc::new(MemoryGestalt::new());
        let ctx = make_context(&gestalt);
        let client = MockClient::new(ClientType::Discord);

        let tally = Arc::new(TallyListener {
            heard: Mutex::new(0),
        });
        let mut dispatcher = ListenerDispatcher::new();
        dispatcher.register(Arc::new(FailingListener));
        dispatcher.register(Arc::clone(&tally) as BoxedListener);
        dispatcher.register(Arc::new(FailingListener));

        let resonance = make_resonance(&gestalt, client, "u1", "hello").await;
        dispatcher.dispatch(&resonance, &ctx).await;

        assert_eq!(*tally.heard.lock(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_executes_and_arms_cooldowns() {
        let gestalt: BoxedGestalt = Arc::new(MemoryGestalt::new());
        let ctx = make_context(&gestalt);
        let client = MockClient::new(ClientType::Discord);

        let executor = Arc::new(CountingExecutor::default());
        let registry = ping_registry(
            Arc::clone(&executor),
            CommandConfig {
                cooldown: CooldownConfig {
                    user_secs: 30,
                    global_secs: 5,
                },
                ..CommandConfig::default()
            },
        );
        let mut dispatcher = ListenerDispatcher::new();
        dispatcher.register(Arc::new(CommandListener::new(Interpreter::new(
            registry,
            Arc::clone(&gestalt),
            "!",
        ))));

        let resonance =
            make_resonance(&gestalt, Arc::clone(&client) as BoxedClient, "u1", "!ping").await;
        dispatcher.dispatch(&resonance, &ctx).await;

        assert_eq!(*executor.runs.lock(), 1);
        assert!(ctx.cooldowns.check(
            "sigma",
            CATEGORY_COMMAND,
            "ping",
            &CooldownScope::User("u1".into())
        ));
        assert!(ctx
            .cooldowns
            .check("sigma", CATEGORY_COMMAND, "ping", &CooldownScope::Global));

        // An immediate second invocation is denied by cooldown and does
        // not run the executor again; the author is told why.
        dispatcher.dispatch(&resonance, &ctx).await;
        assert_eq!(*executor.runs.lock(), 1);
        assert!(
            client
                .sent_messages()
                .iter()
                .any(|(_, text)| text.contains("cooling down"))
        );
    }

    #[tokio::test]
    async fn test_non_command_chatter_runs_nothing() {
        let gestalt: BoxedGestalt = Arc::new(MemoryGestalt::new());
        let ctx = make_context(&gestalt);
        let client = MockClient::new(ClientType::Discord);

        let executor = Arc::new(CountingExecutor::default());
        let registry = ping_registry(Arc::clone(&executor), CommandConfig::default());
        let mut dispatcher = ListenerDispatcher::new();
        dispatcher.register(Arc::new(CommandListener::new(Interpreter::new(
            registry,
            Arc::clone(&gestalt),
            "!",
        ))));

        let resonance = make_resonance(&gestalt, client, "u1", "just chatting").await;
        dispatcher.dispatch(&resonance, &ctx).await;
        assert_eq!(*executor.runs.lock(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prompts_hear_dispatched_messages() {
        let gestalt: BoxedGestalt = Arc::new(MemoryGestalt::new());
        let ctx = make_context(&gestalt);
        let client = MockClient::new(ClientType::Discord);
        let dispatcher = Arc::new(ListenerDispatcher::new());

        let asker =
            make_resonance(&gestalt, Arc::clone(&client) as BoxedClient, "u1", "!quiz").await;
        let waiting = {
            let ctx = Arc::clone(&ctx);
            let asker = Arc::clone(&asker);
            tokio::spawn(async move {
                let info = PromptInfo::target(&asker);
                ctx.prompts.prompt(&asker, info).await
            })
        };
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert_eq!(ctx.prompts.active_count(), 1);

        let answer =
            make_resonance(&gestalt, Arc::clone(&client) as BoxedClient, "u1", "42").await;
        dispatcher.dispatch(&answer, &ctx).await;
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        assert_eq!(waiting.await.unwrap(), Ok("42".to_string()));
    }
}
