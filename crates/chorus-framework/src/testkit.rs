//! Shared test doubles for pipeline tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use chorus_core::{
    BoxedClient, BoxedGestalt, Client, ClientResult, ClientType, ClientUser, Destination, Gestalt,
    GestaltResult, MemoryGestalt, RawMessage, Resonance, ResonanceFactory,
};

use crate::command::{CommandContext, CommandExecutor};
use crate::cooldown::CooldownManager;
use crate::error::FrameworkResult;
use crate::instruction::Instruction;
use crate::prompt::PromptHub;

/// A client that records every send and counts authentications.
pub struct MockClient {
    pub client_type: ClientType,
    pub quiet_notices: bool,
    pub sent: Mutex<Vec<(Destination, String)>>,
    pub authentications: Mutex<u32>,
}

impl MockClient {
    pub fn new(client_type: ClientType) -> Arc<Self> {
        Arc::new(Self {
            client_type,
            quiet_notices: false,
            sent: Mutex::new(Vec::new()),
            authentications: Mutex::new(0),
        })
    }

    pub fn quiet(client_type: ClientType) -> Arc<Self> {
        Arc::new(Self {
            client_type,
            quiet_notices: true,
            sent: Mutex::new(Vec::new()),
            authentications: Mutex::new(0),
        })
    }

    pub fn sent_messages(&self) -> Vec<(Destination, String)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Client for MockClient {
    fn client_type(&self) -> ClientType {
        self.client_type
    }

    async fn authenticate(&self) -> ClientResult<()> {
        *self.authentications.lock() += 1;
        Ok(())
    }

    async fn disconnect(&self) -> ClientResult<()> {
        Ok(())
    }

    async fn get_user(&self, id: &str) -> ClientResult<ClientUser> {
        Ok(ClientUser::new(id, format!("user-{id}")))
    }

    async fn send(&self, destination: &Destination, content: &str) -> ClientResult<()> {
        self.sent
            .lock()
            .push((destination.clone(), content.to_string()));
        Ok(())
    }

    fn prefers_quiet_notices(&self) -> bool {
        self.quiet_notices
    }
}

/// An executor that only counts how often it ran.
#[derive(Default)]
pub struct CountingExecutor {
    pub runs: Mutex<u32>,
}

#[async_trait]
impl CommandExecutor for CountingExecutor {
    async fn execute(&self, _instruction: &Instruction, _ctx: &CommandContext) -> FrameworkResult<()> {
        *self.runs.lock() += 1;
        Ok(())
    }
}

/// A gestalt wrapper that counts reads per path prefix, for asserting
/// what a code path did (and did not) consult.
pub struct CountingGestalt {
    inner: MemoryGestalt,
    pub reads: Mutex<Vec<String>>,
}

impl CountingGestalt {
    pub fn new() -> Self {
        Self {
            inner: MemoryGestalt::new(),
            reads: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Gestalt for CountingGestalt {
    async fn get(&self, path: &str) -> GestaltResult<Option<Value>> {
        self.reads.lock().push(path.to_string());
        self.inner.get(path).await
    }

    async fn post(&self, path: &str, value: Value) -> GestaltResult<()> {
        self.inner.post(path, value).await
    }

    async fn update(&self, path: &str, partial: Value) -> GestaltResult<Value> {
        self.inner.update(path, partial).await
    }

    async fn delete(&self, path: &str) -> GestaltResult<()> {
        self.inner.delete(path).await
    }

    async fn sync(&self, default: Value, path: &str) -> GestaltResult<Value> {
        self.reads.lock().push(path.to_string());
        self.inner.sync(default, path).await
    }
}

/// Builds a resonance for `content` heard by `client` on channel `c1` in
/// community `g1`, authored by `user_id`.
pub async fn make_resonance(
    gestalt: &BoxedGestalt,
    client: BoxedClient,
    user_id: &str,
    content: &str,
) -> Arc<Resonance> {
    make_resonance_in(gestalt, client, user_id, "c1", content, false).await
}

/// Builds a resonance with full control over channel and privacy.
pub async fn make_resonance_in(
    gestalt: &BoxedGestalt,
    client: BoxedClient,
    user_id: &str,
    channel_id: &str,
    content: &str,
    direct: bool,
) -> Arc<Resonance> {
    let factory = ResonanceFactory::new(Arc::clone(gestalt));
    factory
        .build(
            RawMessage {
                content: content.to_string(),
                author: ClientUser::new(user_id, format!("user-{user_id}")),
                channel_id: channel_id.to_string(),
                community_id: Some("g1".to_string()),
                direct,
                raw: Value::Null,
            },
            "sigma",
            "en",
            client,
        )
        .await
        .expect("resonance build")
}

/// A ready-to-use command context over fresh state.
pub fn make_context(gestalt: &BoxedGestalt) -> Arc<CommandContext> {
    Arc::new(CommandContext {
        gestalt: Arc::clone(gestalt),
        prompts: Arc::new(PromptHub::new()),
        cooldowns: Arc::new(CooldownManager::new()),
    })
}
