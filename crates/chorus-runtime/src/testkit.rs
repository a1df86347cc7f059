//! Shared test doubles for runtime tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use chorus_core::{
    Client, ClientResult, ClientType, ClientUser, Destination, RawMessage,
};
use chorus_framework::{CommandContext, CommandExecutor, FrameworkResult, Instruction};

/// A client that records sends and counts lifecycle calls.
pub struct MockClient {
    pub client_type: ClientType,
    pub sent: Mutex<Vec<(Destination, String)>>,
    pub authentications: Mutex<u32>,
    pub disconnects: Mutex<u32>,
}

impl MockClient {
    pub fn new(client_type: ClientType) -> Arc<Self> {
        Arc::new(Self {
            client_type,
            sent: Mutex::new(Vec::new()),
            authentications: Mutex::new(0),
            disconnects: Mutex::new(0),
        })
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
        *self.disconnects.lock() += 1;
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

/// A public-channel raw message.
pub fn raw(user_id: &str, channel_id: &str, content: &str) -> RawMessage {
    RawMessage {
        content: content.to_string(),
        author: ClientUser::new(user_id, format!("user-{user_id}")),
        channel_id: channel_id.to_string(),
        community_id: Some("g1".to_string()),
        direct: false,
        raw: Value::Null,
    }
}
