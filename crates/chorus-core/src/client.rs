//! Client adapter abstraction.
//!
//! A [`Client`] is the per-platform connection object. Chorus does not
//! implement any chat platform's wire protocol itself; adapters implement
//! this trait and feed [`RawMessage`]s into the bot. Everything the
//! pipeline needs from a platform — authentication, sending, user lookup,
//! and the per-variant resolution rules used while building a Resonance —
//! lives behind this trait, so the core never switches on a client-type
//! tag.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClientResult;

// =============================================================================
// Client Type
// =============================================================================

/// The supported chat platform families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    /// Discord guilds and direct messages.
    Discord,
    /// Twitch chat channels and whispers.
    Twitch,
    /// Slack workspaces.
    Slack,
}

impl ClientType {
    /// Returns the canonical lowercase tag for this client type.
    ///
    /// Used to build gestalt paths, so it must stay stable.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discord => "discord",
            Self::Twitch => "twitch",
            Self::Slack => "slack",
        }
    }
}

impl FromStr for ClientType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "discord" => Ok(Self::Discord),
            "twitch" => Ok(Self::Twitch),
            "slack" => Ok(Self::Slack),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for ClientType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Message Context Types
// =============================================================================

/// A resolved chat user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientUser {
    /// Platform-scoped user id.
    pub id: String,
    /// Display name at the time of resolution.
    pub username: String,
}

impl ClientUser {
    /// Creates a new user identity.
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}

/// Where a message came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// The channel (or chat room, or DM line) the message arrived on.
    pub channel_id: String,
    /// The enclosing community, where the platform has one: a Discord
    /// guild or a Slack workspace. Twitch channels stand alone.
    pub community_id: Option<String>,
}

impl Origin {
    /// The id used for community-scoped configuration lookups: the
    /// community when present, otherwise the channel itself.
    pub fn scope_id(&self) -> &str {
        self.community_id.as_deref().unwrap_or(&self.channel_id)
    }
}

/// Whether a message was sent in the open or one-on-one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privacy {
    /// Visible to a channel or community.
    Public,
    /// A direct message or whisper.
    Private,
}

/// A send target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// A channel or chat room.
    Channel(String),
    /// A user's direct-message line.
    User(String),
}

// =============================================================================
// Raw Inbound Message
// =============================================================================

/// One inbound message as normalized by an adapter, before Resonance
/// resolution.
///
/// The adapter extracts the text content and identity fields; the platform
/// payload rides along untouched in `raw` for handlers that need it.
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// Extracted text content.
    pub content: String,
    /// The message author.
    pub author: ClientUser,
    /// The channel the message arrived on.
    pub channel_id: String,
    /// The enclosing community, if the platform has one.
    pub community_id: Option<String>,
    /// Whether the platform delivered this as a direct message.
    pub direct: bool,
    /// The platform-native payload.
    pub raw: serde_json::Value,
}

// =============================================================================
// Client Trait
// =============================================================================

/// The per-platform connection object.
///
/// Adapters implement the network primitives plus the per-variant
/// resolution hooks used while a Resonance is built. The hooks have
/// defaults that fit most platforms; adapters override them where the
/// platform's rules differ.
#[async_trait]
pub trait Client: Send + Sync + 'static {
    /// Returns the platform family of this client.
    fn client_type(&self) -> ClientType;

    /// Connects and authenticates against the platform.
    async fn authenticate(&self) -> ClientResult<()>;

    /// Tears the connection down.
    async fn disconnect(&self) -> ClientResult<()>;

    /// Fetches a user identity by platform id.
    async fn get_user(&self, id: &str) -> ClientResult<ClientUser>;

    /// Shows a typing indicator on `channel` for roughly `seconds`.
    ///
    /// Platforms without typing indicators may leave the default no-op.
    async fn type_for(&self, _seconds: u64, _channel: &str) -> ClientResult<()> {
        Ok(())
    }

    /// Sends `content` to `destination`. This is the single low-level
    /// send primitive every higher-level reply routes through.
    async fn send(&self, destination: &Destination, content: &str) -> ClientResult<()>;

    /// Resolves where a raw message came from.
    fn resolve_origin(&self, raw: &RawMessage) -> Origin {
        Origin {
            channel_id: raw.channel_id.clone(),
            community_id: raw.community_id.clone(),
        }
    }

    /// Resolves whether a raw message is public or private.
    fn resolve_privacy(&self, raw: &RawMessage) -> Privacy {
        if raw.direct {
            Privacy::Private
        } else {
            Privacy::Public
        }
    }

    /// Whether administrative notices (cooldown denials and the like)
    /// should go to the user directly instead of the channel.
    ///
    /// Chat-room platforms where channel noise matters (Twitch) return
    /// true.
    fn prefers_quiet_notices(&self) -> bool {
        false
    }
}

/// A shared client trait object.
pub type BoxedClient = Arc<dyn Client>;
