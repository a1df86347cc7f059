//! Resonance: the normalized representation of one inbound message.
//!
//! Adapters hand the bot a [`RawMessage`](crate::client::RawMessage); the
//! [`ResonanceFactory`] resolves it — origin, then locale, then privacy,
//! each exactly once — into a [`Resonance`] before any listener or prompt
//! sees it. The resolution rules that differ per platform live on the
//! [`Client`] trait, so adding a client variant never touches this module.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::client::{
    BoxedClient, Client, ClientType, ClientUser, Destination, Origin, Privacy, RawMessage,
};
use crate::error::{ClientResult, GestaltResult};
use crate::gestalt::{BoxedGestalt, Gestalt};

/// One inbound message plus its fully resolved context.
///
/// A Resonance is built once, shared (`Arc`) across every listener and
/// prompt reacting to it, and discarded when they finish. Nothing here is
/// persisted.
pub struct Resonance {
    content: String,
    bot_id: String,
    client: BoxedClient,
    author: ClientUser,
    origin: Origin,
    locale: String,
    privacy: Privacy,
    gestalt: BoxedGestalt,
    raw: Value,
}

impl Resonance {
    /// The extracted text content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The id of the bot this message belongs to.
    pub fn bot_id(&self) -> &str {
        &self.bot_id
    }

    /// The client the message arrived through.
    pub fn client(&self) -> &BoxedClient {
        &self.client
    }

    /// Shorthand for the client's platform family.
    pub fn client_type(&self) -> ClientType {
        self.client.client_type()
    }

    /// The message author.
    pub fn author(&self) -> &ClientUser {
        &self.author
    }

    /// Where the message came from.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// The locale resolved for this message.
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Whether the message was public or private.
    pub fn privacy(&self) -> Privacy {
        self.privacy
    }

    /// True for direct messages and whispers.
    pub fn is_private(&self) -> bool {
        self.privacy == Privacy::Private
    }

    /// The platform-native payload the adapter attached.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Sends `content` back to the channel the message came from.
    pub async fn reply(&self, content: &str) -> ClientResult<()> {
        self.client
            .send(&Destination::Channel(self.origin.channel_id.clone()), content)
            .await
    }

    /// Sends `content` to an arbitrary destination on the same client.
    pub async fn send(&self, destination: &Destination, content: &str) -> ClientResult<()> {
        self.client.send(destination, content).await
    }

    /// Replies with a personalizable line of text.
    ///
    /// The effective text is looked up under
    /// `/i18n/{bot}/personalizations/{key}` with `default` as the
    /// fallback, so operators can reword bot responses without a deploy.
    /// A store failure falls back to the default rather than silencing
    /// the reply.
    pub async fn reply_personalized(&self, key: &str, default: &str) -> ClientResult<()> {
        let path = format!("/i18n/{}/personalizations/{}", self.bot_id, key);
        let text = match self.gestalt.sync(Value::String(default.into()), &path).await {
            Ok(Value::String(text)) => text,
            Ok(_) => default.to_string(),
            Err(err) => {
                warn!(path = %path, error = %err, "Personalization lookup failed, using default");
                default.to_string()
            }
        };
        self.reply(&text).await
    }
}

impl std::fmt::Debug for Resonance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resonance")
            .field("bot_id", &self.bot_id)
            .field("client_type", &self.client_type())
            .field("author", &self.author.id)
            .field("channel", &self.origin.channel_id)
            .field("privacy", &self.privacy)
            .finish()
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Builds [`Resonance`]s from raw adapter messages.
///
/// Resolution order is fixed: origin (client hook), locale (persisted
/// overrides, most specific scope first), privacy (client hook).
#[derive(Clone)]
pub struct ResonanceFactory {
    gestalt: BoxedGestalt,
}

impl ResonanceFactory {
    /// Creates a factory over the given store.
    pub fn new(gestalt: BoxedGestalt) -> Self {
        Self { gestalt }
    }

    /// Resolves `raw` into a ready-to-dispatch Resonance.
    pub async fn build(
        &self,
        raw: RawMessage,
        bot_id: &str,
        default_locale: &str,
        client: BoxedClient,
    ) -> GestaltResult<Arc<Resonance>> {
        let origin = client.resolve_origin(&raw);
        let locale = self
            .resolve_locale(bot_id, client.client_type(), &raw.author, &origin, default_locale)
            .await?;
        let privacy = client.resolve_privacy(&raw);

        Ok(Arc::new(Resonance {
            content: raw.content,
            bot_id: bot_id.to_string(),
            client,
            author: raw.author,
            origin,
            locale,
            privacy,
            gestalt: Arc::clone(&self.gestalt),
            raw: raw.raw,
        }))
    }

    /// Resolves the locale for a message: user override, then channel,
    /// then community, then the bot default.
    async fn resolve_locale(
        &self,
        bot_id: &str,
        client_type: ClientType,
        author: &ClientUser,
        origin: &Origin,
        default_locale: &str,
    ) -> GestaltResult<String> {
        let base = format!("/i18n/{}/clients/{}", bot_id, client_type.as_str());

        let mut candidates = vec![
            format!("{base}/users/{}/locale", author.id),
            format!("{base}/channels/{}/locale", origin.channel_id),
        ];
        if let Some(community) = &origin.community_id {
            candidates.push(format!("{base}/communities/{community}/locale"));
        }

        for path in candidates {
            if let Some(Value::String(locale)) = self.gestalt.get(&path).await? {
                return Ok(locale);
            }
        }
        Ok(default_locale.to_string())
    }
}
