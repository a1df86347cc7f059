//! Talents: pluggable bundles of functionality grantable to a bot.
//!
//! Chorus does not discover talents from disk; applications construct them
//! and hand them to the bot. The core only needs the pieces the pipeline
//! consults: the machine name, the client allow-list, and the per-bot
//! initialization hook.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::ClientType;
use crate::error::GestaltResult;
use crate::gestalt::BoxedGestalt;

// =============================================================================
// Client Allow-List
// =============================================================================

/// Which client types a talent or command is permitted on.
///
/// In configuration this is a list of client-type tags; an empty list or a
/// `"*"` entry means every client is permitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub enum ClientAllowList {
    /// Every client type is permitted.
    Any,
    /// Only the listed client types are permitted.
    Only(Vec<ClientType>),
}

impl Default for ClientAllowList {
    fn default() -> Self {
        Self::Any
    }
}

impl ClientAllowList {
    /// Returns whether `client_type` is permitted.
    pub fn permits(&self, client_type: ClientType) -> bool {
        match self {
            Self::Any => true,
            Self::Only(types) => types.contains(&client_type),
        }
    }
}

impl From<Vec<String>> for ClientAllowList {
    fn from(tags: Vec<String>) -> Self {
        if tags.is_empty() || tags.iter().any(|tag| tag == "*") {
            return Self::Any;
        }
        let types: Vec<ClientType> = tags
            .iter()
            .filter_map(|tag| ClientType::from_str(tag).ok())
            .collect();
        if types.is_empty() {
            // Nothing recognizable in the list; treat as unrestricted
            // rather than locking the feature out everywhere.
            Self::Any
        } else {
            Self::Only(types)
        }
    }
}

impl From<ClientAllowList> for Vec<String> {
    fn from(list: ClientAllowList) -> Self {
        match list {
            ClientAllowList::Any => vec!["*".to_string()],
            ClientAllowList::Only(types) => {
                types.iter().map(|t| t.as_str().to_string()).collect()
            }
        }
    }
}

// =============================================================================
// Talent Trait
// =============================================================================

/// A pluggable bundle of commands and listeners.
///
/// Implementors describe where they may run and how to initialize per-bot
/// state. Command membership is declared on the commands themselves via
/// their owning-talent name.
#[async_trait]
pub trait Talent: Send + Sync {
    /// Stable machine-readable name, referenced by commands.
    fn machine_name(&self) -> &str;

    /// Which clients this talent may run on.
    fn clients(&self) -> &ClientAllowList;

    /// Per-bot initialization hook, run during deploy. Failures are
    /// logged and the talent is skipped for that bot; deploy continues.
    async fn initialize(&self, _bot_id: &str, _gestalt: &BoxedGestalt) -> GestaltResult<()> {
        Ok(())
    }
}

/// A shared talent trait object.
pub type BoxedTalent = Arc<dyn Talent>;
