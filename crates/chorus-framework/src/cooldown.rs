//! Cooldown tracking.
//!
//! Cooldown records are keyed by (bot, category, subject, scope) and carry
//! an expiry instant. Expiry is passive: a record past its expiry is
//! treated as absent by the next check that observes it, which also drops
//! it for memory hygiene. No sweeper task exists or is needed.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// The cooldown category used for command invocations.
pub const CATEGORY_COMMAND: &str = "command";

/// Who a cooldown applies to.
///
/// The global scope is a distinct variant, so it can never collide with a
/// real user id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CooldownScope {
    /// Everyone invoking the subject.
    Global,
    /// One user.
    User(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CooldownKey {
    bot_id: String,
    category: String,
    subject: String,
    scope: CooldownScope,
}

/// Tracks active cooldowns for one bot (or several — keys carry the bot
/// id, so sharing an instance is safe).
#[derive(Default)]
pub struct CooldownManager {
    records: Mutex<HashMap<CooldownKey, Instant>>,
}

impl CooldownManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a non-expired record exists for the exact key
    /// tuple. Observing an expired record drops it.
    pub fn check(&self, bot_id: &str, category: &str, subject: &str, scope: &CooldownScope) -> bool {
        let key = CooldownKey {
            bot_id: bot_id.to_string(),
            category: category.to_string(),
            subject: subject.to_string(),
            scope: scope.clone(),
        };
        let mut records = self.records.lock();
        match records.get(&key) {
            Some(expiry) if *expiry > Instant::now() => true,
            Some(_) => {
                records.remove(&key);
                false
            }
            None => false,
        }
    }

    /// Returns how long a cooldown has left, if one is active.
    pub fn remaining(
        &self,
        bot_id: &str,
        category: &str,
        subject: &str,
        scope: &CooldownScope,
    ) -> Option<Duration> {
        let key = CooldownKey {
            bot_id: bot_id.to_string(),
            category: category.to_string(),
            subject: subject.to_string(),
            scope: scope.clone(),
        };
        let records = self.records.lock();
        records
            .get(&key)
            .and_then(|expiry| expiry.checked_duration_since(Instant::now()))
            .filter(|left| !left.is_zero())
    }

    /// Creates or overwrites a record expiring after `duration`.
    /// A zero duration means "cooldown disabled" and is a no-op.
    pub fn set(
        &self,
        bot_id: &str,
        category: &str,
        subject: &str,
        scope: CooldownScope,
        duration: Duration,
    ) {
        if duration.is_zero() {
            return;
        }
        let key = CooldownKey {
            bot_id: bot_id.to_string(),
            category: category.to_string(),
            subject: subject.to_string(),
            scope,
        };
        self.records.lock().insert(key, Instant::now() + duration);
    }

    /// The number of records currently held, expired or not.
    pub fn record_count(&self) -> usize {
        self.records.lock().len()
    }
}
