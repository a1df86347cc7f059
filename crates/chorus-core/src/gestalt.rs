//! Gestalt: the persisted configuration store interface.
//!
//! The pipeline consults a hierarchical key-value store for everything that
//! survives restarts: command prefixes, eminence maps, per-command
//! configuration, locale overrides. Paths are slash-delimited strings
//! (`/bots/{id}/clients/discord/command_prefix`) navigating one nested JSON
//! tree.
//!
//! The one merge rule, applied everywhere: **persisted values override
//! in-code defaults**. [`Gestalt::sync`] is the fetch-or-create-then-merge
//! primitive and [`ConfigResolver`] is its typed wrapper; nothing else in
//! the framework merges configuration by hand.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::{GestaltError, GestaltResult};

// =============================================================================
// Path and Tree Helpers
// =============================================================================

fn split_path(path: &str) -> GestaltResult<Vec<&str>> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Err(GestaltError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

fn get_at<'a>(root: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    segments.iter().try_fold(root, |node, seg| node.get(*seg))
}

fn set_at(root: &mut Value, segments: &[&str], value: Value) {
    match segments {
        [] => *root = value,
        [head, rest @ ..] => {
            if !root.is_object() {
                *root = Value::Object(Map::new());
            }
            if let Some(obj) = root.as_object_mut() {
                let child = obj.entry(head.to_string()).or_insert(Value::Null);
                set_at(child, rest, value);
            }
        }
    }
}

fn remove_at(root: &mut Value, segments: &[&str]) {
    match segments {
        [] => *root = Value::Object(Map::new()),
        [leaf] => {
            if let Some(obj) = root.as_object_mut() {
                obj.remove(*leaf);
            }
        }
        [head, rest @ ..] => {
            if let Some(child) = root.get_mut(*head) {
                remove_at(child, rest);
            }
        }
    }
}

/// Recursively merges `overlay` into `base`. Objects merge key-by-key;
/// any other value in the overlay replaces the base value outright.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                deep_merge(base_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (base_slot, other) => *base_slot = other.clone(),
    }
}

// =============================================================================
// Gestalt Trait
// =============================================================================

/// The persisted key-value configuration interface.
///
/// Absence is `Ok(None)`, never an error. All mutation is last-write-wins;
/// there are no durability guarantees beyond best-effort writes.
#[async_trait]
pub trait Gestalt: Send + Sync {
    /// Reads the value at `path`, or `None` if nothing is stored there.
    async fn get(&self, path: &str) -> GestaltResult<Option<Value>>;

    /// Writes `value` at `path`, creating intermediate objects and
    /// replacing whatever was there.
    async fn post(&self, path: &str, value: Value) -> GestaltResult<()>;

    /// Deep-merges `partial` into the value at `path` and returns the
    /// merged result. Missing paths behave like `post`.
    async fn update(&self, path: &str, partial: Value) -> GestaltResult<Value>;

    /// Removes the value at `path`. Removing an absent path is a no-op.
    async fn delete(&self, path: &str) -> GestaltResult<()>;

    /// Returns the effective value at `path`: the persisted value
    /// deep-merged over `default` when one exists, otherwise `default`
    /// (which is persisted for next time). The merged result is written
    /// back so defaults added in code reach storage.
    async fn sync(&self, default: Value, path: &str) -> GestaltResult<Value>;
}

/// A shared gestalt trait object.
pub type BoxedGestalt = Arc<dyn Gestalt>;

// =============================================================================
// In-Memory Implementation
// =============================================================================

/// A gestalt holding its tree in memory. The default store for tests and
/// ephemeral bots.
pub struct MemoryGestalt {
    root: RwLock<Value>,
}

impl Default for MemoryGestalt {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGestalt {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            root: RwLock::new(Value::Object(Map::new())),
        }
    }

    /// Creates a store pre-seeded with `root`.
    pub fn with_root(root: Value) -> Self {
        Self {
            root: RwLock::new(root),
        }
    }
}

#[async_trait]
impl Gestalt for MemoryGestalt {
    async fn get(&self, path: &str) -> GestaltResult<Option<Value>> {
        let segments = split_path(path)?;
        let root = self.root.read().await;
        Ok(get_at(&root, &segments).cloned())
    }

    async fn post(&self, path: &str, value: Value) -> GestaltResult<()> {
        let segments = split_path(path)?;
        let mut root = self.root.write().await;
        set_at(&mut root, &segments, value);
        Ok(())
    }

    async fn update(&self, path: &str, partial: Value) -> GestaltResult<Value> {
        let segments = split_path(path)?;
        let mut root = self.root.write().await;
        let mut merged = get_at(&root, &segments).cloned().unwrap_or(Value::Null);
        if merged.is_null() {
            merged = partial;
        } else {
            deep_merge(&mut merged, &partial);
        }
        set_at(&mut root, &segments, merged.clone());
        Ok(merged)
    }

    async fn delete(&self, path: &str) -> GestaltResult<()> {
        let segments = split_path(path)?;
        let mut root = self.root.write().await;
        remove_at(&mut root, &segments);
        Ok(())
    }

    async fn sync(&self, default: Value, path: &str) -> GestaltResult<Value> {
        let segments = split_path(path)?;
        let mut root = self.root.write().await;
        let effective = match get_at(&root, &segments) {
            Some(persisted) if !persisted.is_null() => {
                let mut merged = default;
                deep_merge(&mut merged, &persisted.clone());
                merged
            }
            _ => default,
        };
        set_at(&mut root, &segments, effective.clone());
        Ok(effective)
    }
}

// =============================================================================
// File-Backed Implementation
// =============================================================================

/// A gestalt persisted as one JSON document on disk.
///
/// The tree is loaded once at open; every mutation rewrites the file.
/// Writes are best effort: a failed write is logged and the in-memory
/// tree stays authoritative for the rest of the process lifetime.
pub struct FileGestalt {
    path: PathBuf,
    root: RwLock<Value>,
}

impl FileGestalt {
    /// Opens (or creates) the store backed by the JSON document at `path`.
    pub async fn open(path: impl Into<PathBuf>) -> GestaltResult<Self> {
        let path = path.into();
        let root = match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Value::Object(Map::new()),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            root: RwLock::new(root),
        })
    }

    async fn persist(&self, root: &Value) {
        let serialized = match serde_json::to_string_pretty(root) {
            Ok(text) => text,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Failed to serialize gestalt tree");
                return;
            }
        };
        if let Err(err) = tokio::fs::write(&self.path, serialized).await {
            warn!(path = %self.path.display(), error = %err, "Failed to write gestalt file");
        }
    }
}

#[async_trait]
impl Gestalt for FileGestalt {
    async fn get(&self, path: &str) -> GestaltResult<Option<Value>> {
        let segments = split_path(path)?;
        let root = self.root.read().await;
        Ok(get_at(&root, &segments).cloned())
    }

    async fn post(&self, path: &str, value: Value) -> GestaltResult<()> {
        let segments = split_path(path)?;
        let mut root = self.root.write().await;
        set_at(&mut root, &segments, value);
        self.persist(&root).await;
        Ok(())
    }

    async fn update(&self, path: &str, partial: Value) -> GestaltResult<Value> {
        let segments = split_path(path)?;
        let mut root = self.root.write().await;
        let mut merged = get_at(&root, &segments).cloned().unwrap_or(Value::Null);
        if merged.is_null() {
            merged = partial;
        } else {
            deep_merge(&mut merged, &partial);
        }
        set_at(&mut root, &segments, merged.clone());
        self.persist(&root).await;
        Ok(merged)
    }

    async fn delete(&self, path: &str) -> GestaltResult<()> {
        let segments = split_path(path)?;
        let mut root = self.root.write().await;
        remove_at(&mut root, &segments);
        self.persist(&root).await;
        Ok(())
    }

    async fn sync(&self, default: Value, path: &str) -> GestaltResult<Value> {
        let segments = split_path(path)?;
        let mut root = self.root.write().await;
        let effective = match get_at(&root, &segments) {
            Some(persisted) if !persisted.is_null() => {
                let mut merged = default;
                deep_merge(&mut merged, &persisted.clone());
                merged
            }
            _ => default,
        };
        set_at(&mut root, &segments, effective.clone());
        self.persist(&root).await;
        Ok(effective)
    }
}

// =============================================================================
// Typed Resolution
// =============================================================================

/// Typed wrapper over [`Gestalt::sync`].
///
/// Every fetch-or-create-then-merge in the framework goes through this one
/// utility, so the merge rule cannot drift between call sites.
#[derive(Clone)]
pub struct ConfigResolver {
    gestalt: BoxedGestalt,
}

impl ConfigResolver {
    /// Creates a resolver over the given store.
    pub fn new(gestalt: BoxedGestalt) -> Self {
        Self { gestalt }
    }

    /// Returns the effective configuration at `path`: the persisted value
    /// merged over `default`, persisting `default` on first resolution.
    pub async fn resolve<T>(&self, path: &str, default: &T) -> GestaltResult<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let default_value = serde_json::to_value(default)?;
        let effective = self.gestalt.sync(default_value, path).await?;
        serde_json::from_value(effective).map_err(|err| GestaltError::Shape {
            path: path.to_string(),
            reason: err.to_string(),
        })
    }

    /// Returns the underlying store.
    pub fn gestalt(&self) -> &BoxedGestalt {
        &self.gestalt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_absent_is_none() {
        let store = MemoryGestalt::new();
        assert_eq!(store.get("/bots/sigma/config").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_post_then_get_nested() {
        let store = MemoryGestalt::new();
        store
            .post("/bots/sigma/config/command_prefix", json!("!"))
            .await
            .unwrap();
        assert_eq!(
            store.get("/bots/sigma/config/command_prefix").await.unwrap(),
            Some(json!("!"))
        );
        // Intermediate nodes materialize as objects.
        assert_eq!(
            store.get("/bots/sigma/config").await.unwrap(),
            Some(json!({"command_prefix": "!"}))
        );
    }

    #[tokio::test]
    async fn test_update_deep_merges() {
        let store = MemoryGestalt::new();
        store
            .post("/bots/sigma/config", json!({"locale": "en", "prefix": "!"}))
            .await
            .unwrap();
        let merged = store
            .update("/bots/sigma/config", json!({"prefix": "$"}))
            .await
            .unwrap();
        assert_eq!(merged, json!({"locale": "en", "prefix": "$"}));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryGestalt::new();
        store.post("/bots/sigma/flag", json!(true)).await.unwrap();
        store.delete("/bots/sigma/flag").await.unwrap();
        assert_eq!(store.get("/bots/sigma/flag").await.unwrap(), None);
        // Deleting again is fine.
        store.delete("/bots/sigma/flag").await.unwrap();
    }

    #[tokio::test]
    async fn test_sync_persists_default_when_absent() {
        let store = MemoryGestalt::new();
        let effective = store
            .sync(json!({"enabled": true}), "/bots/sigma/commands/ping/config")
            .await
            .unwrap();
        assert_eq!(effective, json!({"enabled": true}));
        assert_eq!(
            store.get("/bots/sigma/commands/ping/config").await.unwrap(),
            Some(json!({"enabled": true}))
        );
    }

    #[tokio::test]
    async fn test_sync_persisted_overrides_default() {
        let store = MemoryGestalt::new();
        store
            .post("/bots/sigma/commands/ping/config", json!({"enabled": false}))
            .await
            .unwrap();
        let effective = store
            .sync(
                json!({"enabled": true, "cooldown": 5}),
                "/bots/sigma/commands/ping/config",
            )
            .await
            .unwrap();
        // Persisted wins on conflict; default fills the gaps.
        assert_eq!(effective, json!({"enabled": false, "cooldown": 5}));
    }

    #[tokio::test]
    async fn test_invalid_path_rejected() {
        let store = MemoryGestalt::new();
        assert!(matches!(
            store.get("///").await,
            Err(GestaltError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_config_resolver_round_trips_types() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Sample {
            prefix: String,
            retries: u32,
        }

        let store: BoxedGestalt = Arc::new(MemoryGestalt::new());
        store
            .post("/bots/sigma/sample", json!({"prefix": "$"}))
            .await
            .unwrap();

        let resolver = ConfigResolver::new(Arc::clone(&store));
        let effective = resolver
            .resolve(
                "/bots/sigma/sample",
                &Sample {
                    prefix: "!".into(),
                    retries: 3,
                },
            )
            .await
            .unwrap();
        assert_eq!(
            effective,
            Sample {
                prefix: "$".into(),
                retries: 3,
            }
        );
    }

    #[tokio::test]
    async fn test_file_gestalt_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gestalt.json");

        {
            let store = FileGestalt::open(&path).await.unwrap();
            store
                .post("/bots/sigma/config/command_prefix", json!("."))
                .await
                .unwrap();
        }

        let reopened = FileGestalt::open(&path).await.unwrap();
        assert_eq!(
            reopened
                .get("/bots/sigma/config/command_prefix")
                .await
                .unwrap(),
            Some(json!("."))
        );
    }
}
